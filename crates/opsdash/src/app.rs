//! The dashboard model: screen switching, key bindings and export.
//!
//! Exactly one screen is mounted at a time. Every mount gets a fresh epoch
//! and all of the screen's commands are tagged with it, so a response or
//! timer belonging to a screen that has since been left is dropped on
//! arrival, on top of the screen's own unmount.

use crate::api::ApiClient;
use crate::entities::{Facility, InsuranceRecord, Order, Tube, User};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use opsdash_core::{terminal_events, Command, Component, Model, Subscription, TerminalEvent};
use opsdash_list::calendar::{self, RangeAggregation, ViewMode};
use opsdash_list::{
    ControllerOptions, ExportTable, FieldSpec, ListController, ListSpec, MemoryHistory,
    Message as ListMsg, Navigator, Record, RowMutations,
};
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Paragraph, Tabs};
use ratatui::Frame;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Screen {
    Orders,
    Calendar,
    Users,
    Facilities,
    Tubes,
    Insurance,
}

impl Screen {
    pub const ALL: [Screen; 6] = [
        Screen::Orders,
        Screen::Calendar,
        Screen::Users,
        Screen::Facilities,
        Screen::Tubes,
        Screen::Insurance,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Screen::Orders => "Orders",
            Screen::Calendar => "Orders by day",
            Screen::Users => "Users",
            Screen::Facilities => "Facilities",
            Screen::Tubes => "Tubes",
            Screen::Insurance => "Insurance",
        }
    }

    /// Address path of the screen.
    pub fn path(self) -> &'static str {
        match self {
            Screen::Orders => "/orders",
            Screen::Calendar => "/calendar",
            Screen::Users => "/users",
            Screen::Facilities => "/facilities",
            Screen::Tubes => "/tubes",
            Screen::Insurance => "/insurance",
        }
    }

    pub fn from_path(path: &str) -> Option<Screen> {
        Screen::ALL.into_iter().find(|s| s.path() == path)
    }

    /// Backend collection path, relative to the API base.
    fn resource(self) -> &'static str {
        match self {
            Screen::Orders => "orders",
            Screen::Calendar => "orders/summary",
            Screen::Users => "users",
            Screen::Facilities => "facilities",
            Screen::Tubes => "tubes",
            Screen::Insurance => "insurance",
        }
    }
}

/// Startup configuration for [`Dashboard`].
pub struct DashboardFlags {
    pub api: ApiClient,
    /// Shared history; its current entry decides the first screen.
    pub history: MemoryHistory,
    pub options: ControllerOptions,
    pub export_dir: PathBuf,
    /// Mount list screens without mutations.
    pub read_only: bool,
}

#[derive(Debug)]
pub enum Msg {
    Key(KeyEvent),
    Redraw,
    Switch(Screen),
    Back,
    Orders(u64, ListMsg<Order>),
    Users(u64, ListMsg<User>),
    Facilities(u64, ListMsg<Facility>),
    Tubes(u64, ListMsg<Tube>),
    Insurance(u64, ListMsg<InsuranceRecord>),
    Calendar(u64, calendar::Message),
    Exported(Result<ExportReport, String>),
}

/// Where an export went and what it contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub rows: usize,
    pub omitted: usize,
}

enum Active {
    Orders(ListController<Order>),
    Users(ListController<User>),
    Facilities(ListController<Facility>),
    Tubes(ListController<Tube>),
    Insurance(ListController<InsuranceRecord>),
    Calendar(RangeAggregation),
}

/// Collaborators needed to mount any screen.
struct Backend {
    api: ApiClient,
    history: MemoryHistory,
    options: ControllerOptions,
    read_only: bool,
}

impl Backend {
    fn list<R: Record + DeserializeOwned>(
        &self,
        screen: Screen,
    ) -> (ListController<R>, Command<ListMsg<R>>) {
        let resource = self.api.resource::<R>(screen.resource());
        let mutations: Option<Arc<dyn RowMutations>> = if self.read_only {
            None
        } else {
            Some(Arc::new(resource.clone()))
        };
        ListController::mount(ListSpec {
            title: screen.title().to_string(),
            source: Arc::new(resource),
            mutations,
            navigator: Box::new(self.history.clone()),
            options: self.options.clone(),
        })
    }

    fn mount(&self, screen: Screen, epoch: u64) -> (Active, Command<Msg>) {
        let (active, cmd) = match screen {
            Screen::Orders => {
                let (list, cmd) = self.list::<Order>(screen);
                (Active::Orders(list), cmd.map(move |m| Msg::Orders(epoch, m)))
            }
            Screen::Users => {
                let (list, cmd) = self.list::<User>(screen);
                (Active::Users(list), cmd.map(move |m| Msg::Users(epoch, m)))
            }
            Screen::Facilities => {
                let (list, cmd) = self.list::<Facility>(screen);
                (Active::Facilities(list), cmd.map(move |m| Msg::Facilities(epoch, m)))
            }
            Screen::Tubes => {
                let (list, cmd) = self.list::<Tube>(screen);
                (Active::Tubes(list), cmd.map(move |m| Msg::Tubes(epoch, m)))
            }
            Screen::Insurance => {
                let (list, cmd) = self.list::<InsuranceRecord>(screen);
                (Active::Insurance(list), cmd.map(move |m| Msg::Insurance(epoch, m)))
            }
            Screen::Calendar => {
                let (hook, cmd) = RangeAggregation::mount(
                    screen.title(),
                    Arc::new(self.api.summaries(screen.resource())),
                    ViewMode::Week,
                    jiff::Zoned::now().date(),
                    &self.options,
                );
                (Active::Calendar(hook), cmd.map(move |m| Msg::Calendar(epoch, m)))
            }
        };
        let title = Command::set_title(format!("opsdash: {}", screen.title()));
        (active, Command::batch([cmd, title]))
    }
}

/// Filter prompt state: which field is being edited and its text.
struct FilterPrompt {
    field: usize,
    buffer: String,
}

pub struct Dashboard {
    backend: Backend,
    export_dir: PathBuf,
    screen: Screen,
    active: Active,
    epoch: u64,
    prompt: Option<FilterPrompt>,
    status_line: Option<String>,
}

/// Deliver a message to the active list screen and tag its follow-ups.
macro_rules! with_list {
    ($self:expr, $list:ident => $make:expr) => {{
        let epoch = $self.epoch;
        match &mut $self.active {
            Active::Orders($list) => match $make {
                Some(m) => $list.update(m).map(move |m| Msg::Orders(epoch, m)),
                None => Command::none(),
            },
            Active::Users($list) => match $make {
                Some(m) => $list.update(m).map(move |m| Msg::Users(epoch, m)),
                None => Command::none(),
            },
            Active::Facilities($list) => match $make {
                Some(m) => $list.update(m).map(move |m| Msg::Facilities(epoch, m)),
                None => Command::none(),
            },
            Active::Tubes($list) => match $make {
                Some(m) => $list.update(m).map(move |m| Msg::Tubes(epoch, m)),
                None => Command::none(),
            },
            Active::Insurance($list) => match $make {
                Some(m) => $list.update(m).map(move |m| Msg::Insurance(epoch, m)),
                None => Command::none(),
            },
            Active::Calendar(_) => Command::none(),
        }
    }};
}

/// Route a tagged child message to the active screen, dropping it when the
/// tag belongs to an earlier mount.
macro_rules! route {
    ($self:expr, $variant:ident, $epoch:expr, $msg:expr) => {{
        let epoch = $epoch;
        match &mut $self.active {
            Active::$variant(child) if epoch == $self.epoch => {
                child.update($msg).map(move |m| Msg::$variant(epoch, m))
            }
            _ => {
                tracing::trace!(epoch, "dropping message for unmounted screen");
                Command::none()
            }
        }
    }};
}

fn list_key<R: Record>(key: KeyEvent, list: &ListController<R>) -> Option<ListMsg<R>> {
    let cursor = list.cursor_id();
    Some(match key.code {
        KeyCode::Up | KeyCode::Char('k') => ListMsg::CursorUp,
        KeyCode::Down | KeyCode::Char('j') => ListMsg::CursorDown,
        KeyCode::Right | KeyCode::Char('n') => ListMsg::NextPage,
        KeyCode::Left | KeyCode::Char('p') => ListMsg::PrevPage,
        KeyCode::Char('z') => ListMsg::NextPageSize,
        KeyCode::Char('r') => ListMsg::Refresh,
        KeyCode::Char('x') => ListMsg::ClearFilters,
        KeyCode::Char('c') => ListMsg::ClearSelection,
        KeyCode::Char('a') if list.all_visible_selected() => ListMsg::DeselectAllVisible,
        KeyCode::Char('a') => ListMsg::SelectAllVisible,
        KeyCode::Char(' ') => ListMsg::ToggleSelected(cursor?),
        KeyCode::Char('t') => ListMsg::ToggleStatus(cursor?),
        KeyCode::Char('D') => ListMsg::Delete(cursor?),
        _ => return None,
    })
}

fn calendar_key(key: KeyEvent) -> Option<calendar::Message> {
    Some(match key.code {
        KeyCode::Left | KeyCode::Char('h') => calendar::Message::Previous,
        KeyCode::Right | KeyCode::Char('l') => calendar::Message::Next,
        KeyCode::Char('d') => calendar::Message::SetMode(ViewMode::Day),
        KeyCode::Char('w') => calendar::Message::SetMode(ViewMode::Week),
        KeyCode::Char('m') => calendar::Message::SetMode(ViewMode::Month),
        KeyCode::Char('t') => calendar::Message::Today,
        KeyCode::Char('r') => calendar::Message::Refresh,
        _ => return None,
    })
}

async fn write_export(path: PathBuf, table: ExportTable) -> Result<ExportReport, String> {
    let json = serde_json::to_vec_pretty(&table).map_err(|e| e.to_string())?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(ExportReport {
        path,
        rows: table.rows.len(),
        omitted: table.omitted,
    })
}

impl Dashboard {
    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }

    pub fn prompt_field(&self) -> Option<&'static str> {
        let prompt = self.prompt.as_ref()?;
        self.filter_schema()
            .and_then(|schema| schema.get(prompt.field))
            .map(|field| field.key)
    }

    /// Current address of the mounted screen.
    pub fn address(&self) -> String {
        self.backend.history.query()
    }

    pub fn orders(&self) -> Option<&ListController<Order>> {
        match &self.active {
            Active::Orders(list) => Some(list),
            _ => None,
        }
    }

    pub fn users(&self) -> Option<&ListController<User>> {
        match &self.active {
            Active::Users(list) => Some(list),
            _ => None,
        }
    }

    pub fn calendar(&self) -> Option<&RangeAggregation> {
        match &self.active {
            Active::Calendar(hook) => Some(hook),
            _ => None,
        }
    }

    fn filter_schema(&self) -> Option<&'static [FieldSpec]> {
        match &self.active {
            Active::Orders(l) => Some(l.filters().schema()),
            Active::Users(l) => Some(l.filters().schema()),
            Active::Facilities(l) => Some(l.filters().schema()),
            Active::Tubes(l) => Some(l.filters().schema()),
            Active::Insurance(l) => Some(l.filters().schema()),
            Active::Calendar(_) => None,
        }
    }

    fn filter_draft(&self, key: &str) -> String {
        let draft = match &self.active {
            Active::Orders(l) => l.filters().draft(key),
            Active::Users(l) => l.filters().draft(key),
            Active::Facilities(l) => l.filters().draft(key),
            Active::Tubes(l) => l.filters().draft(key),
            Active::Insurance(l) => l.filters().draft(key),
            Active::Calendar(_) => "",
        };
        draft.to_string()
    }

    fn export_table(&self) -> Option<ExportTable> {
        match &self.active {
            Active::Orders(l) => Some(l.export()),
            Active::Users(l) => Some(l.export()),
            Active::Facilities(l) => Some(l.export()),
            Active::Tubes(l) => Some(l.export()),
            Active::Insurance(l) => Some(l.export()),
            Active::Calendar(_) => None,
        }
    }

    fn unmount_active(&mut self) {
        match &mut self.active {
            Active::Orders(l) => l.unmount(),
            Active::Users(l) => l.unmount(),
            Active::Facilities(l) => l.unmount(),
            Active::Tubes(l) => l.unmount(),
            Active::Insurance(l) => l.unmount(),
            Active::Calendar(h) => h.unmount(),
        }
    }

    fn switch(&mut self, screen: Screen) -> Command<Msg> {
        self.unmount_active();
        self.epoch += 1;
        let (active, cmd) = self.backend.mount(screen, self.epoch);
        tracing::debug!(screen = screen.title(), epoch = self.epoch, "screen mounted");
        self.active = active;
        self.screen = screen;
        self.prompt = None;
        self.status_line = None;
        cmd
    }

    fn export(&mut self) -> Command<Msg> {
        let Some(table) = self.export_table() else {
            return Command::none();
        };
        if table.rows.is_empty() {
            self.status_line = Some(match table.omitted {
                0 => "Nothing selected to export".to_string(),
                n => format!("None of the {n} selected rows are loaded"),
            });
            return Command::none();
        }
        let name = self.screen.resource().replace('/', "-");
        let path = self.export_dir.join(format!("{name}-export.json"));
        Command::perform(write_export(path, table), Msg::Exported)
    }

    fn on_prompt_key(&mut self, key: KeyEvent) -> Command<Msg> {
        let Some(schema) = self.filter_schema() else {
            self.prompt = None;
            return Command::none();
        };
        let Some(prompt) = self.prompt.as_mut() else {
            return Command::none();
        };
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.prompt = None;
                return Command::none();
            }
            KeyCode::Tab => {
                prompt.field = (prompt.field + 1) % schema.len().max(1);
                let field = prompt.field;
                let draft = schema
                    .get(field)
                    .map(|f| self.filter_draft(f.key))
                    .unwrap_or_default();
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.buffer = draft;
                }
                return Command::none();
            }
            KeyCode::Backspace => {
                prompt.buffer.pop();
            }
            KeyCode::Char(c) => prompt.buffer.push(c),
            _ => return Command::none(),
        }

        let Some(field) = schema.get(prompt.field) else {
            return Command::none();
        };
        let key = field.key.to_string();
        let value = prompt.buffer.clone();
        with_list!(self, list => Some(ListMsg::SetFilter {
            key: key.clone(),
            value: value.clone(),
        }))
    }

    fn on_key(&mut self, key: KeyEvent) -> Command<Msg> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Command::quit();
        }
        if self.prompt.is_some() {
            return self.on_prompt_key(key);
        }

        match key.code {
            KeyCode::Char('q') => return Command::quit(),
            KeyCode::Char(c @ '1'..='6') => {
                let idx = c as usize - '1' as usize;
                return Command::message(Msg::Switch(Screen::ALL[idx]));
            }
            KeyCode::Char('b') | KeyCode::Backspace => return Command::message(Msg::Back),
            KeyCode::Char('e') => return self.export(),
            KeyCode::Char('/') | KeyCode::Char('f') => {
                if let Some(first) = self.filter_schema().and_then(|s| s.first()) {
                    let buffer = self.filter_draft(first.key);
                    self.prompt = Some(FilterPrompt { field: 0, buffer });
                }
                return Command::none();
            }
            _ => {}
        }

        if let Active::Calendar(hook) = &mut self.active {
            let epoch = self.epoch;
            return match calendar_key(key) {
                Some(m) => hook.update(m).map(move |m| Msg::Calendar(epoch, m)),
                None => Command::none(),
            };
        }
        with_list!(self, list => list_key(key, list))
    }

    fn help_line(&self) -> String {
        match self.screen {
            Screen::Calendar => "←/→ period  d/w/m mode  t today  r refresh  1-6 screens  q quit",
            _ => "j/k move  n/p page  / filter  space select  a all  t toggle  D delete  e export  q quit",
        }
        .to_string()
    }
}

impl Model for Dashboard {
    type Message = Msg;
    type Flags = DashboardFlags;

    fn init(flags: DashboardFlags) -> (Self, Command<Msg>) {
        let DashboardFlags {
            api,
            history,
            options,
            export_dir,
            read_only,
        } = flags;
        let screen = Screen::from_path(&history.current().path).unwrap_or(Screen::Orders);
        let backend = Backend {
            api,
            history,
            options,
            read_only,
        };
        let epoch = 1;
        let (active, cmd) = backend.mount(screen, epoch);
        let dashboard = Dashboard {
            backend,
            export_dir,
            screen,
            active,
            epoch,
            prompt: None,
            status_line: None,
        };
        (dashboard, cmd)
    }

    fn update(&mut self, msg: Msg) -> Command<Msg> {
        match msg {
            Msg::Key(key) => self.on_key(key),
            Msg::Redraw => Command::none(),
            Msg::Switch(screen) => {
                if screen == self.screen {
                    return Command::none();
                }
                self.backend.history.push(screen.path(), "");
                self.switch(screen)
            }
            Msg::Back => match self.backend.history.back() {
                Some(location) => match Screen::from_path(&location.path) {
                    Some(screen) => self.switch(screen),
                    None => Command::none(),
                },
                None => Command::none(),
            },
            Msg::Orders(epoch, m) => route!(self, Orders, epoch, m),
            Msg::Users(epoch, m) => route!(self, Users, epoch, m),
            Msg::Facilities(epoch, m) => route!(self, Facilities, epoch, m),
            Msg::Tubes(epoch, m) => route!(self, Tubes, epoch, m),
            Msg::Insurance(epoch, m) => route!(self, Insurance, epoch, m),
            Msg::Calendar(epoch, m) => route!(self, Calendar, epoch, m),
            Msg::Exported(Ok(report)) => {
                tracing::info!(path = %report.path.display(), rows = report.rows, "export written");
                let mut line = format!("Exported {} rows to {}", report.rows, report.path.display());
                if report.omitted > 0 {
                    line.push_str(&format!(
                        " ({} selected rows not loaded were skipped)",
                        report.omitted
                    ));
                }
                self.status_line = Some(line);
                Command::none()
            }
            Msg::Exported(Err(err)) => {
                tracing::warn!(error = %err, "export failed");
                self.status_line = Some(format!("Export failed: {err}"));
                Command::none()
            }
        }
    }

    fn view(&self, frame: &mut Frame) {
        let [tabs_area, body_area, help_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let selected = Screen::ALL.iter().position(|s| *s == self.screen).unwrap_or(0);
        let tabs = Tabs::new(
            Screen::ALL
                .iter()
                .enumerate()
                .map(|(i, s)| format!("{} {}", i + 1, s.title())),
        )
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(tabs, tabs_area);

        match &self.active {
            Active::Orders(l) => l.view(frame, body_area),
            Active::Users(l) => l.view(frame, body_area),
            Active::Facilities(l) => l.view(frame, body_area),
            Active::Tubes(l) => l.view(frame, body_area),
            Active::Insurance(l) => l.view(frame, body_area),
            Active::Calendar(h) => h.view(frame, body_area),
        }

        let bottom = if let Some(prompt) = &self.prompt {
            let label = self
                .filter_schema()
                .and_then(|s| s.get(prompt.field))
                .map_or("", |f| f.label);
            Paragraph::new(format!(
                "Filter {label}: {}_   (Tab next field, Enter done)",
                prompt.buffer
            ))
            .style(Style::default().fg(Color::Yellow))
        } else if let Some(line) = &self.status_line {
            Paragraph::new(line.as_str()).style(Style::default().fg(Color::Green))
        } else {
            Paragraph::new(self.help_line()).style(Style::default().fg(Color::DarkGray))
        };
        frame.render_widget(bottom, help_area);
    }

    fn subscriptions(&self) -> Vec<Subscription<Msg>> {
        vec![terminal_events(|event| match event {
            TerminalEvent::Key(key) => Some(Msg::Key(key)),
            TerminalEvent::Resize(..) => Some(Msg::Redraw),
            _ => None,
        })]
    }
}
