//! The list controller: one per list screen.
//!
//! It owns the filter store, the debounce timer, the request generation, the
//! loaded rows with their mutation tags, the selection and the notification
//! queue. Every change arrives as a [`Message`] and every side effect leaves
//! as a [`Command`], so the whole thing runs on the program's single task and
//! needs no locks.

use crate::address::Navigator;
use crate::error::ApiError;
use crate::filter::FilterStore;
use crate::mutation::ToggleTicket;
use crate::notify::{Level, Notifications};
use crate::options::ControllerOptions;
use crate::query::{DebounceToken, Debouncer, Generation, QueryCoordinator, QueryStatus};
use crate::reconcile::{Row, RowSet};
use crate::record::{Record, RowId};
use crate::selection::{ExportTable, Selection};
use crate::source::{ListPage, ListRequest, ListSource, RowMutations};
use opsdash_core::{Command, Component};
use ratatui::layout::Rect;
use ratatui::Frame;
use std::sync::Arc;

/// Everything a screen plugs into the generic controller.
pub struct ListSpec<R: Record> {
    pub title: String,
    pub source: Arc<dyn ListSource<R>>,
    /// `None` for read-only screens.
    pub mutations: Option<Arc<dyn RowMutations>>,
    pub navigator: Box<dyn Navigator>,
    pub options: ControllerOptions,
}

/// Messages understood by a [`ListController`].
#[derive(Debug)]
pub enum Message<R> {
    /// Edit one filter field. Invalid values stay inline and are not applied.
    SetFilter { key: String, value: String },
    ClearFilters,
    GotoPage(u32),
    NextPage,
    PrevPage,
    SetPageSize(u32),
    /// Cycle through the offered page sizes.
    NextPageSize,
    /// A debounce timer fired.
    Settled(DebounceToken),
    /// Refetch the current tuple now.
    Refresh,
    Fetched {
        generation: Generation,
        result: Result<ListPage<R>, ApiError>,
    },
    ToggleStatus(RowId),
    ToggleSettled {
        ticket: ToggleTicket,
        result: Result<(), ApiError>,
    },
    Delete(RowId),
    DeleteSettled {
        id: RowId,
        result: Result<(), ApiError>,
    },
    SelectAllVisible,
    DeselectAllVisible,
    ToggleSelected(RowId),
    ClearSelection,
    CursorUp,
    CursorDown,
    Dismiss(u64),
}

/// Generic list controller, parametrized by the record type and its
/// query and mutation collaborators.
pub struct ListController<R: Record> {
    title: String,
    source: Arc<dyn ListSource<R>>,
    mutations: Option<Arc<dyn RowMutations>>,
    navigator: Box<dyn Navigator>,
    options: ControllerOptions,
    filters: FilterStore,
    debouncer: Debouncer,
    query: QueryCoordinator,
    rows: RowSet<R>,
    /// The request whose response produced `rows`.
    rows_key: Option<ListRequest>,
    /// Set while the fetch issued by page clamping is outstanding.
    correcting: bool,
    selection: Selection,
    notifications: Notifications,
    cursor: usize,
    mounted: bool,
}

impl<R: Record> ListController<R> {
    /// Decode the current address and issue the first fetch right away.
    pub fn mount(spec: ListSpec<R>) -> (Self, Command<Message<R>>) {
        let ListSpec {
            title,
            source,
            mutations,
            navigator,
            options,
        } = spec;

        let filters = FilterStore::from_address(
            &navigator.query(),
            R::FILTERS,
            &options.page_sizes,
            options.default_page_size,
        );
        tracing::debug!(screen = %title, address = %filters.address(), "mounting list");

        let mut controller = ListController {
            title,
            source,
            mutations,
            navigator,
            debouncer: Debouncer::new(options.debounce),
            options,
            filters,
            query: QueryCoordinator::new(),
            rows: RowSet::new(),
            rows_key: None,
            correcting: false,
            selection: Selection::new(),
            notifications: Notifications::default(),
            cursor: 0,
            mounted: true,
        };
        let request = controller.filters.request();
        let cmd = controller.issue(request);
        (controller, cmd)
    }

    /// Stop producing effects. Pending timers and responses become no-ops.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        tracing::debug!(screen = %self.title, "unmounting list");
        self.mounted = false;
        self.debouncer.cancel();
        self.query.invalidate();
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rows(&self) -> &RowSet<R> {
        &self.rows
    }

    pub fn status(&self) -> QueryStatus {
        self.query.status()
    }

    pub fn filters(&self) -> &FilterStore {
        &self.filters
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Id of the row under the cursor.
    pub fn cursor_id(&self) -> Option<RowId> {
        self.rows.iter().nth(self.cursor).map(|row| row.id().clone())
    }

    /// Whether the toggle control for `id` is enabled.
    pub fn toggle_enabled(&self, id: &RowId) -> bool {
        self.mutations.is_some() && self.rows.get(id).is_some_and(|row| !row.is_in_flight())
    }

    pub fn all_visible_selected(&self) -> bool {
        self.selection.all_selected(&self.rows.ids())
    }

    /// Selected rows that are currently loaded, in export columns.
    pub fn export(&self) -> ExportTable {
        self.selection.export(&self.rows)
    }

    fn issue(&mut self, request: ListRequest) -> Command<Message<R>> {
        let generation = self.query.issue(request.clone());
        let source = Arc::clone(&self.source);
        Command::perform(async move { source.fetch(request).await }, move |result| {
            Message::Fetched { generation, result }
        })
    }

    fn schedule_settle(&mut self) -> Command<Message<R>> {
        self.debouncer.schedule(Message::Settled)
    }

    fn sync_address(&mut self) {
        let address = self.filters.address();
        if self.navigator.query() != address {
            self.navigator.replace_query(&address);
        }
    }

    fn notify(&mut self, level: Level, text: String) -> Command<Message<R>> {
        let id = self.notifications.push(level, text);
        match self.options.notification_ttl {
            Some(ttl) => Command::tick(ttl, move |_| Message::Dismiss(id)),
            None => Command::none(),
        }
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.rows.len().saturating_sub(1));
    }

    fn edited(&mut self, changed: bool) -> Command<Message<R>> {
        if changed {
            self.schedule_settle()
        } else {
            Command::none()
        }
    }

    fn on_fetched(
        &mut self,
        generation: Generation,
        result: Result<ListPage<R>, ApiError>,
    ) -> Command<Message<R>> {
        let Some(result) = self.query.accept(generation, result, &self.options.load_failed) else {
            return Command::none();
        };
        let correcting = std::mem::take(&mut self.correcting);

        match result {
            Ok(page) => {
                let request = self.query.last_issued().cloned();
                let same_view = request.is_some() && request == self.rows_key;
                let dropped = self.rows.reconcile(page.rows);
                // Rows vanishing from a refetch of the same view were removed
                // server-side; paging or filtering away removes nothing.
                if same_view {
                    for id in &dropped {
                        self.selection.remove(id);
                    }
                }
                self.rows_key = request;
                self.clamp_cursor();

                if self.options.clamp_page
                    && !correcting
                    && self.filters.clamp_page(page.total_pages)
                {
                    tracing::debug!(
                        page = self.filters.pagination().page,
                        "page out of range, fetching last page"
                    );
                    self.debouncer.cancel();
                    self.sync_address();
                    self.correcting = true;
                    let request = self.filters.request();
                    return self.issue(request);
                }
                Command::none()
            }
            Err(err) => {
                self.rows.clear();
                self.rows_key = None;
                self.cursor = 0;
                let text = err.user_message(&self.options.load_failed);
                self.notify(Level::Error, text)
            }
        }
    }

    fn on_toggle(&mut self, id: RowId) -> Command<Message<R>> {
        let Some(mutations) = self.mutations.clone() else {
            return Command::none();
        };
        let Some(ticket) = self.rows.begin_toggle(&id) else {
            tracing::trace!(%id, "toggle ignored, row busy or not loaded");
            return Command::none();
        };

        tracing::debug!(%id, target = %ticket.target, "toggling status");
        let request = ticket.clone();
        Command::perform(
            async move { mutations.toggle_status(&request.id, request.target).await },
            move |result| Message::ToggleSettled { ticket, result },
        )
    }

    fn on_toggle_settled(
        &mut self,
        ticket: ToggleTicket,
        result: Result<(), ApiError>,
    ) -> Command<Message<R>> {
        let outcome = self.rows.settle_toggle(&ticket, &result);
        match result {
            Ok(()) => {
                tracing::info!(id = %ticket.id, status = %ticket.target, ?outcome, "status change confirmed");
                self.notify(
                    Level::Success,
                    format!("Status changed to {}", ticket.target),
                )
            }
            Err(err) => {
                tracing::warn!(id = %ticket.id, error = %err, ?outcome, "status change failed");
                let text = err.user_message(&self.options.mutation_failed);
                self.notify(Level::Error, text)
            }
        }
    }

    fn on_delete(&mut self, id: RowId) -> Command<Message<R>> {
        let Some(mutations) = self.mutations.clone() else {
            return Command::none();
        };
        if !self.rows.begin_delete(&id) {
            tracing::trace!(%id, "delete ignored, row busy or not loaded");
            return Command::none();
        }

        tracing::debug!(%id, "deleting row");
        let target = id.clone();
        Command::perform(async move { mutations.delete(&target).await }, move |result| {
            Message::DeleteSettled { id, result }
        })
    }

    fn on_delete_settled(&mut self, id: RowId, result: Result<(), ApiError>) -> Command<Message<R>> {
        let removed = self.rows.settle_delete(&id, &result);
        match result {
            Ok(()) => {
                tracing::info!(%id, removed, "delete confirmed");
                self.selection.remove(&id);
                self.clamp_cursor();
                self.notify(Level::Success, "Deleted".to_string())
            }
            Err(err) => {
                tracing::warn!(%id, error = %err, "delete failed");
                let text = err.user_message(&self.options.mutation_failed);
                self.notify(Level::Error, text)
            }
        }
    }
}

impl<R: Record> Component for ListController<R> {
    type Message = Message<R>;

    fn update(&mut self, msg: Message<R>) -> Command<Message<R>> {
        if !self.mounted {
            tracing::trace!(screen = %self.title, "message after unmount ignored");
            return Command::none();
        }

        match msg {
            Message::SetFilter { key, value } => match self.filters.set_filter(&key, &value) {
                Ok(changed) => self.edited(changed),
                Err(err) => {
                    tracing::debug!(%key, error = %err, "filter value rejected");
                    Command::none()
                }
            },
            Message::ClearFilters => {
                let changed = self.filters.clear();
                self.edited(changed)
            }
            Message::GotoPage(page) => {
                let changed = self.filters.set_page(page).unwrap_or(false);
                self.edited(changed)
            }
            Message::NextPage => {
                let pagination = self.filters.pagination();
                if pagination.page >= self.query.status().total_pages {
                    return Command::none();
                }
                let changed = self.filters.set_page(pagination.page + 1).unwrap_or(false);
                self.edited(changed)
            }
            Message::PrevPage => {
                let page = self.filters.pagination().page;
                if page <= 1 {
                    return Command::none();
                }
                let changed = self.filters.set_page(page - 1).unwrap_or(false);
                self.edited(changed)
            }
            Message::SetPageSize(size) => match self.filters.set_page_size(size) {
                Ok(changed) => self.edited(changed),
                Err(err) => {
                    tracing::debug!(error = %err, "page size rejected");
                    Command::none()
                }
            },
            Message::NextPageSize => {
                let size = self.filters.next_page_size();
                let changed = self.filters.set_page_size(size).unwrap_or(false);
                self.edited(changed)
            }
            Message::Settled(token) => {
                if !self.debouncer.is_current(token) {
                    return Command::none();
                }
                self.sync_address();
                let request = self.filters.request();
                if self.query.needs_fetch(&request) {
                    self.issue(request)
                } else {
                    Command::none()
                }
            }
            Message::Refresh => {
                self.debouncer.cancel();
                self.sync_address();
                let request = self.filters.request();
                self.issue(request)
            }
            Message::Fetched { generation, result } => self.on_fetched(generation, result),
            Message::ToggleStatus(id) => self.on_toggle(id),
            Message::ToggleSettled { ticket, result } => self.on_toggle_settled(ticket, result),
            Message::Delete(id) => self.on_delete(id),
            Message::DeleteSettled { id, result } => self.on_delete_settled(id, result),
            Message::SelectAllVisible => {
                let visible = self.rows.ids();
                self.selection.select_all_visible(&visible);
                Command::none()
            }
            Message::DeselectAllVisible => {
                let visible = self.rows.ids();
                self.selection.deselect_all_visible(&visible);
                Command::none()
            }
            Message::ToggleSelected(id) => {
                if self.rows.contains(&id) {
                    self.selection.toggle(&id);
                }
                Command::none()
            }
            Message::ClearSelection => {
                self.selection.clear();
                Command::none()
            }
            Message::CursorUp => {
                self.cursor = self.cursor.saturating_sub(1);
                Command::none()
            }
            Message::CursorDown => {
                if self.cursor + 1 < self.rows.len() {
                    self.cursor += 1;
                }
                Command::none()
            }
            Message::Dismiss(id) => {
                self.notifications.dismiss(id);
                Command::none()
            }
        }
    }

    fn view(&self, frame: &mut Frame, area: Rect) {
        crate::view::render(self, frame, area);
    }
}

impl<R: Record> ListController<R> {
    pub(crate) fn visible_rows(&self) -> impl Iterator<Item = &Row<R>> {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::MemoryHistory;
    use crate::record::fixtures::Person;
    use crate::record::RowStatus;
    use async_trait::async_trait;
    use opsdash_core::testing::TestProgram;
    use opsdash_core::Model;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory backend: filters by `status` and `name`, pages, and records
    /// every request it serves.
    #[derive(Clone, Default)]
    struct FakeBackend {
        people: Arc<Mutex<Vec<Person>>>,
        served: Arc<Mutex<Vec<ListRequest>>>,
        mutation_results: Arc<Mutex<VecDeque<Result<(), ApiError>>>>,
        fail_fetch: Arc<Mutex<Option<ApiError>>>,
    }

    impl FakeBackend {
        fn with_people(people: Vec<Person>) -> Self {
            let backend = FakeBackend::default();
            *backend.people.lock().unwrap() = people;
            backend
        }

        fn served(&self) -> Vec<ListRequest> {
            self.served.lock().unwrap().clone()
        }

        fn rename(&self, id: &str, name: &str, status: RowStatus) {
            for p in self.people.lock().unwrap().iter_mut() {
                if p.id.as_str() == id {
                    p.name = name.to_string();
                    p.status = status;
                }
            }
        }

        fn next_mutation(&self, result: Result<(), ApiError>) {
            self.mutation_results.lock().unwrap().push_back(result);
        }
    }

    #[async_trait]
    impl ListSource<Person> for FakeBackend {
        async fn fetch(&self, request: ListRequest) -> Result<ListPage<Person>, ApiError> {
            self.served.lock().unwrap().push(request.clone());
            if let Some(err) = self.fail_fetch.lock().unwrap().clone() {
                return Err(err);
            }
            let matching: Vec<Person> = self
                .people
                .lock()
                .unwrap()
                .iter()
                .filter(|p| {
                    request
                        .filters
                        .get("status")
                        .is_none_or(|s| p.status.label() == s)
                })
                .filter(|p| request.filters.get("name").is_none_or(|n| p.name.contains(n)))
                .cloned()
                .collect();
            let size = request.page_size as usize;
            let start = (request.page as usize - 1) * size;
            Ok(ListPage {
                rows: matching.iter().skip(start).take(size).cloned().collect(),
                total_records: matching.len() as u64,
                total_pages: (matching.len().div_ceil(size) as u32).max(1),
            })
        }
    }

    #[async_trait]
    impl RowMutations for FakeBackend {
        async fn toggle_status(&self, _id: &RowId, _target: RowStatus) -> Result<(), ApiError> {
            self.mutation_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }

        async fn delete(&self, _id: &RowId) -> Result<(), ApiError> {
            self.mutation_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    struct Screen(ListController<Person>);

    impl Model for Screen {
        type Message = Message<Person>;
        type Flags = ListSpec<Person>;

        fn init(spec: ListSpec<Person>) -> (Self, Command<Message<Person>>) {
            let (controller, cmd) = ListController::mount(spec);
            (Screen(controller), cmd)
        }

        fn update(&mut self, msg: Message<Person>) -> Command<Message<Person>> {
            self.0.update(msg)
        }

        fn view(&self, frame: &mut Frame) {
            self.0.view(frame, frame.area());
        }
    }

    fn people(n: usize) -> Vec<Person> {
        (1..=n).map(|i| Person::active(&format!("p{i:02}"))).collect()
    }

    fn program(backend: &FakeBackend, history: &MemoryHistory) -> TestProgram<Screen> {
        TestProgram::new(ListSpec {
            title: "People".into(),
            source: Arc::new(backend.clone()),
            mutations: Some(Arc::new(backend.clone())),
            navigator: Box::new(history.clone()),
            options: ControllerOptions::default(),
        })
    }

    fn ctl(prog: &TestProgram<Screen>) -> &ListController<Person> {
        &prog.model().0
    }

    fn status_of(prog: &TestProgram<Screen>, id: &str) -> RowStatus {
        ctl(prog).rows().get(&id.into()).unwrap().record().status
    }

    fn set_filter(key: &str, value: &str) -> Message<Person> {
        Message::SetFilter {
            key: key.into(),
            value: value.into(),
        }
    }

    #[tokio::test]
    async fn mount_fetches_from_address() {
        let mut people = people(30);
        for p in people.iter_mut().skip(25) {
            p.status = RowStatus::Inactive;
        }
        let backend = FakeBackend::with_people(people);
        let history = MemoryHistory::new("/people", "status=Active&page=1&pageSize=10");
        let mut prog = program(&backend, &history);

        assert!(ctl(&prog).status().loading);
        prog.resolve_all().await;

        let status = ctl(&prog).status();
        assert_eq!(ctl(&prog).rows().len(), 10);
        assert_eq!(status.total_records, 25);
        assert_eq!(status.total_pages, 3);
        assert!(!status.loading);
    }

    #[tokio::test]
    async fn edits_within_window_issue_one_fetch_with_last_value() {
        let backend = FakeBackend::with_people(people(3));
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);
        prog.resolve_all().await;

        for (i, value) in ["a", "an", "ann"].into_iter().enumerate() {
            if i > 0 {
                prog.advance(Duration::from_millis(100));
            }
            prog.send(set_filter("name", value));
        }
        prog.advance(Duration::from_millis(299));
        assert_eq!(prog.pending_tasks(), 0);
        assert_eq!(history.query(), "");

        prog.advance(Duration::from_millis(1));
        assert_eq!(prog.pending_tasks(), 1);
        assert_eq!(history.query(), "name=ann&page=1&pageSize=10");
        assert_eq!(history.len(), 1);

        prog.resolve_all().await;
        let served = backend.served();
        assert_eq!(served.len(), 2);
        assert_eq!(served[1].filters.get("name"), Some("ann"));
    }

    #[tokio::test]
    async fn later_request_wins_when_earlier_arrives_late() {
        let mut people = people(4);
        people[0].status = RowStatus::Inactive;
        let backend = FakeBackend::with_people(people);
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);
        prog.resolve_all().await;

        prog.send(set_filter("status", "Inactive"));
        prog.advance(Duration::from_millis(300));
        prog.send(set_filter("status", "Active"));
        prog.advance(Duration::from_millis(300));
        assert_eq!(prog.pending_tasks(), 2);

        prog.resolve(1).await;
        assert_eq!(ctl(&prog).rows().len(), 3);

        prog.resolve(0).await;
        assert_eq!(ctl(&prog).rows().len(), 3);
        assert_eq!(ctl(&prog).status().total_records, 3);
    }

    #[tokio::test]
    async fn toggle_is_visible_before_the_round_trip() {
        let backend = FakeBackend::with_people(people(2));
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);
        prog.resolve_all().await;

        prog.send(Message::ToggleStatus("p01".into()));
        assert_eq!(status_of(&prog, "p01"), RowStatus::Inactive);
        assert!(!ctl(&prog).toggle_enabled(&"p01".into()));
        assert_eq!(prog.pending_tasks(), 1);

        prog.send(Message::ToggleStatus("p01".into()));
        assert_eq!(prog.pending_tasks(), 1);

        prog.resolve_all().await;
        assert_eq!(status_of(&prog, "p01"), RowStatus::Inactive);
        assert!(ctl(&prog).toggle_enabled(&"p01".into()));
        assert_eq!(
            ctl(&prog).notifications().latest().map(|n| n.level),
            Some(Level::Success)
        );
    }

    #[tokio::test]
    async fn rejected_toggle_reverts_and_reports_server_message() {
        let mut people = people(2);
        people[0].id = "g1".into();
        let backend = FakeBackend::with_people(people);
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);
        prog.resolve_all().await;

        backend.next_mutation(Err(ApiError::rejected(Some("locked".into()))));
        prog.send(Message::ToggleStatus("g1".into()));
        prog.resolve_all().await;

        assert_eq!(status_of(&prog, "g1"), RowStatus::Active);
        assert_eq!(status_of(&prog, "p02"), RowStatus::Active);
        let latest = ctl(&prog).notifications().latest().unwrap();
        assert_eq!(latest.level, Level::Error);
        assert!(latest.text.contains("locked"));
    }

    #[tokio::test]
    async fn network_failure_uses_fallback_text() {
        let backend = FakeBackend::with_people(people(1));
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);
        prog.resolve_all().await;

        backend.next_mutation(Err(ApiError::Network("reset".into())));
        prog.send(Message::ToggleStatus("p01".into()));
        prog.resolve_all().await;

        let latest = ctl(&prog).notifications().latest().unwrap();
        assert_eq!(latest.text, ControllerOptions::default().mutation_failed);
    }

    #[tokio::test]
    async fn refetch_during_toggle_keeps_optimistic_status() {
        let backend = FakeBackend::with_people(people(2));
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);
        prog.resolve_all().await;

        prog.send(Message::ToggleStatus("p01".into()));
        backend.rename("p01", "Renamed", RowStatus::Active);
        prog.send(Message::Refresh);
        assert_eq!(prog.pending_tasks(), 2);

        prog.resolve(1).await;
        let row = ctl(&prog).rows().get(&"p01".into()).unwrap();
        assert_eq!(row.record().status, RowStatus::Inactive);
        assert_eq!(row.record().name, "Renamed");

        prog.resolve(0).await;
        assert_eq!(status_of(&prog, "p01"), RowStatus::Inactive);
    }

    #[tokio::test]
    async fn late_failure_of_earlier_toggle_spares_the_newer_one() {
        let backend = FakeBackend::with_people(people(2));
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);
        prog.resolve_all().await;

        prog.send(Message::ToggleStatus("p01".into()));
        assert_eq!(prog.pending_tasks(), 1);

        prog.send(set_filter("status", "Inactive"));
        prog.advance(Duration::from_millis(300));
        prog.resolve(1).await;
        assert!(!ctl(&prog).rows().contains(&"p01".into()));

        prog.send(set_filter("status", ""));
        prog.advance(Duration::from_millis(300));
        prog.resolve(1).await;
        assert_eq!(status_of(&prog, "p01"), RowStatus::Active);
        assert!(ctl(&prog).toggle_enabled(&"p01".into()));

        prog.send(Message::ToggleStatus("p01".into()));
        assert_eq!(status_of(&prog, "p01"), RowStatus::Inactive);
        assert_eq!(prog.pending_tasks(), 2);

        backend.next_mutation(Err(ApiError::Network("reset".into())));
        prog.resolve(0).await;
        assert_eq!(status_of(&prog, "p01"), RowStatus::Inactive);
        assert!(!ctl(&prog).toggle_enabled(&"p01".into()));

        prog.resolve_all().await;
        assert_eq!(status_of(&prog, "p01"), RowStatus::Inactive);
        assert!(ctl(&prog).toggle_enabled(&"p01".into()));
    }

    #[tokio::test]
    async fn selection_survives_paging_away_and_back() {
        let backend = FakeBackend::with_people(people(5));
        let history = MemoryHistory::new("/people", "");
        let mut prog = TestProgram::<Screen>::new(ListSpec {
            title: "People".into(),
            source: Arc::new(backend.clone()),
            mutations: None,
            navigator: Box::new(history.clone()),
            options: ControllerOptions {
                page_sizes: vec![3],
                default_page_size: 3,
                ..ControllerOptions::default()
            },
        });
        prog.resolve_all().await;
        prog.send(Message::SelectAllVisible);
        assert!(ctl(&prog).all_visible_selected());

        prog.send(Message::NextPage);
        prog.advance(Duration::from_millis(300));
        prog.resolve_all().await;
        assert_eq!(ctl(&prog).rows().ids(), vec![RowId::from("p04"), RowId::from("p05")]);
        assert!(!ctl(&prog).all_visible_selected());

        prog.send(Message::PrevPage);
        prog.advance(Duration::from_millis(300));
        prog.resolve_all().await;
        assert!(ctl(&prog).all_visible_selected());
        assert_eq!(ctl(&prog).selection().len(), 3);
    }

    #[tokio::test]
    async fn rows_gone_from_refetch_leave_selection() {
        let backend = FakeBackend::with_people(people(3));
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);
        prog.resolve_all().await;
        prog.send(Message::SelectAllVisible);

        backend.people.lock().unwrap().retain(|p| p.id.as_str() != "p02");
        prog.send(Message::Refresh);
        prog.resolve_all().await;

        assert!(!ctl(&prog).selection().contains(&"p02".into()));
        assert_eq!(ctl(&prog).selection().len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_row_and_selection_only_on_success() {
        let backend = FakeBackend::with_people(people(2));
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);
        prog.resolve_all().await;
        prog.send(Message::ToggleSelected("p01".into()));

        backend.next_mutation(Err(ApiError::Network("reset".into())));
        prog.send(Message::Delete("p01".into()));
        prog.resolve_all().await;
        assert!(ctl(&prog).rows().contains(&"p01".into()));
        assert!(ctl(&prog).selection().contains(&"p01".into()));

        prog.send(Message::Delete("p01".into()));
        prog.resolve_all().await;
        assert!(!ctl(&prog).rows().contains(&"p01".into()));
        assert!(ctl(&prog).selection().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_page_is_clamped_once() {
        let backend = FakeBackend::with_people(people(25));
        let history = MemoryHistory::new("/people", "page=9&pageSize=10");
        let mut prog = program(&backend, &history);

        prog.resolve(0).await;
        assert_eq!(ctl(&prog).filters().pagination().page, 3);
        assert_eq!(history.query(), "page=3&pageSize=10");
        assert_eq!(prog.pending_tasks(), 1);

        prog.resolve_all().await;
        assert_eq!(ctl(&prog).rows().len(), 5);
        assert_eq!(backend.served().len(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_clears_rows_and_notifies() {
        let backend = FakeBackend::with_people(people(2));
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);
        prog.resolve_all().await;

        *backend.fail_fetch.lock().unwrap() = Some(ApiError::rejected(Some("bad filter".into())));
        prog.send(Message::Refresh);
        prog.resolve_all().await;

        assert!(ctl(&prog).rows().is_empty());
        assert_eq!(ctl(&prog).status().error.as_deref(), Some("bad filter"));
        assert_eq!(
            ctl(&prog).notifications().latest().map(|n| n.text.as_str()),
            Some("bad filter")
        );
    }

    #[tokio::test]
    async fn invalid_filter_never_reaches_the_network() {
        let backend = FakeBackend::with_people(people(2));
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);
        prog.resolve_all().await;

        prog.send(set_filter("joined", "yesterday"));
        prog.advance(Duration::from_secs(1));

        assert_eq!(prog.pending_tasks(), 0);
        assert!(ctl(&prog).filters().error("joined").is_some());
        assert_eq!(backend.served().len(), 1);
    }

    #[tokio::test]
    async fn notifications_dismiss_themselves() {
        let backend = FakeBackend::with_people(people(1));
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);
        prog.resolve_all().await;

        prog.send(Message::ToggleStatus("p01".into()));
        prog.resolve_all().await;
        assert_eq!(ctl(&prog).notifications().len(), 1);

        prog.advance(Duration::from_secs(4));
        assert!(ctl(&prog).notifications().is_empty());
    }

    #[tokio::test]
    async fn nothing_happens_after_unmount() {
        let backend = FakeBackend::with_people(people(2));
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);

        prog.model_mut().0.unmount();
        prog.resolve_all().await;
        assert!(ctl(&prog).rows().is_empty());

        prog.send(set_filter("name", "x"));
        prog.advance(Duration::from_secs(1));
        assert_eq!(prog.pending_tasks(), 0);
        assert_eq!(history.query(), "");
    }

    #[tokio::test]
    async fn export_covers_selected_loaded_rows() {
        let backend = FakeBackend::with_people(people(2));
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);
        prog.resolve_all().await;

        prog.send(Message::ToggleSelected("p02".into()));
        let table = ctl(&prog).export();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], "p02");
        assert_eq!(table.omitted, 0);
    }

    #[tokio::test]
    async fn renders_markers_and_footer() {
        let backend = FakeBackend::with_people(people(2));
        let history = MemoryHistory::new("/people", "");
        let mut prog = program(&backend, &history);
        prog.resolve_all().await;
        prog.send(Message::ToggleSelected("p01".into()));
        prog.send(Message::ToggleStatus("p02".into()));

        let screen = prog.render_string(80, 10);
        assert!(screen.contains("[x]"));
        assert!(screen.contains("name-p01"));
        assert!(screen.contains("Inactive …"));
        assert!(screen.contains("Page 1/1 · 2 records"));
    }
}
