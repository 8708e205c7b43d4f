//! Read-only calendar summary over a date range.
//!
//! The range comes from a [`ViewMode`] and an anchor date. Changing either is
//! debounced and fetched with the same last-issued-wins discipline as list
//! screens; each accepted response is folded into per-field totals by
//! [`aggregate`].

use crate::error::ApiError;
use crate::options::ControllerOptions;
use crate::query::{DebounceToken, Debouncer, Generation, RequestGeneration};
use async_trait::async_trait;
use jiff::civil::Date;
use jiff::Span;
use opsdash_core::{Command, Component};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use ratatui::Frame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewMode {
    Day,
    #[default]
    Week,
    Month,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewMode::Day => "Day",
            ViewMode::Week => "Week",
            ViewMode::Month => "Month",
        })
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub from: Date,
    pub to: Date,
}

/// The range shown for `anchor` in `mode`. Weeks start on Monday.
pub fn range_for(mode: ViewMode, anchor: Date) -> DateRange {
    match mode {
        ViewMode::Day => DateRange {
            from: anchor,
            to: anchor,
        },
        ViewMode::Week => {
            let offset = anchor.weekday().to_monday_zero_offset();
            let from = anchor.saturating_sub(Span::new().days(offset));
            DateRange {
                from,
                to: from.saturating_add(Span::new().days(6)),
            }
        }
        ViewMode::Month => DateRange {
            from: anchor.first_of_month(),
            to: anchor.last_of_month(),
        },
    }
}

/// Move `anchor` one period forward or back.
pub fn shift(mode: ViewMode, anchor: Date, forward: bool) -> Date {
    let step = match mode {
        ViewMode::Day => Span::new().days(1),
        ViewMode::Week => Span::new().weeks(1),
        ViewMode::Month => Span::new().months(1),
    };
    if forward {
        anchor.saturating_add(step)
    } else {
        anchor.saturating_sub(step)
    }
}

/// Counts for one day. A field may be absent or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: Date,
    #[serde(default)]
    pub summary: BTreeMap<String, Option<u64>>,
}

/// Sum every summary field across entries; missing values count as zero.
pub fn aggregate(entries: &[DailySummary]) -> BTreeMap<String, u64> {
    let mut totals = BTreeMap::new();
    for entry in entries {
        for (field, value) in &entry.summary {
            *totals.entry(field.clone()).or_insert(0) += value.unwrap_or(0);
        }
    }
    totals
}

/// Summary query for a date range.
#[async_trait]
pub trait RangeSource: Send + Sync + 'static {
    async fn summaries(&self, range: DateRange) -> Result<Vec<DailySummary>, ApiError>;
}

#[derive(Debug)]
pub enum Message {
    SetMode(ViewMode),
    SetAnchor(Date),
    Previous,
    Next,
    Today,
    Refresh,
    Settled(DebounceToken),
    Fetched {
        generation: Generation,
        range: DateRange,
        result: Result<Vec<DailySummary>, ApiError>,
    },
}

pub struct RangeAggregation {
    title: String,
    source: Arc<dyn RangeSource>,
    mode: ViewMode,
    anchor: Date,
    debouncer: Debouncer,
    generation: RequestGeneration,
    last_issued: Option<DateRange>,
    loading: bool,
    error: Option<String>,
    shown: Option<DateRange>,
    entries: Vec<DailySummary>,
    totals: BTreeMap<String, u64>,
    load_failed: String,
    mounted: bool,
}

impl RangeAggregation {
    /// Build the hook and issue the first fetch right away.
    pub fn mount(
        title: impl Into<String>,
        source: Arc<dyn RangeSource>,
        mode: ViewMode,
        anchor: Date,
        options: &ControllerOptions,
    ) -> (Self, Command<Message>) {
        let mut hook = RangeAggregation {
            title: title.into(),
            source,
            mode,
            anchor,
            debouncer: Debouncer::new(options.debounce),
            generation: RequestGeneration::new(),
            last_issued: None,
            loading: false,
            error: None,
            shown: None,
            entries: Vec::new(),
            totals: BTreeMap::new(),
            load_failed: options.load_failed.clone(),
            mounted: true,
        };
        let cmd = hook.issue(hook.range());
        (hook, cmd)
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
        self.debouncer.cancel();
        self.generation.invalidate();
        self.loading = false;
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn anchor(&self) -> Date {
        self.anchor
    }

    /// The range the current mode and anchor describe.
    pub fn range(&self) -> DateRange {
        range_for(self.mode, self.anchor)
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn entries(&self) -> &[DailySummary] {
        &self.entries
    }

    pub fn totals(&self) -> &BTreeMap<String, u64> {
        &self.totals
    }

    fn issue(&mut self, range: DateRange) -> Command<Message> {
        let generation = self.generation.issue();
        self.last_issued = Some(range);
        self.loading = true;
        tracing::debug!(from = %range.from, to = %range.to, "issuing summary fetch");
        let source = Arc::clone(&self.source);
        Command::perform(async move { source.summaries(range).await }, move |result| {
            Message::Fetched {
                generation,
                range,
                result,
            }
        })
    }

    fn moved(&mut self, mode: ViewMode, anchor: Date) -> Command<Message> {
        if mode == self.mode && anchor == self.anchor {
            return Command::none();
        }
        self.mode = mode;
        self.anchor = anchor;
        self.debouncer.schedule(Message::Settled)
    }
}

impl Component for RangeAggregation {
    type Message = Message;

    fn update(&mut self, msg: Message) -> Command<Message> {
        if !self.mounted {
            return Command::none();
        }
        match msg {
            Message::SetMode(mode) => self.moved(mode, self.anchor),
            Message::SetAnchor(anchor) => self.moved(self.mode, anchor),
            Message::Previous => self.moved(self.mode, shift(self.mode, self.anchor, false)),
            Message::Next => self.moved(self.mode, shift(self.mode, self.anchor, true)),
            Message::Today => self.moved(self.mode, jiff::Zoned::now().date()),
            Message::Refresh => {
                self.debouncer.cancel();
                self.issue(self.range())
            }
            Message::Settled(token) => {
                let range = self.range();
                if self.debouncer.is_current(token) && self.last_issued != Some(range) {
                    self.issue(range)
                } else {
                    Command::none()
                }
            }
            Message::Fetched {
                generation,
                range,
                result,
            } => {
                if !self.generation.is_current(generation) {
                    tracing::trace!(from = %range.from, to = %range.to, "discarding superseded summary");
                    return Command::none();
                }
                self.loading = false;
                self.shown = Some(range);
                match result {
                    Ok(entries) => {
                        self.totals = aggregate(&entries);
                        self.entries = entries;
                        self.error = None;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "summary fetch failed");
                        self.entries.clear();
                        self.totals.clear();
                        self.error = Some(err.user_message(&self.load_failed));
                    }
                }
                Command::none()
            }
        }
    }

    fn view(&self, frame: &mut Frame, area: Rect) {
        let [header_area, body_area] =
            Layout::vertical([Constraint::Length(2), Constraint::Min(3)]).areas(area);

        let range = self.shown.unwrap_or_else(|| self.range());
        let mut header = format!("{} {} .. {}", self.mode, range.from, range.to);
        if self.loading {
            header.push_str("  (loading)");
        }
        let totals = if let Some(err) = &self.error {
            err.clone()
        } else {
            self.totals
                .iter()
                .map(|(field, total)| format!("{field}: {total}"))
                .collect::<Vec<_>>()
                .join("  ")
        };
        frame.render_widget(
            Paragraph::new(format!("{header}\n{totals}")).style(Style::default().fg(Color::Cyan)),
            header_area,
        );

        let fields: Vec<&String> = self.totals.keys().collect();
        let header_row = Row::new(
            std::iter::once("Date".to_string())
                .chain(fields.iter().map(|f| f.to_string()))
                .map(|h| {
                    Cell::from(h).style(
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    )
                }),
        );
        let rows = self.entries.iter().map(|entry| {
            let cells = std::iter::once(entry.date.to_string()).chain(fields.iter().map(|f| {
                entry
                    .summary
                    .get(*f)
                    .copied()
                    .flatten()
                    .unwrap_or(0)
                    .to_string()
            }));
            Row::new(cells.map(Cell::from))
        });
        let widths = std::iter::once(Constraint::Length(12))
            .chain(fields.iter().map(|_| Constraint::Fill(1)));
        let table = Table::new(rows, widths).header(header_row).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", self.title)),
        );
        frame.render_widget(table, body_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;
    use opsdash_core::testing::TestProgram;
    use opsdash_core::Model;
    use std::sync::Mutex;
    use std::time::Duration;

    fn day(entry_date: Date, fields: &[(&str, Option<u64>)]) -> DailySummary {
        DailySummary {
            date: entry_date,
            summary: fields.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn aggregate_sums_each_field() {
        let entries = vec![
            day(date(2024, 1, 1), &[("pending", Some(2)), ("completed", Some(1))]),
            day(date(2024, 1, 2), &[("pending", Some(3)), ("completed", Some(0))]),
        ];
        let totals = aggregate(&entries);
        assert_eq!(totals.get("pending"), Some(&5));
        assert_eq!(totals.get("completed"), Some(&1));
    }

    #[test]
    fn aggregate_counts_missing_as_zero_and_ignores_order() {
        let a = day(date(2024, 1, 1), &[("pending", None)]);
        let b = day(date(2024, 1, 2), &[("pending", Some(4)), ("cancelled", Some(2))]);
        let forward = aggregate(&[a.clone(), b.clone()]);
        let backward = aggregate(&[b, a]);
        assert_eq!(forward, backward);
        assert_eq!(forward.get("pending"), Some(&4));
        assert_eq!(forward.get("cancelled"), Some(&2));
    }

    #[test]
    fn summary_parses_wire_shape() {
        let entry: DailySummary =
            serde_json::from_str(r#"{"date":"2024-01-01","summary":{"pending":2,"completed":null}}"#)
                .unwrap();
        assert_eq!(entry.date, date(2024, 1, 1));
        assert_eq!(entry.summary.get("completed"), Some(&None));
    }

    #[test]
    fn week_starts_on_monday() {
        // 2024-01-04 is a Thursday.
        let range = range_for(ViewMode::Week, date(2024, 1, 4));
        assert_eq!(range.from, date(2024, 1, 1));
        assert_eq!(range.to, date(2024, 1, 7));
    }

    #[test]
    fn month_covers_whole_month() {
        let range = range_for(ViewMode::Month, date(2024, 2, 14));
        assert_eq!(range.from, date(2024, 2, 1));
        assert_eq!(range.to, date(2024, 2, 29));
    }

    #[test]
    fn shift_moves_one_period() {
        assert_eq!(shift(ViewMode::Day, date(2024, 1, 31), true), date(2024, 2, 1));
        assert_eq!(shift(ViewMode::Week, date(2024, 1, 4), false), date(2023, 12, 28));
        assert_eq!(shift(ViewMode::Month, date(2024, 1, 31), true), date(2024, 2, 29));
    }

    #[derive(Default)]
    struct FakeSummaries {
        requested: Mutex<Vec<DateRange>>,
    }

    #[async_trait]
    impl RangeSource for FakeSummaries {
        async fn summaries(&self, range: DateRange) -> Result<Vec<DailySummary>, ApiError> {
            self.requested.lock().unwrap().push(range);
            Ok(vec![day(range.from, &[("pending", Some(1))])])
        }
    }

    struct Screen(RangeAggregation);

    impl Model for Screen {
        type Message = Message;
        type Flags = (Arc<FakeSummaries>, Date);

        fn init((source, anchor): Self::Flags) -> (Self, Command<Message>) {
            let (hook, cmd) = RangeAggregation::mount(
                "Orders",
                source,
                ViewMode::Week,
                anchor,
                &ControllerOptions::default(),
            );
            (Screen(hook), cmd)
        }

        fn update(&mut self, msg: Message) -> Command<Message> {
            self.0.update(msg)
        }

        fn view(&self, frame: &mut Frame) {
            self.0.view(frame, frame.area());
        }
    }

    #[tokio::test]
    async fn navigation_is_debounced_and_last_range_wins() {
        let source = Arc::new(FakeSummaries::default());
        let mut prog = TestProgram::<Screen>::new((source.clone(), date(2024, 1, 4)));
        prog.resolve_all().await;
        assert_eq!(prog.model().0.totals().get("pending"), Some(&1));

        prog.send(Message::Next);
        prog.send(Message::Next);
        prog.advance(Duration::from_millis(300));
        assert_eq!(prog.pending_tasks(), 1);

        prog.send(Message::SetMode(ViewMode::Month));
        prog.advance(Duration::from_millis(300));
        assert_eq!(prog.pending_tasks(), 2);

        // The month fetch lands first; the week fetch arriving late is dropped.
        prog.resolve(1).await;
        prog.resolve(0).await;
        let hook = &prog.model().0;
        assert_eq!(hook.entries().len(), 1);
        assert_eq!(hook.entries()[0].date, date(2024, 1, 1));
        assert!(!hook.loading());

        let requested = source.requested.lock().unwrap().clone();
        assert_eq!(requested.len(), 3);
        assert_eq!(requested[2].from, date(2024, 1, 15));
    }

    #[tokio::test]
    async fn unchanged_range_is_not_refetched() {
        let source = Arc::new(FakeSummaries::default());
        let mut prog = TestProgram::<Screen>::new((source.clone(), date(2024, 1, 4)));
        prog.resolve_all().await;

        // Another day in the same week.
        prog.send(Message::SetAnchor(date(2024, 1, 5)));
        prog.advance(Duration::from_millis(300));
        assert_eq!(prog.pending_tasks(), 0);
    }

    #[tokio::test]
    async fn renders_totals() {
        let source = Arc::new(FakeSummaries::default());
        let mut prog = TestProgram::<Screen>::new((source, date(2024, 1, 4)));
        prog.resolve_all().await;
        let screen = prog.render_string(60, 8);
        assert!(screen.contains("Week 2024-01-01 .. 2024-01-07"));
        assert!(screen.contains("pending: 1"));
    }
}
