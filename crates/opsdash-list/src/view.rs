//! Terminal rendering of a list screen.

use crate::controller::ListController;
use crate::notify::Level;
use crate::reconcile::RowState;
use crate::record::Record;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use ratatui::Frame;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const SELECTED_MARK: &str = "[x]";
const UNSELECTED_MARK: &str = "[ ]";

pub(crate) fn render<R: Record>(list: &ListController<R>, frame: &mut Frame, area: Rect) {
    let [filters_area, table_area, footer_area, notice_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_filters(list, frame, filters_area);
    render_table(list, frame, table_area);
    render_footer(list, frame, footer_area);
    render_notice(list, frame, notice_area);
}

fn render_filters<R: Record>(list: &ListController<R>, frame: &mut Frame, area: Rect) {
    let store = list.filters();
    let mut spans = Vec::new();
    for field in store.schema() {
        if !spans.is_empty() {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(
            format!("{}: ", field.label),
            Style::default().fg(Color::DarkGray),
        ));
        let draft = store.draft(field.key);
        spans.push(Span::raw(if draft.is_empty() { "-" } else { draft }));
        if let Some(err) = store.error(field.key) {
            spans.push(Span::styled(
                format!(" ({err})"),
                Style::default().fg(Color::Red),
            ));
        }
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_table<R: Record>(list: &ListController<R>, frame: &mut Frame, area: Rect) {
    let status = list.status();
    let mut title = format!(" {} ", list.title());
    if status.loading {
        title.push_str("(loading) ");
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let header_cells = std::iter::once("")
        .chain(R::COLUMNS.iter().copied())
        .chain(std::iter::once("Status"))
        .map(|h| {
            Cell::from(h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });
    let header = Row::new(header_cells).height(1);

    let selection = list.selection();
    let rows: Vec<Row> = list
        .visible_rows()
        .map(|row| {
            let mark = if selection.contains(row.id()) {
                SELECTED_MARK
            } else {
                UNSELECTED_MARK
            };
            let record = row.record();
            let status_cell = match row.state() {
                RowState::Confirmed => Cell::from(record.status().label()),
                RowState::Pending { optimistic, .. } => {
                    Cell::from(format!("{} …", optimistic.label()))
                        .style(Style::default().fg(Color::Yellow))
                }
                RowState::Removing => Cell::from("deleting…").style(Style::default().fg(Color::Red)),
            };
            let cells = std::iter::once(Cell::from(mark))
                .chain(record.cells().into_iter().map(Cell::from))
                .chain(std::iter::once(status_cell));
            let style = if row.is_in_flight() {
                Style::default().add_modifier(Modifier::DIM)
            } else {
                Style::default()
            };
            Row::new(cells).style(style)
        })
        .collect();

    let columns = R::COLUMNS.len() as u16;
    let widths = std::iter::once(Constraint::Length(3))
        .chain((0..columns).map(|_| Constraint::Fill(1)))
        .chain(std::iter::once(Constraint::Length(12)));

    let mut state = TableState::default();
    if !list.rows().is_empty() {
        state.select(Some(list.cursor()));
    }

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_footer<R: Record>(list: &ListController<R>, frame: &mut Frame, area: Rect) {
    let status = list.status();
    let pagination = list.filters().pagination();
    let mut text = format!(
        "Page {}/{} · {} records · {} per page · {} selected",
        pagination.page,
        status.total_pages,
        status.total_records,
        pagination.page_size,
        list.selection().len(),
    );
    if let Some(err) = &status.error {
        text.push_str(" · ");
        text.push_str(err);
    }
    let style = if status.error.is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let text = truncate(&text, area.width as usize);
    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_notice<R: Record>(list: &ListController<R>, frame: &mut Frame, area: Rect) {
    let Some(notice) = list.notifications().latest() else {
        return;
    };
    let color = match notice.level {
        Level::Success => Color::Green,
        Level::Error => Color::Red,
        Level::Info => Color::Blue,
    };
    let text = truncate(&notice.text, area.width as usize);
    frame.render_widget(Paragraph::new(text).style(Style::default().fg(color)), area);
}

/// Cut `text` to at most `width` display columns, ending in `…` when cut.
pub(crate) fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}
