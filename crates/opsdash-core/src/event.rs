use crossterm::event::{Event, KeyEvent, KeyEventKind};

/// Terminal input delivered through
/// [`terminal_events`](crate::subscriptions::terminal_events).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// A key press. Release and repeat events are folded away.
    Key(KeyEvent),
    /// Terminal resized to (columns, rows).
    Resize(u16, u16),
    /// Bracketed paste content.
    Paste(String),
    /// Mouse and focus events; screens here do not react to them.
    Other,
}

impl From<Event> for TerminalEvent {
    fn from(event: Event) -> Self {
        match event {
            Event::Key(k) if k.kind == KeyEventKind::Press => TerminalEvent::Key(k),
            Event::Resize(w, h) => TerminalEvent::Resize(w, h),
            Event::Paste(s) => TerminalEvent::Paste(s),
            _ => TerminalEvent::Other,
        }
    }
}
