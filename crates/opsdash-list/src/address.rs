//! The navigable address a list screen reads at mount and writes back to.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Collaborator owning the current address.
///
/// List screens only ever *replace* the current entry: filter edits must not
/// grow the history.
pub trait Navigator: Send + 'static {
    /// Query string of the current entry, without a leading `?`.
    fn query(&self) -> String;

    /// Overwrite the query of the current entry in place.
    fn replace_query(&mut self, query: &str);
}

/// One history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: String,
}

#[derive(Debug)]
struct HistoryState {
    entries: Vec<Location>,
}

/// In-process history stack.
///
/// Clones share the same stack, so the application can hold one handle for
/// screen switching while each list controller holds another.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    state: Arc<Mutex<HistoryState>>,
}

impl MemoryHistory {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        let first = Location {
            path: path.into(),
            query: query.into().trim_start_matches('?').to_string(),
        };
        MemoryHistory {
            state: Arc::new(Mutex::new(HistoryState {
                entries: vec![first],
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Navigate to a new entry.
    pub fn push(&self, path: impl Into<String>, query: impl Into<String>) {
        self.lock().entries.push(Location {
            path: path.into(),
            query: query.into().trim_start_matches('?').to_string(),
        });
    }

    /// Go back one entry. The first entry is never popped.
    pub fn back(&self) -> Option<Location> {
        let mut state = self.lock();
        if state.entries.len() <= 1 {
            return None;
        }
        state.entries.pop();
        state.entries.last().cloned()
    }

    pub fn current(&self) -> Location {
        // `entries` is never empty: `new` seeds it and `back` keeps one.
        let state = self.lock();
        state.entries[state.entries.len() - 1].clone()
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }
}

impl Navigator for MemoryHistory {
    fn query(&self) -> String {
        self.current().query
    }

    fn replace_query(&mut self, query: &str) {
        let mut state = self.lock();
        if let Some(last) = state.entries.last_mut() {
            last.query = query.trim_start_matches('?').to_string();
        }
    }
}
