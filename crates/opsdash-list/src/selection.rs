//! Cross-page row selection and export of the loaded part of it.

use crate::reconcile::RowSet;
use crate::record::{Record, RowId};
use serde::Serialize;
use std::collections::BTreeSet;

/// Ids the user selected, independent of the page or filters in view.
///
/// Only explicit user actions and row removal change it; fetching a
/// different page never does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<RowId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_all_visible<'a>(&mut self, visible: impl IntoIterator<Item = &'a RowId>) {
        self.ids.extend(visible.into_iter().cloned());
    }

    /// Remove exactly the visible ids; selections on other pages stay.
    pub fn deselect_all_visible<'a>(&mut self, visible: impl IntoIterator<Item = &'a RowId>) {
        for id in visible {
            self.ids.remove(id);
        }
    }

    /// Whether every visible id is selected. An empty view is never "all selected".
    pub fn all_selected<'a>(&self, visible: impl IntoIterator<Item = &'a RowId>) -> bool {
        let mut any = false;
        for id in visible {
            if !self.ids.contains(id) {
                return false;
            }
            any = true;
        }
        any
    }

    /// Flip one id. Returns whether it is now selected.
    pub fn toggle(&mut self, id: &RowId) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.clone());
            true
        }
    }

    pub fn remove(&mut self, id: &RowId) -> bool {
        self.ids.remove(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowId> {
        self.ids.iter()
    }

    /// Tabulate the selected rows that are loaded, using the record's
    /// curated export columns. Selected ids that are not in memory cannot
    /// be exported and are only counted.
    pub fn export<R: Record>(&self, loaded: &RowSet<R>) -> ExportTable {
        let rows: Vec<Vec<String>> = loaded
            .records()
            .filter(|record| self.ids.contains(record.id()))
            .map(R::export_cells)
            .collect();
        let loaded_ids: BTreeSet<&RowId> = loaded.records().map(R::id).collect();
        let omitted = self.ids.iter().filter(|id| !loaded_ids.contains(id)).count();
        if omitted > 0 {
            tracing::debug!(omitted, "selected rows not loaded are left out of the export");
        }
        ExportTable {
            headers: R::EXPORT_COLUMNS.iter().map(|h| h.to_string()).collect(),
            rows,
            omitted,
        }
    }
}

/// Tabular export output. Byte-level formatting is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Selected ids left out because they are not loaded.
    pub omitted: usize,
}
