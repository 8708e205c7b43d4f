//! Local row state and its merge with freshly fetched rows.

use crate::record::{Record, RowId, RowStatus};
use std::collections::{HashMap, HashSet};

/// Per-row mutation tag.
///
/// [`Pending`](RowState::Pending) and [`Removing`](RowState::Removing) rows
/// are in flight: no new mutation starts on them until the outstanding one
/// settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    /// Server truth, nothing outstanding.
    Confirmed,
    /// A status toggle was applied locally and awaits confirmation.
    /// `ticket` is the sequence number of the toggle that set the tag.
    Pending {
        ticket: u64,
        optimistic: RowStatus,
        previous: RowStatus,
    },
    /// A delete awaits confirmation. The row itself is left untouched.
    Removing,
}

impl RowState {
    pub fn is_in_flight(self) -> bool {
        !matches!(self, RowState::Confirmed)
    }
}

/// A loaded row and its mutation tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<R> {
    pub(crate) record: R,
    pub(crate) state: RowState,
}

impl<R: Record> Row<R> {
    pub fn confirmed(record: R) -> Self {
        Row {
            record,
            state: RowState::Confirmed,
        }
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn state(&self) -> RowState {
        self.state
    }

    pub fn id(&self) -> &RowId {
        self.record.id()
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.is_in_flight()
    }
}

/// The rows currently held in memory, in server order.
#[derive(Debug, Clone)]
pub struct RowSet<R> {
    rows: Vec<Row<R>>,
    /// Last toggle ticket issued per id, kept across drops and refetches.
    pub(crate) latest_ticket: HashMap<RowId, u64>,
    pub(crate) next_ticket: u64,
}

impl<R> Default for RowSet<R> {
    fn default() -> Self {
        RowSet {
            rows: Vec::new(),
            latest_ticket: HashMap::new(),
            next_ticket: 0,
        }
    }
}

impl<R: Record> RowSet<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fetched page into local state and return the ids that were
    /// dropped because the page no longer contains them.
    ///
    /// A row with a toggle pending keeps its optimistic status and its tag
    /// while every other field takes the fetched value. Any other row is
    /// replaced by server truth. New rows come in confirmed. A repeated id
    /// keeps only its first occurrence.
    pub fn reconcile(&mut self, fetched: Vec<R>) -> Vec<RowId> {
        let mut previous: HashMap<RowId, Row<R>> = self
            .rows
            .drain(..)
            .map(|row| (row.record.id().clone(), row))
            .collect();

        let mut seen = HashSet::new();
        self.rows = fetched
            .into_iter()
            .filter(|record| seen.insert(record.id().clone()))
            .map(|mut record| match previous.remove(record.id()) {
                Some(old) => {
                    if let RowState::Pending { optimistic, .. } = old.state {
                        record.set_status(optimistic);
                    }
                    Row {
                        record,
                        state: old.state,
                    }
                }
                None => Row::confirmed(record),
            })
            .collect();

        let mut dropped: Vec<RowId> = previous.into_keys().collect();
        dropped.sort();
        dropped
    }

    /// Forget every row, in-flight tags included.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn get(&self, id: &RowId) -> Option<&Row<R>> {
        self.rows.iter().find(|row| row.record.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: &RowId) -> Option<&mut Row<R>> {
        self.rows.iter_mut().find(|row| row.record.id() == id)
    }

    pub fn remove(&mut self, id: &RowId) -> Option<Row<R>> {
        let idx = self.rows.iter().position(|row| row.record.id() == id)?;
        Some(self.rows.remove(idx))
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<RowId> {
        self.rows.iter().map(|row| row.id().clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row<R>> {
        self.rows.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.rows.iter().map(|row| &row.record)
    }

    /// Ids with a mutation outstanding.
    pub fn in_flight(&self) -> impl Iterator<Item = &RowId> {
        self.rows
            .iter()
            .filter(|row| row.is_in_flight())
            .map(|row| row.id())
    }

    pub fn is_in_flight(&self, id: &RowId) -> bool {
        self.get(id).is_some_and(Row::is_in_flight)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::Person;

    fn set(rows: &[Person]) -> RowSet<Person> {
        let mut set = RowSet::new();
        set.reconcile(rows.to_vec());
        set
    }

    #[test]
    fn confirmed_rows_take_server_truth() {
        let mut rows = set(&[Person::active("a")]);
        rows.reconcile(vec![Person::new("a", "Ann", RowStatus::Inactive)]);

        let row = rows.get(&"a".into()).unwrap();
        assert_eq!(row.record().name, "Ann");
        assert_eq!(row.record().status, RowStatus::Inactive);
    }

    #[test]
    fn pending_row_keeps_status_but_refreshes_other_fields() {
        let mut rows = set(&[Person::active("r")]);
        rows.get_mut(&"r".into()).unwrap().state = RowState::Pending {
            ticket: 1,
            optimistic: RowStatus::Inactive,
            previous: RowStatus::Active,
        };
        rows.get_mut(&"r".into()).unwrap().record.status = RowStatus::Inactive;

        rows.reconcile(vec![Person::new("r", "Renamed", RowStatus::Active)]);

        let row = rows.get(&"r".into()).unwrap();
        assert_eq!(row.record().status, RowStatus::Inactive);
        assert_eq!(row.record().name, "Renamed");
        assert!(row.is_in_flight());
    }

    #[test]
    fn missing_rows_are_dropped_with_their_tags() {
        let mut rows = set(&[Person::active("a"), Person::active("b")]);
        rows.get_mut(&"b".into()).unwrap().state = RowState::Removing;

        let dropped = rows.reconcile(vec![Person::active("a"), Person::active("c")]);

        assert_eq!(dropped, vec![RowId::from("b")]);
        assert_eq!(rows.ids(), vec![RowId::from("a"), RowId::from("c")]);
        assert_eq!(rows.in_flight().count(), 0);
    }

    #[test]
    fn removing_row_still_refreshes_status() {
        let mut rows = set(&[Person::active("a")]);
        rows.get_mut(&"a".into()).unwrap().state = RowState::Removing;
        rows.reconcile(vec![Person::new("a", "x", RowStatus::Inactive)]);

        let row = rows.get(&"a".into()).unwrap();
        assert_eq!(row.record().status, RowStatus::Inactive);
        assert_eq!(row.state(), RowState::Removing);
    }

    #[test]
    fn repeated_id_in_a_page_is_loaded_once() {
        let mut rows = set(&[]);
        rows.reconcile(vec![
            Person::active("a"),
            Person::new("a", "Dup", RowStatus::Inactive),
            Person::active("b"),
        ]);

        assert_eq!(rows.ids(), vec![RowId::from("a"), RowId::from("b")]);
        assert_eq!(rows.get(&"a".into()).unwrap().record().status, RowStatus::Active);
    }

    #[test]
    fn server_order_is_kept() {
        let mut rows = set(&[Person::active("a"), Person::active("b")]);
        rows.reconcile(vec![Person::active("b"), Person::active("a")]);
        assert_eq!(rows.ids(), vec![RowId::from("b"), RowId::from("a")]);
    }
}
