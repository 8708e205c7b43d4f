//! Optimistic status toggles and confirmed deletes on a [`RowSet`].
//!
//! A toggle flips the row locally and tags it pending before the request is
//! issued; the settle either confirms or restores the previous status. A
//! delete only tags the row until the backend answers. Both refuse to start
//! on a row that already has a mutation outstanding.
//!
//! Every toggle gets a sequence number. A settle only touches the row when
//! its ticket is the newest one issued for that id, so a slow answer to an
//! old toggle cannot undo a newer one started after a refetch.

use crate::error::ApiError;
use crate::reconcile::{RowSet, RowState};
use crate::record::{Record, RowId, RowStatus};

/// Everything needed to settle one toggle, captured when it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleTicket {
    pub seq: u64,
    pub id: RowId,
    pub target: RowStatus,
    pub previous: RowStatus,
}

/// How a settled toggle left the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The optimistic status stands.
    Kept,
    /// The row went back to its pre-toggle status.
    Reverted,
    /// The row is no longer loaded; nothing to update.
    Detached,
}

impl<R: Record> RowSet<R> {
    /// Flip `id` locally and mark it in flight.
    ///
    /// Returns `None` when the row is unknown or already in flight; the
    /// caller must then not issue a request.
    pub fn begin_toggle(&mut self, id: &RowId) -> Option<ToggleTicket> {
        let seq = self.next_ticket + 1;
        let row = self.get_mut(id)?;
        if row.state.is_in_flight() {
            return None;
        }
        let previous = row.record.status();
        let target = previous.flipped();
        row.record.set_status(target);
        row.state = RowState::Pending {
            ticket: seq,
            optimistic: target,
            previous,
        };
        self.next_ticket = seq;
        self.latest_ticket.insert(id.clone(), seq);
        Some(ToggleTicket {
            seq,
            id: id.clone(),
            target,
            previous,
        })
    }

    /// Apply the backend's answer to a toggle.
    pub fn settle_toggle(
        &mut self,
        ticket: &ToggleTicket,
        result: &Result<(), ApiError>,
    ) -> ToggleOutcome {
        if self.latest_ticket.get(&ticket.id) != Some(&ticket.seq) {
            return ToggleOutcome::Detached;
        }
        self.latest_ticket.remove(&ticket.id);
        let Some(row) = self.get_mut(&ticket.id) else {
            return ToggleOutcome::Detached;
        };

        match (row.state, result) {
            (RowState::Pending { ticket: seq, .. }, _) if seq != ticket.seq => {
                ToggleOutcome::Detached
            }
            (RowState::Pending { .. }, Ok(())) => {
                row.state = RowState::Confirmed;
                ToggleOutcome::Kept
            }
            (RowState::Pending { previous, .. }, Err(_)) => {
                row.record.set_status(previous);
                row.state = RowState::Confirmed;
                ToggleOutcome::Reverted
            }
            // The row was dropped and fetched again while the request ran;
            // only a confirmation tells us something newer than that fetch.
            (RowState::Confirmed, Ok(())) => {
                row.record.set_status(ticket.target);
                ToggleOutcome::Kept
            }
            _ => ToggleOutcome::Detached,
        }
    }

    /// Mark `id` as awaiting deletion. Returns `false` when the row is
    /// unknown or already in flight.
    pub fn begin_delete(&mut self, id: &RowId) -> bool {
        match self.get_mut(id) {
            Some(row) if !row.state.is_in_flight() => {
                row.state = RowState::Removing;
                true
            }
            _ => false,
        }
    }

    /// Apply the backend's answer to a delete. Returns whether the row left
    /// local state.
    pub fn settle_delete(&mut self, id: &RowId, result: &Result<(), ApiError>) -> bool {
        match result {
            Ok(()) => self.remove(id).is_some(),
            Err(_) => {
                if let Some(row) = self.get_mut(id) {
                    if row.state == RowState::Removing {
                        row.state = RowState::Confirmed;
                    }
                }
                false
            }
        }
    }
}
