//! Debounced, race-safe fetching.
//!
//! Two small counters carry all the ordering guarantees:
//!
//! * [`Debouncer`] hands out a token per edit and schedules a one-shot timer
//!   carrying it. Only the timer holding the latest token acts, so a burst of
//!   edits inside the window produces a single settle.
//! * [`RequestGeneration`] is bumped for every issued fetch. A response is
//!   applied only if it carries the current generation; anything older
//!   finished on the wire after being superseded and is dropped.

use crate::error::ApiError;
use crate::source::{ListPage, ListRequest};
use opsdash_core::Command;
use std::time::Duration;

/// Generation captured by one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

/// Monotonic request counter. Last issued wins.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    current: u64,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request and return the generation it must carry back.
    pub fn issue(&mut self) -> Generation {
        self.current += 1;
        Generation(self.current)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.current
    }

    /// Make every outstanding generation stale without issuing a new one.
    pub fn invalidate(&mut self) {
        self.current += 1;
    }
}

/// Token identifying one scheduled settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebounceToken(u64);

/// Trailing-edge debounce driven by [`Command::tick`].
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    latest: u64,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer { window, latest: 0 }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Restart the window. Any earlier token stops being current.
    pub fn schedule<Msg: Send + 'static>(
        &mut self,
        to_msg: impl FnOnce(DebounceToken) -> Msg + Send + 'static,
    ) -> Command<Msg> {
        self.latest += 1;
        let token = DebounceToken(self.latest);
        Command::tick(self.window, move |_| to_msg(token))
    }

    /// Whether a fired timer is the last one scheduled.
    pub fn is_current(&self, token: DebounceToken) -> bool {
        token.0 == self.latest
    }

    /// Make the pending timer, if any, a no-op when it fires.
    pub fn cancel(&mut self) {
        self.latest += 1;
    }
}

/// What the screen shows about the query besides the rows themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStatus {
    pub loading: bool,
    pub error: Option<String>,
    pub total_records: u64,
    pub total_pages: u32,
}

/// Issues fetches and decides which responses may update visible state.
#[derive(Debug)]
pub struct QueryCoordinator {
    generation: RequestGeneration,
    last_issued: Option<ListRequest>,
    loading: bool,
    error: Option<String>,
    total_records: u64,
    total_pages: u32,
}

impl Default for QueryCoordinator {
    fn default() -> Self {
        QueryCoordinator {
            generation: RequestGeneration::new(),
            last_issued: None,
            loading: false,
            error: None,
            total_records: 0,
            total_pages: 1,
        }
    }
}

impl QueryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `request` differs from the most recently issued one.
    pub fn needs_fetch(&self, request: &ListRequest) -> bool {
        self.last_issued.as_ref() != Some(request)
    }

    /// Record a new fetch for `request`; its response must carry the
    /// returned generation.
    pub fn issue(&mut self, request: ListRequest) -> Generation {
        let generation = self.generation.issue();
        tracing::debug!(
            generation = generation.0,
            page = request.page,
            page_size = request.page_size,
            filters = request.filters.len(),
            "issuing list fetch"
        );
        self.last_issued = Some(request);
        self.loading = true;
        generation
    }

    /// Apply a response.
    ///
    /// Returns `None` for a stale response, which must then have no effect at
    /// all. Otherwise loading ends and the totals or the error are updated;
    /// the caller merges rows or clears them.
    pub fn accept<R>(
        &mut self,
        generation: Generation,
        result: Result<ListPage<R>, ApiError>,
        fallback: &str,
    ) -> Option<Result<ListPage<R>, ApiError>> {
        if !self.generation.is_current(generation) {
            tracing::trace!(generation = generation.0, "discarding superseded response");
            return None;
        }

        self.loading = false;
        match &result {
            Ok(page) => {
                tracing::debug!(
                    generation = generation.0,
                    rows = page.rows.len(),
                    total_records = page.total_records,
                    "list fetch accepted"
                );
                self.error = None;
                self.total_records = page.total_records;
                self.total_pages = page.total_pages.max(1);
            }
            Err(err) => {
                tracing::warn!(generation = generation.0, error = %err, "list fetch failed");
                self.error = Some(err.user_message(fallback));
                self.total_records = 0;
                self.total_pages = 1;
            }
        }
        Some(result)
    }

    /// Drop interest in every outstanding response.
    pub fn invalidate(&mut self) {
        self.generation.invalidate();
        self.loading = false;
    }

    pub fn last_issued(&self) -> Option<&ListRequest> {
        self.last_issued.as_ref()
    }

    pub fn status(&self) -> QueryStatus {
        QueryStatus {
            loading: self.loading,
            error: self.error.clone(),
            total_records: self.total_records,
            total_pages: self.total_pages,
        }
    }
}
