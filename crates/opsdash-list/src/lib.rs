//! Server-backed list screens for opsdash.
//!
//! Every list screen (orders, users, facilities, tubes, insurance records)
//! is one [`ListController`] parametrized by a [`Record`] type and its
//! [`ListSource`] / [`RowMutations`] collaborators. The controller keeps
//! user-edited filters and pagination in sync with the address, fetches
//! under a debounce with last-issued-wins ordering, and applies status
//! toggles optimistically without letting background refetches clobber them.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`filter`] | Filter/pagination state and address encoding |
//! | [`query`] | Debouncer, request generation, fetch coordinator |
//! | [`reconcile`] | Per-row mutation tags and fetch merging |
//! | [`mutation`] | Optimistic toggle and confirmed delete |
//! | [`selection`] | Cross-page selection and export |
//! | [`calendar`] | Date-range summary hook and its fold |
//! | [`countdown`] | OTP resend cooldown |
//!
//! ```rust,ignore
//! let (users, cmd) = ListController::<User>::mount(ListSpec {
//!     title: "Users".into(),
//!     source: Arc::new(client.clone()),
//!     mutations: Some(Arc::new(client)),
//!     navigator: Box::new(history.clone()),
//!     options: ControllerOptions::default(),
//! });
//! ```

pub mod address;
pub mod calendar;
pub mod controller;
pub mod countdown;
pub mod error;
pub mod filter;
pub mod mutation;
pub mod notify;
pub mod options;
pub mod query;
pub mod reconcile;
pub mod record;
pub mod selection;
pub mod source;
mod view;

pub use address::{Location, MemoryHistory, Navigator};
pub use calendar::{aggregate, range_for, DailySummary, DateRange, RangeAggregation, RangeSource, ViewMode};
pub use controller::{ListController, ListSpec, Message};
pub use countdown::{Countdown, CountdownState};
pub use error::{ApiError, ValidationError};
pub use filter::{FieldKind, FieldSpec, FilterSet, FilterStore, Pagination};
pub use mutation::{ToggleOutcome, ToggleTicket};
pub use notify::{Level, Notification, Notifications};
pub use options::ControllerOptions;
pub use query::{Debouncer, Generation, QueryCoordinator, QueryStatus, RequestGeneration};
pub use reconcile::{Row, RowSet, RowState};
pub use record::{Record, RowId, RowStatus};
pub use selection::{ExportTable, Selection};
pub use source::{ListPage, ListRequest, ListResponse, ListSource, MutationAck, RowMutations};
