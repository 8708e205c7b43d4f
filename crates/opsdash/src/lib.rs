//! **opsdash** -- a terminal operations dashboard over a REST backend.
//!
//! The binary mounts one screen at a time:
//!
//! * list screens for orders, users, facilities, tubes and insurance
//!   records, each a [`list::ListController`] backed by [`api::Resource`];
//! * a calendar screen aggregating daily order summaries over a day, week
//!   or month, backed by [`api::Summaries`].
//!
//! # Re-exports
//!
//! * All public items from [`opsdash_core`] are available at the crate root
//!   ([`Model`], [`Component`], [`Command`], [`Program`], [`run_with`], etc.).
//! * The [`list`] module re-exports everything from [`opsdash_list`].
//! * [`ratatui`], [`crossterm`] and [`tokio`] are re-exported.

pub use opsdash_core::*;

/// Server-backed list screens.
pub mod list {
    pub use opsdash_list::*;
}

pub mod api;
pub mod app;
pub mod entities;

pub use api::{ApiClient, ClientError};
pub use app::{Dashboard, DashboardFlags, Screen};

pub use crossterm;
pub use ratatui;
pub use tokio;
