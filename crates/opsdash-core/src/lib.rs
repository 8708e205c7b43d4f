//! Elm-style runtime underneath every opsdash screen.
//!
//! A screen is a [`Model`] (or an embeddable [`Component`]) whose `update`
//! is synchronous and whose side effects are returned as [`Command`]s:
//! requests via [`Command::perform`], debounce and dismissal timers via
//! [`Command::tick`], follow-ups via [`Command::message`]. Long-lived
//! sources such as the terminal and repeating timers are [`Subscription`]s,
//! diffed after every update.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Model`] | Top-level screen (init / update / view) |
//! | [`Component`] | Embeddable sub-model rendering into a [`ratatui::layout::Rect`] |
//! | [`Command`] | Side effect executed by the runtime |
//! | [`Subscription`] | Long-lived event source |
//! | [`Program`] | Drives a [`Model`] against a real terminal |
//! | [`TestProgram`](testing::TestProgram) | Headless harness with a virtual clock and parked tasks |
//!
//! Because every message is processed on one task, in arrival order, state
//! shared by a screen (row lists, in-flight sets, request generations) needs
//! no locks. Ordering guarantees come from the models themselves.

pub mod command;
pub mod component;
pub mod event;
pub mod model;
pub mod runtime;
pub mod subscription;
pub mod subscriptions;
pub mod testing;

pub use command::{Command, TerminalCommand};
pub use component::Component;
pub use event::TerminalEvent;
pub use model::Model;
pub use runtime::{Program, ProgramError, ProgramOptions};
pub use subscription::{subscribe, Subscription, SubscriptionId, SubscriptionSource};
pub use subscriptions::{terminal_events, Every};

/// Run a model with default options.
pub async fn run<M: Model>(flags: M::Flags) -> Result<M, ProgramError> {
    Program::<M>::new(flags)?.run().await
}

/// Run with custom options.
pub async fn run_with<M: Model>(
    flags: M::Flags,
    options: ProgramOptions,
) -> Result<M, ProgramError> {
    Program::<M>::with_options(flags, options)?.run().await
}
