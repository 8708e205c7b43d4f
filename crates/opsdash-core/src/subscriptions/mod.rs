//! Built-in subscription sources.
//!
//! - **Terminal events** ([`terminal_events`]) -- keyboard, resize and paste
//!   events from the terminal.
//! - **Repeating timers** ([`Every`]) -- countdowns and periodic refresh.

mod terminal;
mod timer;

pub use terminal::*;
pub use timer::*;
