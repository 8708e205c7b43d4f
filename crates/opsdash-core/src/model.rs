use crate::command::Command;
use crate::subscription::Subscription;
use ratatui::Frame;

/// A top-level screen driven by the [`Program`](crate::Program) loop.
///
/// The runtime drives a continuous **init -> update -> view** cycle:
///
/// 1. [`init`](Model::init) builds the initial state and may return a
///    [`Command`] for startup work (e.g. the first fetch).
/// 2. [`view`](Model::view) renders the current state to a [`ratatui::Frame`].
/// 3. Key presses, timers and completed requests arrive as messages.
/// 4. [`update`](Model::update) processes each message, mutates state, and
///    optionally returns a [`Command`] for further work.
/// 5. Steps 2--4 repeat until the program exits.
///
/// `update` never awaits. Anything that suspends (network calls, timers) is
/// described by a returned [`Command`] and comes back later as a message, so
/// all state changes happen in one place and in message order.
pub trait Model: Sized + Send + 'static {
    /// The screen's message type.
    type Message: Send + 'static;

    /// Initialization data passed to [`Model::init`].
    type Flags: Send + 'static;

    /// Create the initial model state and an optional startup command.
    fn init(flags: Self::Flags) -> (Self, Command<Self::Message>);

    /// Process a message, mutate state, and return a command for side effects.
    fn update(&mut self, msg: Self::Message) -> Command<Self::Message>;

    /// Render the current state. Must be a pure function of `&self`.
    fn view(&self, frame: &mut Frame);

    /// Declare active subscriptions.  Called after every update.
    ///
    /// The runtime diffs the returned list against the previously active set:
    /// new subscriptions are started and removed ones are cancelled.
    fn subscriptions(&self) -> Vec<Subscription<Self::Message>> {
        vec![]
    }
}
