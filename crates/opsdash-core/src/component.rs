use crate::command::Command;
use crate::subscription::Subscription;
use ratatui::{layout::Rect, Frame};

/// A reusable sub-model that renders into a given [`Rect`] area.
///
/// `Component` mirrors [`Model`](crate::Model) without `init`: components are
/// constructed by their parent, which wraps the component's message type in
/// one of its own variants and lifts returned commands with
/// [`Command::map`]:
///
/// ```rust,ignore
/// fn update(&mut self, msg: AppMsg) -> Command<AppMsg> {
///     match msg {
///         AppMsg::Users(m) => self.users.update(m).map(AppMsg::Users),
///         AppMsg::Calendar(m) => self.calendar.update(m).map(AppMsg::Calendar),
///     }
/// }
/// ```
pub trait Component: Send + 'static {
    /// The component's internal message type.
    type Message: Send + 'static;

    /// Process a message, mutate state, and return a [`Command`] for side effects.
    fn update(&mut self, msg: Self::Message) -> Command<Self::Message>;

    /// Render into a specific `area` of the [`Frame`].
    fn view(&self, frame: &mut Frame, area: Rect);

    /// Declare active subscriptions for this component.
    ///
    /// The parent collects these and includes them, mapped, in its own
    /// [`Model::subscriptions`](crate::Model::subscriptions).
    fn subscriptions(&self) -> Vec<Subscription<Self::Message>> {
        vec![]
    }
}
