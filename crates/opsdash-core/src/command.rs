use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A side effect returned from [`Model::update`](crate::Model::update) or
/// [`Component::update`](crate::Component::update).
///
/// Commands describe work the runtime performs on the model's behalf:
/// async requests whose result comes back as a message, one-shot timers,
/// immediate follow-up messages, and program lifecycle actions. Models stay
/// synchronous and deterministic; every suspension point lives inside a
/// command.
///
/// # Examples
///
/// ```rust,ignore
/// // Do nothing:
/// let cmd = Command::none();
///
/// // Run a request and map the result to a message:
/// let cmd = Command::perform(
///     async move { source.fetch(request).await },
///     move |result| Msg::Fetched { generation, result },
/// );
///
/// // Fire once after the debounce window:
/// let cmd = Command::tick(Duration::from_millis(300), move |_| Msg::Settled(token));
/// ```
pub struct Command<Msg: Send + 'static> {
    pub(crate) inner: CommandInner<Msg>,
}

type TimerFn<Msg> = Box<dyn FnOnce(Instant) -> Msg + Send>;

pub(crate) enum CommandInner<Msg: Send + 'static> {
    None,
    Action(Action<Msg>),
    Future(BoxFuture<'static, Msg>),
    /// One-shot timer. Kept distinct from `Future` so headless harnesses can
    /// fire timers on a virtual clock instead of sleeping.
    Timer {
        after: Duration,
        fire: TimerFn<Msg>,
    },
    Batch(Vec<Command<Msg>>),
    Terminal(TerminalCommand),
}

/// Actions handled synchronously by the runtime, without spawning tasks.
pub enum Action<Msg> {
    /// Deliver a message on the next loop iteration.
    Message(Msg),
    /// Quit the program.
    Quit,
}

/// Terminal management commands executed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    /// Set the terminal window title.
    SetTitle(String),
    /// Clear the entire terminal screen.
    ClearScreen,
}

impl<Msg: Send + 'static> Command<Msg> {
    /// No-op command.
    pub fn none() -> Self {
        Command {
            inner: CommandInner::None,
        }
    }

    /// Run an async future, map the result to a message.
    pub fn perform<F, T>(future: F, map: impl FnOnce(T) -> Msg + Send + 'static) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Command {
            inner: CommandInner::Future(Box::pin(async move { map(future.await) })),
        }
    }

    /// Send a message immediately.
    pub fn message(msg: Msg) -> Self {
        Command {
            inner: CommandInner::Action(Action::Message(msg)),
        }
    }

    /// Quit the program.
    pub fn quit() -> Self {
        Command {
            inner: CommandInner::Action(Action::Quit),
        }
    }

    /// One-shot timer: fires once after `duration`, mapping the instant to a message.
    ///
    /// There is no cancellation; debouncing models tag each timer with a token
    /// and ignore firings whose token is no longer current.
    pub fn tick(duration: Duration, map: impl FnOnce(Instant) -> Msg + Send + 'static) -> Self {
        Command {
            inner: CommandInner::Timer {
                after: duration,
                fire: Box::new(map),
            },
        }
    }

    /// Run multiple commands concurrently.
    pub fn batch(cmds: impl IntoIterator<Item = Command<Msg>>) -> Self {
        let mut cmds: Vec<_> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Command::none(),
            1 => cmds.pop().unwrap_or_else(Command::none),
            _ => Command {
                inner: CommandInner::Batch(cmds),
            },
        }
    }

    /// Terminal management command.
    pub fn terminal(cmd: TerminalCommand) -> Self {
        Command {
            inner: CommandInner::Terminal(cmd),
        }
    }

    /// Set the terminal window title.
    pub fn set_title(title: impl Into<String>) -> Self {
        Command::terminal(TerminalCommand::SetTitle(title.into()))
    }

    /// Clear the entire terminal screen.
    pub fn clear_screen() -> Self {
        Command::terminal(TerminalCommand::ClearScreen)
    }

    /// Transform the message type (for component composition).
    pub fn map<NewMsg: Send + 'static>(
        self,
        f: impl Fn(Msg) -> NewMsg + Send + Sync + 'static,
    ) -> Command<NewMsg> {
        self.map_with(Arc::new(f))
    }

    fn map_with<NewMsg: Send + 'static>(
        self,
        f: Arc<dyn Fn(Msg) -> NewMsg + Send + Sync>,
    ) -> Command<NewMsg> {
        match self.inner {
            CommandInner::None => Command::none(),
            CommandInner::Action(Action::Message(msg)) => Command::message(f(msg)),
            CommandInner::Action(Action::Quit) => Command::quit(),
            CommandInner::Future(fut) => Command {
                inner: CommandInner::Future(Box::pin(async move { f(fut.await) })),
            },
            CommandInner::Timer { after, fire } => Command {
                inner: CommandInner::Timer {
                    after,
                    fire: Box::new(move |at| f(fire(at))),
                },
            },
            CommandInner::Batch(cmds) => Command {
                inner: CommandInner::Batch(
                    cmds.into_iter()
                        .map(|cmd| cmd.map_with(f.clone()))
                        .collect(),
                ),
            },
            CommandInner::Terminal(tcmd) => Command::terminal(tcmd),
        }
    }

    // --- Inspection methods (useful for testing) ---

    /// Returns `true` if this is a no-op command.
    pub fn is_none(&self) -> bool {
        matches!(self.inner, CommandInner::None)
    }

    /// Returns `true` if this command (or any command in a batch) quits.
    pub fn is_quit(&self) -> bool {
        match &self.inner {
            CommandInner::Action(Action::Quit) => true,
            CommandInner::Batch(cmds) => cmds.iter().any(Command::is_quit),
            _ => false,
        }
    }

    /// If this command is an immediate message action, return it.
    pub fn into_message(self) -> Option<Msg> {
        match self.inner {
            CommandInner::Action(Action::Message(msg)) => Some(msg),
            _ => None,
        }
    }

    /// If this command is a batch, return the inner commands.
    pub fn into_batch(self) -> Option<Vec<Command<Msg>>> {
        match self.inner {
            CommandInner::Batch(cmds) => Some(cmds),
            _ => None,
        }
    }
}
