use crate::command::{Action, Command, CommandInner};
use crate::model::Model;
use futures::future::BoxFuture;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

struct PendingTimer<Msg> {
    deadline: Duration,
    seq: u64,
    fire: Box<dyn FnOnce(Instant) -> Msg + Send>,
}

/// A headless harness that drives a [`Model`] without a terminal.
///
/// Besides plain message delivery, the harness keeps every side effect the
/// model asks for so a test decides when it happens:
///
/// * [`Command::tick`] timers run on a virtual clock moved by
///   [`advance`](TestProgram::advance); nothing ever sleeps.
/// * [`Command::perform`] futures are parked as pending tasks and only run
///   when the test calls [`resolve`](TestProgram::resolve), in whatever order
///   it likes. That is how out-of-order network arrival is reproduced.
///
/// # Example
///
/// ```rust,ignore
/// let mut prog = TestProgram::<UsersScreen>::new(flags);
/// prog.send(Msg::SetFilter("name".into(), "ann".into()));
/// prog.advance(Duration::from_millis(300)); // debounce elapses, fetch issued
/// assert_eq!(prog.pending_tasks(), 1);
/// prog.resolve(0).await;                    // fetch completes
/// ```
pub struct TestProgram<M: Model> {
    model: M,
    pending_messages: VecDeque<M::Message>,
    tasks: Vec<BoxFuture<'static, M::Message>>,
    timers: Vec<PendingTimer<M::Message>>,
    now: Duration,
    timer_seq: u64,
    quit: bool,
}

impl<M: Model> TestProgram<M> {
    /// Create a test program by calling [`Model::init`] with the given flags.
    pub fn new(flags: M::Flags) -> Self {
        let (model, init_cmd) = M::init(flags);
        let mut program = Self {
            model,
            pending_messages: VecDeque::new(),
            tasks: Vec::new(),
            timers: Vec::new(),
            now: Duration::ZERO,
            timer_seq: 0,
            quit: false,
        };
        program.collect(init_cmd);
        program
    }

    /// Send a message, triggering a single update cycle.
    ///
    /// Follow-up [`Command::message`]s are queued; call
    /// [`drain_messages`](TestProgram::drain_messages) to flush them.
    pub fn send(&mut self, msg: M::Message) {
        let cmd = self.model.update(msg);
        self.collect(cmd);
    }

    /// Process queued messages until no new ones are generated.
    pub fn drain_messages(&mut self) {
        while let Some(msg) = self.pending_messages.pop_front() {
            let cmd = self.model.update(msg);
            self.collect(cmd);
        }
    }

    /// Move the virtual clock forward, firing every timer that comes due in
    /// deadline order. Timers scheduled while advancing fire too if their
    /// deadline falls inside the window.
    pub fn advance(&mut self, by: Duration) {
        let target = self.now + by;
        loop {
            let due = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.deadline <= target)
                .min_by_key(|(_, t)| (t.deadline, t.seq))
                .map(|(idx, _)| idx);
            let Some(idx) = due else { break };

            let timer = self.timers.remove(idx);
            self.now = self.now.max(timer.deadline);
            self.send((timer.fire)(Instant::now()));
            self.drain_messages();
        }
        self.now = target;
    }

    /// Number of parked async tasks.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Number of timers that have not fired yet.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Run the parked task at `index` (in issue order) to completion and
    /// deliver its message. Panics if there is no such task.
    pub async fn resolve(&mut self, index: usize) {
        let task = self.tasks.remove(index);
        let msg = task.await;
        self.send(msg);
        self.drain_messages();
    }

    /// Resolve tasks oldest-first until none are left, including tasks
    /// spawned while resolving.
    pub async fn resolve_all(&mut self) {
        while !self.tasks.is_empty() {
            self.resolve(0).await;
        }
    }

    /// Drop every parked task without running it.
    pub fn discard_tasks(&mut self) {
        self.tasks.clear();
    }

    /// Whether the model has asked to quit.
    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Get a shared reference to the model for assertions.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Get a mutable reference to the model for direct test setup.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Render the model to a ratatui [`Buffer`] of the given dimensions.
    pub fn render(&self, width: u16, height: u16) -> Buffer {
        let backend = ratatui::backend::TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).expect("test backend never fails");
        terminal
            .draw(|frame| self.model.view(frame))
            .expect("test backend never fails");
        terminal.backend().buffer().clone()
    }

    /// Render the model and return the visible content as a plain string,
    /// one line per buffer row.
    pub fn render_string(&self, width: u16, height: u16) -> String {
        let buf = self.render(width, height);
        let area = Rect::new(0, 0, width, height);
        let mut output = String::new();
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                output.push_str(buf[(x, y)].symbol());
            }
            if y < area.bottom() - 1 {
                output.push('\n');
            }
        }
        output
    }

    fn collect(&mut self, cmd: Command<M::Message>) {
        match cmd.inner {
            CommandInner::None => {}
            CommandInner::Action(Action::Message(msg)) => {
                self.pending_messages.push_back(msg);
            }
            CommandInner::Action(Action::Quit) => self.quit = true,
            CommandInner::Future(fut) => self.tasks.push(fut),
            CommandInner::Timer { after, fire } => {
                self.timer_seq += 1;
                self.timers.push(PendingTimer {
                    deadline: self.now + after,
                    seq: self.timer_seq,
                    fire,
                });
            }
            CommandInner::Batch(cmds) => {
                for cmd in cmds {
                    self.collect(cmd);
                }
            }
            CommandInner::Terminal(_) => {}
        }
    }
}
