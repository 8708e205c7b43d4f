//! Drives a [`Model`] against the real terminal.

use crate::command::{Action, Command, CommandInner, TerminalCommand};
use crate::model::Model;
use crate::subscription::SubscriptionManager;
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, stdout, Stdout};
use std::sync::Once;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Errors from terminal setup, drawing or teardown.
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Knobs for a [`Program`].
///
/// ```rust,ignore
/// let opts = ProgramOptions {
///     title: Some("opsdash: users".into()),
///     ..ProgramOptions::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ProgramOptions {
    /// Redraw rate cap (default: 30, clamped to 1..=120).
    pub fps: u32,
    /// Draw on the alternate screen (default: true).
    pub alt_screen: bool,
    /// Initial window title.
    pub title: Option<String>,
    /// Stop on a Ctrl-C signal as well as on the key (default: true).
    pub handle_signals: bool,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        ProgramOptions {
            fps: 30,
            alt_screen: true,
            title: None,
            handle_signals: true,
        }
    }
}

/// Puts the terminal into raw mode and undoes it on drop.
struct TerminalGuard {
    alt_screen: bool,
}

impl TerminalGuard {
    fn enter(options: &ProgramOptions) -> io::Result<Self> {
        install_panic_hook(options.alt_screen);
        enable_raw_mode()?;
        let guard = TerminalGuard {
            alt_screen: options.alt_screen,
        };
        let mut out = stdout();
        if options.alt_screen {
            execute!(out, EnterAlternateScreen)?;
        }
        if let Some(title) = &options.title {
            execute!(out, SetTitle(title))?;
        }
        execute!(out, Hide)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(err) = leave_terminal(self.alt_screen) {
            tracing::warn!("terminal restore failed: {err}");
        }
    }
}

fn leave_terminal(alt_screen: bool) -> io::Result<()> {
    // Run every step even when an earlier one fails.
    let raw = disable_raw_mode();
    let mut out = stdout();
    execute!(out, Show).ok();
    if alt_screen {
        execute!(out, LeaveAlternateScreen).ok();
    }
    raw
}

fn install_panic_hook(alt_screen: bool) {
    static INSTALLED: Once = Once::new();
    INSTALLED.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = leave_terminal(alt_screen);
            previous(info);
        }));
    });
}

/// Owns the model and runs its update loop.
///
/// Completed requests and fired timers come back through one channel and
/// are applied on this task, so `update` never runs concurrently with
/// itself.
pub struct Program<M: Model> {
    model: M,
    terminal: Terminal<CrosstermBackend<Stdout>>,
    _guard: TerminalGuard,
    tx: mpsc::UnboundedSender<M::Message>,
    rx: mpsc::UnboundedReceiver<M::Message>,
    subscriptions: SubscriptionManager<M::Message>,
    options: ProgramOptions,
    dirty: bool,
    quit: bool,
}

impl<M: Model> Program<M> {
    pub fn new(flags: M::Flags) -> Result<Self, ProgramError> {
        Self::with_options(flags, ProgramOptions::default())
    }

    pub fn with_options(flags: M::Flags, options: ProgramOptions) -> Result<Self, ProgramError> {
        let guard = TerminalGuard::enter(&options)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (model, init) = M::init(flags);

        let mut program = Program {
            model,
            terminal,
            _guard: guard,
            subscriptions: SubscriptionManager::new(tx.clone()),
            tx,
            rx,
            options,
            dirty: true,
            quit: false,
        };
        program.apply(init);
        program.resubscribe();
        tracing::debug!("program started");
        Ok(program)
    }

    /// Run until the model asks to quit, then restore the terminal and hand
    /// the model back.
    pub async fn run(mut self) -> Result<M, ProgramError> {
        let result = self.run_loop().await;
        self.subscriptions.shutdown();
        tracing::debug!("program stopped");
        result?;
        Ok(self.model)
    }

    async fn run_loop(&mut self) -> Result<(), ProgramError> {
        self.draw()?;

        let fps = self.options.fps.clamp(1, 120);
        let mut frames = tokio::time::interval(Duration::from_secs(1) / fps);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let signals = self.options.handle_signals;

        while !self.quit {
            tokio::select! {
                biased;

                _ = tokio::signal::ctrl_c(), if signals => {
                    tracing::debug!("interrupted");
                    return Ok(());
                }

                Some(msg) = self.rx.recv() => {
                    self.step(msg);
                    // Apply whatever else is already queued before drawing.
                    while !self.quit {
                        match self.rx.try_recv() {
                            Ok(msg) => self.step(msg),
                            Err(_) => break,
                        }
                    }
                }

                _ = frames.tick() => {
                    if self.dirty {
                        self.draw()?;
                    }
                }
            }
        }
        Ok(())
    }

    fn step(&mut self, msg: M::Message) {
        let cmd = self.model.update(msg);
        self.apply(cmd);
        self.resubscribe();
        self.dirty = true;
    }

    fn resubscribe(&mut self) {
        let subs = self.model.subscriptions();
        self.subscriptions.reconcile(subs);
    }

    fn apply(&mut self, cmd: Command<M::Message>) {
        match cmd.inner {
            CommandInner::None => {}
            CommandInner::Action(Action::Message(msg)) => {
                let _ = self.tx.send(msg);
            }
            CommandInner::Action(Action::Quit) => self.quit = true,
            CommandInner::Future(fut) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(fut.await);
                });
            }
            CommandInner::Timer { after, fire } => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(fire(Instant::now()));
                });
            }
            CommandInner::Batch(cmds) => cmds.into_iter().for_each(|cmd| self.apply(cmd)),
            CommandInner::Terminal(TerminalCommand::SetTitle(title)) => {
                if let Err(err) = execute!(stdout(), SetTitle(title)) {
                    tracing::warn!("setting title failed: {err}");
                }
            }
            CommandInner::Terminal(TerminalCommand::ClearScreen) => {
                if let Err(err) = self.terminal.clear() {
                    tracing::warn!("clearing screen failed: {err}");
                }
                self.dirty = true;
            }
        }
    }

    fn draw(&mut self) -> Result<(), ProgramError> {
        let model = &self.model;
        self.terminal.draw(|frame| model.view(frame))?;
        self.dirty = false;
        Ok(())
    }
}
