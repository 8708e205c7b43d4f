//! Resend cooldown for one-time passcodes.
//!
//! After a code is sent the resend action stays disabled for a number of
//! seconds. The countdown is driven by a one-second [`Every`] subscription
//! that exists only while counting, so dropping the component or leaving the
//! counting state cancels the timer.

use opsdash_core::{subscribe, Command, Component, Every, Subscription};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Idle,
    Counting(u32),
    Expired,
}

#[derive(Debug, Clone)]
pub enum Message {
    /// Start counting down from the given number of seconds.
    Start(u32),
    Tick,
    Reset,
}

pub struct Countdown {
    state: CountdownState,
    id: &'static str,
}

impl Countdown {
    pub fn new(id: &'static str) -> Self {
        Countdown {
            state: CountdownState::Idle,
            id,
        }
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    /// Whether resending is allowed right now.
    pub fn can_resend(&self) -> bool {
        !matches!(self.state, CountdownState::Counting(_))
    }
}

impl Component for Countdown {
    type Message = Message;

    fn update(&mut self, msg: Message) -> Command<Message> {
        self.state = match (self.state, msg) {
            (_, Message::Start(0)) => CountdownState::Expired,
            (_, Message::Start(seconds)) => CountdownState::Counting(seconds),
            (CountdownState::Counting(remaining), Message::Tick) if remaining > 1 => {
                CountdownState::Counting(remaining - 1)
            }
            (CountdownState::Counting(_), Message::Tick) => CountdownState::Expired,
            // A tick already queued when counting stopped.
            (state, Message::Tick) => state,
            (_, Message::Reset) => CountdownState::Idle,
        };
        Command::none()
    }

    fn view(&self, frame: &mut Frame, area: Rect) {
        let (text, color) = match self.state {
            CountdownState::Idle => ("Send code".to_string(), Color::Cyan),
            CountdownState::Counting(remaining) => {
                (format!("Resend in {remaining}s"), Color::DarkGray)
            }
            CountdownState::Expired => ("Resend code".to_string(), Color::Cyan),
        };
        frame.render_widget(Paragraph::new(text).style(Style::default().fg(color)), area);
    }

    fn subscriptions(&self) -> Vec<Subscription<Message>> {
        match self.state {
            CountdownState::Counting(_) => {
                vec![subscribe(Every::new(Duration::from_secs(1), self.id)).map(|_| Message::Tick)]
            }
            _ => vec![],
        }
    }
}
