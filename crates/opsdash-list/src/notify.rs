//! Transient user notifications raised at the controller boundary.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: Level,
    pub text: String,
}

/// Bounded queue of live notifications, newest last.
#[derive(Debug, Clone)]
pub struct Notifications {
    items: VecDeque<Notification>,
    next_id: u64,
    capacity: usize,
}

impl Default for Notifications {
    fn default() -> Self {
        Notifications::with_capacity(5)
    }
}

impl Notifications {
    pub fn with_capacity(capacity: usize) -> Self {
        Notifications {
            items: VecDeque::new(),
            next_id: 0,
            capacity: capacity.max(1),
        }
    }

    /// Queue a notification and return its id. The oldest one is evicted
    /// when the queue is full.
    pub fn push(&mut self, level: Level, text: impl Into<String>) -> u64 {
        self.next_id += 1;
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(Notification {
            id: self.next_id,
            level,
            text: text.into(),
        });
        self.next_id
    }

    pub fn success(&mut self, text: impl Into<String>) -> u64 {
        self.push(Level::Success, text)
    }

    pub fn error(&mut self, text: impl Into<String>) -> u64 {
        self.push(Level::Error, text)
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.items.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
