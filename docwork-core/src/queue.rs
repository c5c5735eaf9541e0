//! FIFO buffer of deferred commands shared by every entity set of a unit of work.

use mea::mutex::Mutex;
use std::{collections::VecDeque, sync::Arc};

use crate::command::Command;

/// The queue as shared between a unit of work and its entity sets.
pub type SharedQueue = Arc<Mutex<CommandQueue>>;

/// Ordered buffer of pending commands. Insertion order is execution order; each
/// command leaves the queue exactly once, from the head.
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: VecDeque<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedQueue {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Appends a command to the tail.
    pub fn enqueue(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    pub fn has_next(&self) -> bool {
        !self.commands.is_empty()
    }

    /// Returns the head without removing it.
    pub fn peek(&self) -> Option<&Command> {
        self.commands.front()
    }

    /// Removes and returns the head, or `None` when empty.
    pub fn take_next(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }

    /// Removes up to `count` commands from the head, returning them in order.
    pub fn take_front(&mut self, count: usize) -> Vec<Command> {
        let count = count.min(self.commands.len());
        self.commands.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Clones the pending commands in execution order.
    pub fn snapshot(&self) -> Vec<Command> {
        self.commands.iter().cloned().collect()
    }

    /// Removes every pending command, returning them in execution order.
    pub fn clear(&mut self) -> Vec<Command> {
        self.commands.drain(..).collect()
    }
}
