//! Bounded message history

use std::collections::VecDeque;

use crate::agent::AgentId;
use crate::message::{Message, MessageId, MessageType};

/// Default number of messages retained
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// FIFO of the most recent messages; the oldest is evicted on overflow.
#[derive(Debug, Clone)]
pub struct MessageLog {
    capacity: usize,
    messages: VecDeque<Message>,
}

impl MessageLog {
    /// A log holding at most `capacity` messages, never fewer than one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            messages: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a message, returning the evicted one if the log was full
    pub fn append(&mut self, message: Message) -> Option<Message> {
        let mut evicted = None;
        while self.messages.len() >= self.capacity {
            evicted = self.messages.pop_front();
        }
        self.messages.push_back(message);
        evicted
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    /// Messages the agent sent or received, oldest first
    pub fn by_participant(&self, agent: &AgentId) -> Vec<&Message> {
        self.messages.iter().filter(|m| m.involves(agent)).collect()
    }

    pub fn by_type(&self, message_type: MessageType) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|m| m.message_type() == message_type)
            .collect()
    }

    /// The last `n` messages, oldest first
    pub fn recent(&self, n: usize) -> Vec<&Message> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).collect()
    }

    pub fn all(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
