use serde::{Deserialize, Serialize};

use super::message::Message;
use super::role::Role;

/// The ordered history of one conversation
///
/// Messages are only ever appended, except that conversation memory may drop messages from
/// the head when the history no longer fits in the model's context window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    messages: Vec<Message>,
}

impl Thread {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Index of the most recent user message, if any
    pub fn last_user_index(&self) -> Option<usize> {
        self.messages.iter().rposition(|m| m.role() == Role::User)
    }

    /// Remove the first `count` messages and return them
    pub(crate) fn drain_front(&mut self, count: usize) -> Vec<Message> {
        let count = count.min(self.messages.len());
        self.messages.drain(..count).collect()
    }

    /// Replace the messages before `index` with `replacement`
    pub(crate) fn splice_front(&mut self, index: usize, replacement: Vec<Message>) {
        let index = index.min(self.messages.len());
        self.messages.splice(..index, replacement);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl From<Vec<Message>> for Thread {
    fn from(messages: Vec<Message>) -> Self {
        Thread { messages }
    }
}
