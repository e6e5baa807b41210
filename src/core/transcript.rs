//! Ordered, append-only conversation history for one session.

use crate::core::message::Message;

#[derive(Debug, Default, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Every message in order, hidden ones included. This is what the model
    /// sees; never render it directly.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Messages meant for display. Re-derived from the live history on
    /// every call.
    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages.iter().filter(|message| message.visible)
    }

    pub fn reset(&mut self) {
        self.messages.clear();
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
}
