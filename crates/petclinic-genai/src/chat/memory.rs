//! Bounded per-conversation message history.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::Message;

/// Conversation id used when the caller does not name one.
pub const DEFAULT_CONVERSATION_ID: &str = "default";

/// Recent messages for each conversation id.
///
/// Each conversation keeps at most `window` messages; the oldest are dropped
/// first. The lock is only held to copy out or append, never across awaits.
#[derive(Debug)]
pub struct ConversationMemory {
    window: usize,
    conversations: Mutex<HashMap<String, VecDeque<Message>>>,
}

impl ConversationMemory {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            conversations: Mutex::new(HashMap::new()),
        }
    }

    /// The remembered messages of a conversation, oldest first.
    pub fn recent(&self, conversation_id: &str) -> Vec<Message> {
        self.lock()
            .get(conversation_id)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Append a completed turn, evicting the oldest messages past the window.
    pub fn append(&self, conversation_id: &str, messages: impl IntoIterator<Item = Message>) {
        let mut conversations = self.lock();
        let history = conversations.entry(conversation_id.to_string()).or_default();
        history.extend(messages);
        while history.len() > self.window {
            history.pop_front();
        }
    }

    /// Number of conversations seen so far.
    pub fn conversation_count(&self) -> usize {
        self.lock().len()
    }

    /// Forget one conversation.
    pub fn clear(&self, conversation_id: &str) {
        self.lock().remove(conversation_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<Message>>> {
        self.conversations.lock().unwrap_or_else(|e| e.into_inner())
    }
}
