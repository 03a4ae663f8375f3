//! Chat messages exchanged with the storefront sales assistant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub role: ChatRole,
    pub content: String,
    /// Display segmentation of assistant replies.
    #[serde(default)]
    pub bubbles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole { User, Assistant }

/// Oldest messages are dropped past this many.
pub const MAX_THREAD_MESSAGES: usize = 200;

/// All messages of one storefront chat session, oldest first.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatThread {
    session_id: String,
    messages: Vec<ChatMessage>,
    updated_at: DateTime<Utc>,
}

impl ChatThread {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), messages: vec![], updated_at: Utc::now() }
    }

    pub fn session_id(&self) -> &str { &self.session_id }
    pub fn messages(&self) -> &[ChatMessage] { &self.messages }
    pub fn into_messages(self) -> Vec<ChatMessage> { self.messages }

    /// The last `limit` messages.
    pub fn recent(&self, limit: usize) -> &[ChatMessage] {
        &self.messages[self.messages.len().saturating_sub(limit)..]
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        if self.messages.len() > MAX_THREAD_MESSAGES {
            let excess = self.messages.len() - MAX_THREAD_MESSAGES;
            self.messages.drain(..excess);
        }
        self.updated_at = Utc::now();
    }
}

impl ChatMessage {
    pub fn user(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(session_id.into(), ChatRole::User, content.into(), vec![])
    }

    pub fn assistant(session_id: impl Into<String>, content: impl Into<String>, bubbles: Vec<String>) -> Self {
        Self::new(session_id.into(), ChatRole::Assistant, content.into(), bubbles)
    }

    fn new(session_id: String, role: ChatRole, content: String, bubbles: Vec<String>) -> Self {
        // v7 ids sort by creation time, which keeps history ordering stable.
        Self { id: Uuid::now_v7().to_string(), session_id, role, content, bubbles, created_at: Utc::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_keeps_the_latest_messages() {
        let mut thread = ChatThread::new("s1");
        for n in 0..MAX_THREAD_MESSAGES + 5 {
            thread.push(ChatMessage::user("s1", n.to_string()));
        }
        assert_eq!(thread.messages().len(), MAX_THREAD_MESSAGES);
        assert_eq!(thread.messages()[0].content, "5");
        let recent = thread.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].content, (MAX_THREAD_MESSAGES + 4).to_string());
        assert_eq!(ChatThread::new("s2").recent(20).len(), 0);
    }
}
