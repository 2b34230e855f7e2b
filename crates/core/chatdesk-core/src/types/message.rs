//! Conversation messages and the rolling context window

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Assistant, agent, or system notice
    Bot,
    /// Site visitor
    User,
}

impl Origin {
    /// Role name used in backend payloads
    pub fn role(&self) -> &'static str {
        match self {
            Origin::Bot => "assistant",
            Origin::User => "user",
        }
    }
}

/// One rendered chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Message body (light markdown)
    pub text: String,
    /// Producer
    pub origin: Origin,
    /// When it was appended
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    /// Whether the message came from the bot side
    pub fn is_bot(&self) -> bool {
        self.origin == Origin::Bot
    }
}

/// Context window entry in the shape the backend expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// `assistant` or `user`
    pub role: String,
    /// Message text
    pub content: String,
}

/// Bounded FIFO mirror of the most recent messages
#[derive(Debug, Clone)]
pub struct ContextWindow {
    capacity: usize,
    entries: VecDeque<ContextEntry>,
}

impl ContextWindow {
    /// Empty window holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1) + 1),
        }
    }

    /// Append, evicting the oldest entries beyond capacity
    pub fn push(&mut self, message: &ConversationMessage) {
        self.entries.push_back(ContextEntry {
            role: message.origin.role().to_string(),
            content: message.text.clone(),
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Number of entries held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum entries held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot in insertion order
    pub fn snapshot(&self) -> Vec<ContextEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str, origin: Origin) -> ConversationMessage {
        ConversationMessage {
            text: text.to_string(),
            origin,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_window_evicts_oldest_first() {
        let mut window = ContextWindow::new(10);
        for i in 0..25 {
            window.push(&msg(&format!("m{}", i), Origin::User));
            assert!(window.len() <= 10);
        }
        let contents: Vec<String> = window.snapshot().into_iter().map(|e| e.content).collect();
        let expected: Vec<String> = (15..25).map(|i| format!("m{}", i)).collect();
        assert_eq!(contents, expected);
    }

    #[test]
    fn test_window_roles() {
        let mut window = ContextWindow::new(3);
        window.push(&msg("oi", Origin::User));
        window.push(&msg("Olá!", Origin::Bot));
        let snap = window.snapshot();
        assert_eq!(snap[0].role, "user");
        assert_eq!(snap[1].role, "assistant");
    }

    #[test]
    fn test_origin_serializes_lowercase() {
        let json = serde_json::to_string(&Origin::Bot).unwrap();
        assert_eq!(json, "\"bot\"");
    }
}
