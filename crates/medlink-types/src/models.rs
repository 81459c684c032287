use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One persisted chat message. Immutable once appended to a conversation
/// list; the server never edits or deletes records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub from: String,
    pub to: String,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl MessageRecord {
    pub fn new(from: impl Into<String>, to: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            content: content.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Directional conversation key: messages A sent to B live under
/// `messages:A:B`, messages B sent to A under `messages:B:A`. A merged
/// two-way view is built by reading both keys and sorting by timestamp.
pub fn conversation_key(from: &str, to: &str) -> String {
    format!("messages:{}:{}", from, to)
}
