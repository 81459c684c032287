pub mod memory;
pub mod redis;

use async_trait::async_trait;
use thiserror::Error;

use medlink_types::models::MessageRecord;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Per-conversation append-only history.
///
/// Keys are the directional conversation keys from
/// [`medlink_types::models::conversation_key`]. Appends to the same key are
/// serialized by the backing store; this trait adds no locking of its own.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append a record to the tail of the key's list. Returns once the
    /// backing store has acknowledged the write.
    async fn append(&self, key: &str, record: &MessageRecord) -> Result<(), StoreError>;

    /// Read the key's records oldest first. `limit` returns only the most
    /// recent N; `None` returns everything. An unknown key yields an empty
    /// list, not an error.
    async fn read_all(&self, key: &str, limit: Option<usize>)
        -> Result<Vec<MessageRecord>, StoreError>;
}

/// Store failures are fatal per operation: there is no retry here, the
/// caller reports the failure and moves on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history store unavailable: {0}")]
    Unavailable(#[from] ::redis::RedisError),

    #[error("corrupt record under {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
