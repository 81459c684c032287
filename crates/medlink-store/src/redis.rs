use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use medlink_types::models::MessageRecord;

use crate::{ConversationStore, StoreError};

/// Redis-backed history: one list per conversation key, appended with RPUSH
/// and read with LRANGE. Entries are JSON-serialized [`MessageRecord`]s, the
/// same layout the key's other producers use.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect and verify the server is reachable. Failure here is meant to
    /// be fatal at startup: the relay must not accept connections without a
    /// working history store.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        info!("connected to redis at {}", url);
        Ok(Self { manager })
    }
}

#[async_trait]
impl ConversationStore for RedisStore {
    async fn append(&self, key: &str, record: &MessageRecord) -> Result<(), StoreError> {
        let entry = serde_json::to_string(record).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        let mut conn = self.manager.clone();
        let _: i64 = conn.rpush(key, entry).await?;
        Ok(())
    }

    async fn read_all(
        &self,
        key: &str,
        limit: Option<usize>,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let start = match limit {
            Some(0) => return Ok(Vec::new()),
            Some(n) => lrange_start(n),
            None => 0,
        };
        let mut conn = self.manager.clone();
        let entries: Vec<String> = conn.lrange(key, start, -1).await?;

        entries
            .iter()
            .map(|entry| {
                serde_json::from_str(entry).map_err(|source| StoreError::Corrupt {
                    key: key.to_string(),
                    source,
                })
            })
            .collect()
    }
}

/// LRANGE key -(n) -1 yields the last n entries. `limit` is client-supplied,
/// so clamp before negating: anything past isize::MAX asks for the whole
/// list anyway.
fn lrange_start(limit: usize) -> isize {
    -(limit.min(isize::MAX as usize) as isize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lrange_start_is_negative_offset() {
        assert_eq!(lrange_start(1), -1);
        assert_eq!(lrange_start(50), -50);
    }

    #[test]
    fn lrange_start_clamps_absurd_limits() {
        assert_eq!(lrange_start(usize::MAX), -(isize::MAX));
        assert_eq!(lrange_start(isize::MAX as usize + 1), -(isize::MAX));
    }
}
