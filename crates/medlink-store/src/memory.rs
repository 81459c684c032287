use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use medlink_types::models::MessageRecord;

use crate::{ConversationStore, StoreError};

/// In-memory history for dev mode (`MEDLINK_STORE=memory`) and tests.
/// Same append/read semantics as [`crate::RedisStore`], no durability.
#[derive(Default)]
pub struct MemoryStore {
    lists: RwLock<HashMap<String, Vec<MessageRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn append(&self, key: &str, record: &MessageRecord) -> Result<(), StoreError> {
        let mut lists = self.lists.write().await;
        lists.entry(key.to_string()).or_default().push(record.clone());
        Ok(())
    }

    async fn read_all(
        &self,
        key: &str,
        limit: Option<usize>,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let lists = self.lists.read().await;
        let records = lists.get(key).map(Vec::as_slice).unwrap_or_default();
        let start = match limit {
            Some(n) => records.len().saturating_sub(n),
            None => 0,
        };
        Ok(records[start..].to_vec())
    }
}
