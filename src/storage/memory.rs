use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{validate_session_id, Storage};
use crate::error::StorageResult;
use crate::model::SessionRecord;

/// Process-local storage; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no session has been stored
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self, session_id: &str) -> StorageResult<Option<SessionRecord>> {
        validate_session_id(session_id)?;
        Ok(self.records.read().await.get(session_id).cloned())
    }

    async fn save(&self, record: &SessionRecord) -> StorageResult<()> {
        validate_session_id(&record.session_id)?;
        self.records
            .write()
            .await
            .insert(record.session_id.clone(), record.clone());
        Ok(())
    }
}
