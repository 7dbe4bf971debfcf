//! Storage layer for session persistence.
//!
//! The [`Storage`] trait maps a session handle to a durable
//! [`SessionRecord`]. Two backends are provided: [`FileStorage`] (one JSON
//! document per session, replaced atomically) and [`MemoryStorage`] for tests
//! and embedding. Every backend validates the handle against the allow-list
//! before touching its underlying location.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::model::{session_id_violation, SessionRecord};

/// Key-value persistence of session records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    /// Load the record for a handle, `None` if no record exists.
    async fn load(&self, session_id: &str) -> StorageResult<Option<SessionRecord>>;

    /// Persist a record, replacing any previous version.
    async fn save(&self, record: &SessionRecord) -> StorageResult<()>;
}

/// Reject handles outside the allow-list before any location is derived.
pub fn validate_session_id(session_id: &str) -> StorageResult<()> {
    match session_id_violation(session_id) {
        Some(reason) => Err(StorageError::InvalidSessionId {
            session_id: session_id.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
