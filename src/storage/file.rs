use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{validate_session_id, Storage};
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::model::SessionRecord;

/// File-backed storage: one pretty-printed JSON document per session.
///
/// Writes go to a temporary file in the same directory which is synced and
/// then renamed over the record, so a reader never observes a partial
/// document.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at the configured sessions directory.
    ///
    /// The directory is created lazily on the first save.
    pub fn new(config: &StorageConfig) -> Self {
        Self::with_root(&config.sessions_dir)
    }

    /// Create a storage rooted at an explicit directory.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory holding the session records.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the record for a handle.
    pub fn record_path(&self, session_id: &str) -> StorageResult<PathBuf> {
        validate_session_id(session_id)?;
        Ok(self.root.join(format!("{}.json", session_id)))
    }

    async fn write_atomic(&self, path: &Path, session_id: &str, data: &[u8]) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error(&self.root, e))?;

        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", session_id, Uuid::new_v4()));

        let result = async {
            let mut file = tokio::fs::File::create(&tmp)
                .await
                .map_err(|e| io_error(&tmp, e))?;
            file.write_all(data).await.map_err(|e| io_error(&tmp, e))?;
            file.sync_all().await.map_err(|e| io_error(&tmp, e))?;
            drop(file);
            tokio::fs::rename(&tmp, path)
                .await
                .map_err(|e| io_error(path, e))
        }
        .await;

        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %tmp.display(), error = %e, "Failed to remove temporary record");
                }
            }
        }
        result
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load(&self, session_id: &str) -> StorageResult<Option<SessionRecord>> {
        let path = self.record_path(session_id)?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(session_id, "No session record on disk");
                return Ok(None);
            }
            Err(e) => return Err(io_error(&path, e)),
        };

        let record: SessionRecord =
            serde_json::from_str(&content).map_err(|e| StorageError::Corrupted {
                session_id: session_id.to_string(),
                message: e.to_string(),
            })?;

        if record.session_id != session_id {
            return Err(StorageError::Corrupted {
                session_id: session_id.to_string(),
                message: format!("record belongs to session '{}'", record.session_id),
            });
        }

        debug!(session_id, thoughts = record.thoughts.len(), "Session record loaded");
        Ok(Some(record))
    }

    async fn save(&self, record: &SessionRecord) -> StorageResult<()> {
        let path = self.record_path(&record.session_id)?;
        let json = serde_json::to_vec_pretty(record)?;

        self.write_atomic(&path, &record.session_id, &json).await?;

        debug!(
            session_id = %record.session_id,
            path = %path.display(),
            thoughts = record.thoughts.len(),
            "Session record saved"
        );
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}
