//! Durable session persistence
//!
//! Sessions are written whole at every suspend boundary (topic intake,
//! approval, terminal states). A mid-run crash loses the running pass but
//! never a suspended session.

use crate::error::EngineResult;
use crate::session::SessionRecord;
use async_trait::async_trait;
use fathom_core::storage_error;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Persistence seam for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, record: &SessionRecord) -> EngineResult<()>;

    async fn load(&self, session_id: &str) -> EngineResult<Option<SessionRecord>>;

    async fn list(&self) -> EngineResult<Vec<SessionRecord>>;

    /// Deleting an unknown session is not an error.
    async fn delete(&self, session_id: &str) -> EngineResult<()>;
}

/// In-memory store for tests and `persist_sessions = false` setups.
#[derive(Default)]
pub struct MemorySessionStore {
    records: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, record: &SessionRecord) -> EngineResult<()> {
        let mut records = self.records.write().await;
        records.insert(record.id.clone(), record.clone());
        debug!(session_id = %record.id, "Saved session to memory store");
        Ok(())
    }

    async fn load(&self, session_id: &str) -> EngineResult<Option<SessionRecord>> {
        let records = self.records.read().await;
        Ok(records.get(session_id).cloned())
    }

    async fn list(&self) -> EngineResult<Vec<SessionRecord>> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }

    async fn delete(&self, session_id: &str) -> EngineResult<()> {
        let mut records = self.records.write().await;
        records.remove(session_id);
        Ok(())
    }
}

/// One JSON file per session under a data directory.
pub struct FileSessionStore {
    storage_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new<P: AsRef<Path>>(storage_dir: P) -> EngineResult<Self> {
        let storage_dir = storage_dir.as_ref().to_path_buf();

        std::fs::create_dir_all(&storage_dir).map_err(|e| {
            storage_error!(
                format!("Failed to create session directory {}", storage_dir.display()),
                "session_store",
                e
            )
        })?;

        info!(dir = %storage_dir.display(), "Session storage initialized");
        Ok(Self { storage_dir })
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.storage_dir.join(format!("{}.json", session_id))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, record: &SessionRecord) -> EngineResult<()> {
        let path = self.session_path(&record.id);
        let json = serde_json::to_string_pretty(record)?;

        tokio::fs::write(&path, json).await.map_err(|e| {
            storage_error!(
                format!("Failed to write session file {}", path.display()),
                "session_store",
                e
            )
        })?;

        debug!(session_id = %record.id, path = %path.display(), "Saved session");
        Ok(())
    }

    async fn load(&self, session_id: &str) -> EngineResult<Option<SessionRecord>> {
        let path = self.session_path(session_id);

        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(storage_error!(
                    format!("Failed to read session file {}", path.display()),
                    "session_store",
                    e
                )
                .into())
            }
        };

        let record: SessionRecord = serde_json::from_str(&json)?;
        Ok(Some(record))
    }

    async fn list(&self) -> EngineResult<Vec<SessionRecord>> {
        let mut records = Vec::new();

        let mut entries = tokio::fs::read_dir(&self.storage_dir).await.map_err(|e| {
            storage_error!(
                format!(
                    "Failed to read session directory {}",
                    self.storage_dir.display()
                ),
                "session_store",
                e
            )
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            storage_error!("Failed to read session directory entry", "session_store", e)
        })? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            match tokio::fs::read_to_string(&path).await {
                Ok(json) => match serde_json::from_str::<SessionRecord>(&json) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable session file")
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable session file")
                }
            }
        }

        info!(count = records.len(), "Loaded sessions from storage");
        Ok(records)
    }

    async fn delete(&self, session_id: &str) -> EngineResult<()> {
        let path = self.session_path(session_id);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(session_id = %session_id, "Deleted session file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error!(
                format!("Failed to delete session file {}", path.display()),
                "session_store",
                e
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStatus;

    #[tokio::test]
    async fn file_store_round_trips_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path()).unwrap();

        let mut record = SessionRecord::new();
        record.topic = Some("solar panels".to_string());
        record.status = SessionStatus::AwaitingApproval;
        record.ledger.claim_query("solar panels");

        store.save(&record).await.unwrap();

        let loaded = store.load(&record.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.topic.as_deref(), Some("solar panels"));
        assert_eq!(loaded.status, SessionStatus::AwaitingApproval);
        assert!(loaded.ledger.has_query("solar panels"));
    }

    #[tokio::test]
    async fn file_store_load_of_unknown_id_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path()).unwrap();

        assert!(store.load("no-such-session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_list_skips_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path()).unwrap();

        let record = SessionRecord::new();
        store.save(&record).await.unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, record.id);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path()).unwrap();

        let record = SessionRecord::new();
        store.save(&record).await.unwrap();

        store.delete(&record.id).await.unwrap();
        store.delete(&record.id).await.unwrap();
        assert!(store.load(&record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_store_round_trips_a_session() {
        let store = MemorySessionStore::new();
        let record = SessionRecord::new();

        store.save(&record).await.unwrap();
        assert!(store.load(&record.id).await.unwrap().is_some());

        store.delete(&record.id).await.unwrap();
        assert!(store.load(&record.id).await.unwrap().is_none());
    }
}
