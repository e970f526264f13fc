use std::path::{Path, PathBuf};

use floyd_core::{Session, SessionId, SessionSummary};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

/// Default cap on the number of sessions retained on disk.
const DEFAULT_SESSION_CAP: usize = 100;

/// File-backed store for [`Session`] records.
///
/// One file per session, named `<id>.json`, under `<root>/sessions/`.
pub struct SessionStore {
    root: PathBuf,
    cap: usize,
    ready: OnceCell<()>,
}

impl SessionStore {
    /// Construct a store rooted at `root`. Directory creation is scheduled,
    /// not performed, here — see the module docs for why.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cap: DEFAULT_SESSION_CAP,
            ready: OnceCell::new(),
        }
    }

    /// Override the default session cap (mainly for tests).
    #[must_use]
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    fn path_for(&self, id: SessionId) -> PathBuf {
        self.sessions_dir().join(format!("{}.json", id.as_string()))
    }

    /// The race this closes: a caller invoking `create` immediately after
    /// construction must observe the same behavior as one invoking it a
    /// second later. Every public method awaits this before touching disk.
    async fn ensure_ready(&self) -> StorageResult<()> {
        self.ready
            .get_or_try_init(|| async {
                tokio::fs::create_dir_all(self.sessions_dir()).await?;
                Ok::<_, StorageError>(())
            })
            .await?;
        Ok(())
    }

    /// Create a new, empty session rooted at `cwd`, enforcing the session
    /// cap by deleting the oldest-by-`updated_at` sessions beyond it.
    pub async fn create(&self, cwd: impl Into<PathBuf>) -> StorageResult<Session> {
        self.ensure_ready().await?;
        let session = Session::new(cwd.into());
        self.save(&session).await?;
        self.enforce_cap().await?;
        Ok(session)
    }

    /// Load a session by id.
    pub async fn load(&self, id: SessionId) -> StorageResult<Session> {
        self.ensure_ready().await?;
        let path = self.path_for(id);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StorageError::NotFound(id.as_string()),
                _ => StorageError::Io(e),
            })?;
        let session: Session = serde_json::from_slice(&bytes)?;
        Ok(session)
    }

    /// Atomically replace the persisted record for `session.id`.
    ///
    /// Writes to a temporary sibling file and renames over the target so
    /// readers never observe a truncated file.
    pub async fn save(&self, session: &Session) -> StorageResult<()> {
        self.ensure_ready().await?;
        let path = self.path_for(session.id);
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        debug!(session_id = %session.id, bytes = bytes.len(), "saved session");
        Ok(())
    }

    /// List all sessions, ordered by `updated_at` descending.
    pub async fn list(&self) -> StorageResult<Vec<SessionSummary>> {
        self.ensure_ready().await?;
        let mut summaries = self.read_all_summaries().await?;
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// Delete a session's on-disk record.
    pub async fn delete(&self, id: SessionId) -> StorageResult<()> {
        self.ensure_ready().await?;
        let path = self.path_for(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.as_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn enforce_cap(&self) -> StorageResult<()> {
        let mut summaries = self.read_all_summaries().await?;
        if summaries.len() <= self.cap {
            return Ok(());
        }
        summaries.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        let overflow = summaries.len() - self.cap;
        for summary in summaries.into_iter().take(overflow) {
            if let Err(e) = self.delete(summary.id).await {
                warn!(session_id = %summary.id, error = %e, "failed to evict session over cap");
            }
        }
        Ok(())
    }

    async fn read_all_summaries(&self) -> StorageResult<Vec<SessionSummary>> {
        let mut entries = tokio::fs::read_dir(self.sessions_dir()).await?;
        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_session_file(&path) {
                match tokio::fs::read(&path).await {
                    Ok(bytes) => match serde_json::from_slice::<Session>(&bytes) {
                        Ok(session) => summaries.push(session.summary()),
                        Err(e) => warn!(?path, error = %e, "skipping corrupt session file"),
                    },
                    Err(e) => warn!(?path, error = %e, "skipping unreadable session file"),
                }
            }
        }
        Ok(summaries)
    }
}

fn is_session_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::new(dir.path())
    }

    #[tokio::test]
    async fn create_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        let session = store.create("/work").await.unwrap();
        let loaded = store.load(session.id).await.unwrap();
        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.cwd, PathBuf::from("/work"));
    }

    #[tokio::test]
    async fn save_preserves_unknown_fields_across_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        let mut session = store.create("/work").await.unwrap();
        session
            .extra
            .insert("clientHint".into(), serde_json::json!("terminal-ui"));
        store.save(&session).await.unwrap();

        let loaded = store.load(session.id).await.unwrap();
        assert_eq!(
            loaded.extra.get("clientHint"),
            Some(&serde_json::json!("terminal-ui"))
        );
    }

    #[tokio::test]
    async fn save_load_save_is_idempotent_in_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        let session = store.create("/work").await.unwrap();
        let path = store.path_for(session.id);
        let first = tokio::fs::read(&path).await.unwrap();

        let loaded = store.load(session.id).await.unwrap();
        store.save(&loaded).await.unwrap();
        let second = tokio::fs::read(&path).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn load_missing_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        let err = store.load(SessionId::new()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_orders_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        let first = store.create("/work").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.create("/work").await.unwrap();

        let listing = store.list().await.unwrap();
        assert_eq!(listing[0].id, second.id);
        assert_eq!(listing[1].id, first.id);
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        let session = store.create("/work").await.unwrap();
        store.delete(session.id).await.unwrap();
        assert!(matches!(
            store.load(session.id).await.unwrap_err(),
            StorageError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn cap_evicts_oldest_sessions_beyond_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).with_cap(2);
        let first = store.create("/work").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let _second = store.create("/work").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let _third = store.create("/work").await.unwrap();

        let listing = store.list().await.unwrap();
        assert_eq!(listing.len(), 2);
        assert!(store.load(first.id).await.is_err());
    }

    #[tokio::test]
    async fn create_immediately_after_construction_does_not_race_directory_init() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested"));
        // No `await` of directory creation happened yet; `create` must still work.
        let session = store.create("/work").await.unwrap();
        assert!(store.load(session.id).await.is_ok());
    }
}
