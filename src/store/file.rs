//! JSON file store shared between processes.
//!
//! Every call takes an exclusive advisory lock on a sibling `.lock` file,
//! loads the ledger, applies the call and writes the result back through a
//! temp file and rename.

use super::{ChecklistItem, Ledger, PushAdvance, PushSnapshot, PushStore, StoreResult};
use crate::error::StateError;
use crate::push::{Push, PushEdit, PushStatus};
use crate::request::{PushId, Request, RequestFields, RequestId, RequestState};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const LOCK_RETRY: Duration = Duration::from_millis(100);

/// Store persisted as a JSON file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

/// Held lock; released on drop
#[derive(Debug)]
struct StateLock {
    #[cfg(unix)]
    _handle: nix::fcntl::Flock<fs::File>,
    #[cfg(not(unix))]
    _handle: fs::File,
}

impl FileStore {
    /// Store backed by `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let lock_path = path.with_extension("lock");
        Self {
            path,
            lock_path,
            lock_timeout: Duration::from_secs(5),
        }
    }

    /// Override how long to wait for another process's lock
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the ledger without locking; empty when the file is missing
    pub fn load(&self) -> StoreResult<Ledger> {
        if !self.path.exists() {
            return Ok(Ledger::default());
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| StateError::LoadFailed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let ledger = serde_json::from_str(&contents).map_err(|e| StateError::Corrupted {
            reason: format!("{}: {}", self.path.display(), e),
        })?;
        Ok(ledger)
    }

    fn save(&self, ledger: &Ledger) -> StoreResult<()> {
        let serialized = serde_json::to_string_pretty(ledger).map_err(|e| StateError::SaveFailed {
            reason: format!("Failed to serialize state: {}", e),
        })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StateError::SaveFailed {
                reason: format!("Failed to create {}: {}", parent.display(), e),
            })?;
        }

        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path).map_err(|e| StateError::SaveFailed {
                reason: format!("Failed to create temp file: {}", e),
            })?;
            file.write_all(serialized.as_bytes())
                .map_err(|e| StateError::SaveFailed {
                    reason: format!("Failed to write state: {}", e),
                })?;
            file.sync_all().map_err(|e| StateError::SaveFailed {
                reason: format!("Failed to sync file: {}", e),
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| StateError::SaveFailed {
            reason: format!("Failed to rename temp file: {}", e),
        })?;
        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    async fn acquire_lock(&self) -> StoreResult<StateLock> {
        if let Some(parent) = self.lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StateError::SaveFailed {
                reason: format!("Failed to create {}: {}", parent.display(), e),
            })?;
        }

        let started = Instant::now();
        loop {
            let file = fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&self.lock_path)
                .map_err(|e| StateError::SaveFailed {
                    reason: format!("Failed to open lock file: {}", e),
                })?;

            #[cfg(unix)]
            {
                use nix::fcntl::{Flock, FlockArg};

                match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                    Ok(handle) => return Ok(StateLock { _handle: handle }),
                    Err((_, nix::errno::Errno::EWOULDBLOCK)) => {}
                    Err((_, errno)) => {
                        return Err(StateError::SaveFailed {
                            reason: format!("flock error: {}", errno),
                        }
                        .into());
                    }
                }
            }

            #[cfg(not(unix))]
            {
                return Ok(StateLock { _handle: file });
            }

            #[allow(unreachable_code)]
            if started.elapsed() >= self.lock_timeout {
                return Err(StateError::LockTimeout {
                    path: self.lock_path.clone(),
                }
                .into());
            }
            log::debug!("State lock busy, retrying");
            tokio::time::sleep(LOCK_RETRY).await;
        }
    }

    async fn read<T>(&self, f: impl FnOnce(&Ledger) -> StoreResult<T> + Send) -> StoreResult<T> {
        let _lock = self.acquire_lock().await?;
        let ledger = self.load()?;
        f(&ledger)
    }

    async fn write<T>(
        &self,
        f: impl FnOnce(&mut Ledger) -> StoreResult<T> + Send,
    ) -> StoreResult<T> {
        let _lock = self.acquire_lock().await?;
        let mut ledger = self.load()?;
        let value = f(&mut ledger)?;
        self.save(&ledger)?;
        Ok(value)
    }
}

impl PushStore for FileStore {
    async fn create_or_update_request(&self, fields: RequestFields, user: &str) -> StoreResult<Request> {
        self.write(|l| l.create_or_update_request(fields, user)).await
    }

    async fn fetch_request(&self, id: RequestId) -> StoreResult<Request> {
        self.read(|l| l.fetch_request(id)).await
    }

    async fn transition_request(
        &self,
        push: PushId,
        id: RequestId,
        expected: RequestState,
        target: RequestState,
    ) -> StoreResult<Request> {
        self.write(|l| l.transition_request(push, id, expected, target)).await
    }

    async fn advance_push(
        &self,
        push: PushId,
        from: RequestState,
        to: RequestState,
        status: PushStatus,
    ) -> StoreResult<PushAdvance> {
        self.write(|l| l.advance_push(push, from, to, status)).await
    }

    async fn transition_push(&self, push: PushId, status: PushStatus) -> StoreResult<Push> {
        self.write(|l| l.transition_push(push, status)).await
    }

    async fn create_push(&self, title: &str, branch: &str, pushmaster: &str) -> StoreResult<Push> {
        self.write(|l| l.create_push(title, branch, pushmaster)).await
    }

    async fn fetch_push(&self, push: PushId) -> StoreResult<PushSnapshot> {
        self.read(|l| l.fetch_push(push)).await
    }

    async fn list_pushes(&self) -> StoreResult<Vec<Push>> {
        self.read(|l| Ok(l.list_pushes())).await
    }

    async fn edit_push(&self, push: PushId, edit: PushEdit) -> StoreResult<Push> {
        self.write(|l| l.edit_push(push, edit)).await
    }

    async fn fetch_push_checklist(
        &self,
        push: PushId,
        is_pushmaster: bool,
    ) -> StoreResult<Vec<ChecklistItem>> {
        self.read(|l| l.fetch_push_checklist(push, is_pushmaster)).await
    }

    async fn toggle_checklist_item(&self, item: u64, complete: bool) -> StoreResult<ChecklistItem> {
        self.write(|l| l.toggle_checklist_item(item, complete)).await
    }

    async fn comment_request(&self, id: RequestId, author: &str, text: &str) -> StoreResult<Request> {
        self.write(|l| l.comment_request(id, author, text)).await
    }

    async fn notify_users(&self, people: &[String], message: &str) -> StoreResult<()> {
        self.write(|l| l.notify_users(people, message)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[tokio::test]
    async fn test_state_persists_between_stores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let push = FileStore::new(&path)
            .create_push("Morning", "deploy-1", "pm")
            .await
            .unwrap();
        let reopened = FileStore::new(&path);
        assert_eq!(reopened.fetch_push(push.id).await.unwrap().push, push);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state.json"));
        assert!(store.list_pushes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupted_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let err = FileStore::new(&path).list_pushes().await.unwrap_err();
        assert!(matches!(err, StoreError::State(StateError::Corrupted { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_lock_timeout() {
        use nix::fcntl::{Flock, FlockArg};

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state.json"))
            .with_lock_timeout(Duration::from_millis(200));
        let file = fs::File::create(dir.path().join("state.lock")).unwrap();
        let _held = Flock::lock(file, FlockArg::LockExclusiveNonblock).unwrap();

        let err = store.list_pushes().await.unwrap_err();
        assert!(matches!(err, StoreError::State(StateError::LockTimeout { .. })));
    }
}
