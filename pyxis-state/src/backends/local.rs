//! Local filesystem state backend
//!
//! Stores the state as pretty-printed JSON at a configured path, with an
//! advisory lock file beside it (`<path>.lock`). The lock file is created
//! with `create_new` so two processes racing for the lock cannot both win;
//! an expired lock left behind by a crashed run is replaced.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::backend::{BackendError, BackendResult, StateBackend};
use crate::lock::LockInfo;
use crate::state::StateFile;

/// State backend backed by a local JSON file.
pub struct LocalBackend {
    state_path: PathBuf,
}

impl LocalBackend {
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .state_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.state_path.with_file_name(name)
    }

    fn read_lock(&self) -> BackendResult<Option<LockInfo>> {
        match std::fs::read_to_string(self.lock_path()) {
            Ok(contents) => {
                let lock = serde_json::from_str(&contents)?;
                Ok(Some(lock))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_lock(&self, lock: &LockInfo, replace: bool) -> BackendResult<()> {
        let contents = serde_json::to_string_pretty(lock)?;
        let mut options = std::fs::OpenOptions::new();
        options.write(true);
        if replace {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let mut file = options.open(self.lock_path())?;
        std::io::Write::write_all(&mut file, contents.as_bytes())?;
        Ok(())
    }

    fn remove_lock(&self) -> BackendResult<()> {
        std::fs::remove_file(self.lock_path())?;
        Ok(())
    }
}

#[async_trait]
impl StateBackend for LocalBackend {
    async fn read_state(&self) -> BackendResult<Option<StateFile>> {
        match std::fs::read_to_string(&self.state_path) {
            Ok(contents) => {
                let state: StateFile = serde_json::from_str(&contents)
                    .map_err(|e| BackendError::InvalidState(e.to_string()))?;
                Ok(Some(state))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_state(&self, state: &StateFile) -> BackendResult<()> {
        let contents = serde_json::to_string_pretty(state)?;
        // write-then-rename so a crash mid-write cannot truncate the state
        let tmp_path = self.state_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, &self.state_path)?;
        Ok(())
    }

    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo> {
        let lock = LockInfo::new(operation);

        match self.write_lock(&lock, false) {
            Ok(()) => Ok(lock),
            Err(BackendError::Io(_)) => {
                // lock file already exists; honor it unless it has expired
                match self.read_lock()? {
                    Some(existing) if !existing.is_expired() => {
                        Err(BackendError::locked(&existing))
                    }
                    _ => {
                        self.write_lock(&lock, true)?;
                        Ok(lock)
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()> {
        match self.read_lock()? {
            Some(existing) if existing.id == lock.id => self.remove_lock(),
            Some(existing) => Err(BackendError::LockMismatch {
                expected: lock.id.clone(),
                actual: existing.id,
            }),
            None => Err(BackendError::LockNotFound(lock.id.clone())),
        }
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        match self.read_lock()? {
            Some(_) => self.remove_lock(),
            None => Err(BackendError::LockNotFound(lock_id.to_string())),
        }
    }

    async fn init(&self) -> BackendResult<()> {
        if let Some(parent) = self.state_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
