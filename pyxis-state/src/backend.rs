//! State backend trait and error types

use async_trait::async_trait;
use thiserror::Error;

use crate::lock::LockInfo;
use crate::state::StateFile;

/// Errors that can occur when interacting with a state backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The state is locked by another process
    #[error("State is locked by {who} (lock ID: {lock_id}, operation: {operation})")]
    Locked {
        lock_id: String,
        who: String,
        operation: String,
    },

    /// The lock was not found (for release/force-unlock operations)
    #[error("Lock not found: {0}")]
    LockNotFound(String),

    /// Lock ID mismatch when trying to release
    #[error("Lock ID mismatch: expected {expected}, got {actual}")]
    LockMismatch { expected: String, actual: String },

    /// Configuration error
    #[error("Backend configuration error: {0}")]
    Configuration(String),

    /// State file is corrupted or invalid
    #[error("Invalid state file: {0}")]
    InvalidState(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BackendError {
    /// Create a Locked error from a LockInfo
    pub fn locked(lock: &LockInfo) -> Self {
        Self::Locked {
            lock_id: lock.id.clone(),
            who: lock.who.clone(),
            operation: lock.operation.clone(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Trait for state storage backends
///
/// This trait defines the interface for storing and retrieving state files,
/// as well as managing locks for concurrent access control.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the current state from the backend
    ///
    /// Returns `None` if no state exists (first-time use)
    async fn read_state(&self) -> BackendResult<Option<StateFile>>;

    /// Write the state to the backend
    ///
    /// The state's serial number should be incremented before calling this
    async fn write_state(&self, state: &StateFile) -> BackendResult<()>;

    /// Acquire a lock for the given operation
    ///
    /// Fails if a live lock is already held by another process; an expired
    /// lock is replaced.
    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo>;

    /// Release a previously acquired lock
    ///
    /// Verifies that the lock being released matches the provided lock info
    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()>;

    /// Force release a lock by its ID
    ///
    /// This is an administrative operation that should be used with caution
    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()>;

    /// Initialize the backend (create directories if needed, etc.)
    async fn init(&self) -> BackendResult<()>;
}
