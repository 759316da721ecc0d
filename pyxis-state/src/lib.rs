//! Pyxis State Management
//!
//! Persists the identity of every managed remote object. A record holds the
//! resource kind, the declared name and the remote ID — nothing else. All
//! other attributes are re-derived from the remote on each refresh, so the
//! state file never becomes a stale cache.
//!
//! The state lives behind the [`StateBackend`] trait with advisory locking
//! to serialize concurrent runs; [`LocalBackend`] stores it as a JSON file
//! next to the manifest.

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendError, BackendResult, StateBackend};
pub use backends::LocalBackend;
pub use lock::LockInfo;
pub use state::{ResourceKind, ResourceRecord, StateFile};
