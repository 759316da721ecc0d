//! Provider error types

use pyxis_core::waiter::WaitError;
use thiserror::Error;

/// Errors surfaced by the Trove provider.
///
/// Not-found is a distinguishable kind because several code paths branch on
/// it: a 404 during read means "drop the object from tracked state", and a
/// 404 during a delete poll is the success condition.
#[derive(Debug, Error)]
pub enum TroveError {
    /// The provider could not be constructed from its configuration.
    /// Aborts before any remote call.
    #[error("provider configuration error: {0}")]
    Configuration(String),

    /// The remote rejected an API call. Surfaced verbatim, never retried.
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// The HTTP request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The object does not exist on the remote.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// A database or user never appeared in its parent instance's listing
    /// within the poll window.
    #[error("{kind} {name} never appeared on instance {instance_id}")]
    ChildNotFound {
        kind: &'static str,
        name: String,
        instance_id: String,
    },

    /// Declared configuration failed validation before any remote call.
    #[error("invalid {kind} configuration: {message}")]
    Validation { kind: &'static str, message: String },

    /// A poll for a target lifecycle state failed.
    #[error("waiting for {kind} {id} failed: {source}")]
    Wait {
        kind: &'static str,
        id: String,
        #[source]
        source: Box<WaitError<TroveError>>,
    },
}

impl TroveError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn child_not_found(
        kind: &'static str,
        name: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self::ChildNotFound {
            kind,
            name: name.into(),
            instance_id: instance_id.into(),
        }
    }

    pub fn validation(kind: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            kind,
            message: message.into(),
        }
    }

    pub fn wait(kind: &'static str, id: impl Into<String>, source: WaitError<TroveError>) -> Self {
        Self::Wait {
            kind,
            id: id.into(),
            source: Box::new(source),
        }
    }

    /// Returns true if this error means "the object does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for provider operations
pub type TroveResult<T> = Result<T, TroveError>;
