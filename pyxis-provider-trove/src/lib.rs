//! Pyxis Trove Provider
//!
//! Manages OpenStack Trove database-as-a-service objects declaratively:
//! instances, databases, users and configuration groups. Each resource kind
//! follows the same reconciliation shape: submit a create request, poll the
//! remote status until a target lifecycle state is reached, keep only the
//! remote ID as local state, and on delete poll until the object disappears.
//!
//! The provider talks to the Trove v1 REST API through the [`client::DbApi`]
//! trait. Production code uses [`client::TroveClient`] over HTTP; tests
//! substitute a scripted implementation.

pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod resources;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{DbApi, TroveClient};
pub use config::{PollTuning, TroveConfig};
pub use error::{TroveError, TroveResult};
pub use provider::TroveProvider;
