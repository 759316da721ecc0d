//! Resource adapters
//!
//! One module per managed object kind. Each adapter maps its declared
//! configuration into the wire payload, submits the create, probes the
//! remote status, and drives create-then-wait / delete-then-wait through
//! the shared poll primitive. Adapters are plain functions taking the
//! client handle explicitly; nothing here holds state.

pub mod config_group;
pub mod database;
pub mod instance;
pub mod user;

pub use config_group::ConfigGroupConfig;
pub use database::DatabaseConfig;
pub use instance::InstanceConfig;
pub use user::UserConfig;
