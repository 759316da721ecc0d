//! Database adapter
//!
//! A database has no identifier of its own: it lives inside an instance and
//! is observed by listing the instance's databases and scanning for a name
//! match. The declared name is the discriminator for probing and deletion;
//! the parent instance ID is the persisted join key.

use pyxis_core::{LifecycleState, Probe, wait_for_state};
use pyxis_core::waiter::WaitError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::DbApi;
use crate::config::PollTuning;
use crate::error::{TroveError, TroveResult};
use crate::types::{Database, DatabaseCreate};

const KIND: &str = "database";

const CREATE_PENDING: &[LifecycleState] = &[LifecycleState::Build];
const CREATE_TARGET: &[LifecycleState] = &[LifecycleState::Active];
const DELETE_PENDING: &[LifecycleState] = &[LifecycleState::Active];
const DELETE_TARGET: &[LifecycleState] = &[LifecycleState::Deleted];

/// Declared configuration for a database within an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub name: String,
    /// ID of the instance hosting the database.
    pub instance: String,
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(default)]
    pub collate: Option<String>,
}

/// Map the declared configuration into the wire payload.
pub fn build_create_request(config: &DatabaseConfig) -> TroveResult<DatabaseCreate> {
    if config.name.trim().is_empty() {
        return Err(TroveError::validation(KIND, "name must not be empty"));
    }
    if config.instance.trim().is_empty() {
        return Err(TroveError::validation(KIND, "instance is required"));
    }

    Ok(DatabaseCreate {
        name: config.name.clone(),
        character_set: config.charset.clone(),
        collate: config.collate.clone(),
    })
}

/// Create the database and wait for it to appear in the parent's listing.
pub async fn create(
    api: &dyn DbApi,
    tuning: &PollTuning,
    config: &DatabaseConfig,
) -> TroveResult<Database> {
    let body = build_create_request(config)?;
    debug!(name = %body.name, instance = %config.instance, "creating database");

    api.create_databases(&config.instance, std::slice::from_ref(&body))
        .await?;

    let spec = tuning.create_spec(CREATE_PENDING, CREATE_TARGET);
    wait_for_state(&spec, || probe(api, &config.instance, &config.name))
        .await
        .map_err(|e| match e {
            // never showed up in any listing within the window
            WaitError::Timeout { last: None, .. } => {
                TroveError::child_not_found(KIND, &config.name, &config.instance)
            }
            other => TroveError::wait(KIND, &config.name, other),
        })?;

    info!(name = %config.name, instance = %config.instance, "database ready");
    read(api, &config.instance, &config.name)
        .await?
        .ok_or_else(|| TroveError::child_not_found(KIND, &config.name, &config.instance))
}

/// Scan the parent instance's database listing for the declared name.
/// A present database is ACTIVE; an absent one keeps a create-poll alive
/// and satisfies a delete-poll.
pub async fn probe(api: &dyn DbApi, instance_id: &str, name: &str) -> Result<Probe, TroveError> {
    let databases = api.list_databases(instance_id).await?;
    if databases.iter().any(|db| db.name == name) {
        Ok(Probe::Status(LifecycleState::Active))
    } else {
        Ok(Probe::Absent)
    }
}

/// Find the database in the parent's listing, tolerating a vanished parent.
pub async fn read(
    api: &dyn DbApi,
    instance_id: &str,
    name: &str,
) -> TroveResult<Option<Database>> {
    match api.list_databases(instance_id).await {
        Ok(databases) => Ok(databases.into_iter().find(|db| db.name == name)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Delete the database and wait for it to leave the parent's listing.
pub async fn delete(
    api: &dyn DbApi,
    tuning: &PollTuning,
    instance_id: &str,
    name: &str,
) -> TroveResult<()> {
    debug!(name, instance = instance_id, "deleting database");
    match api.delete_database(instance_id, name).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            debug!(name, "database already gone");
        }
        Err(e) => return Err(e),
    }

    let spec = tuning.delete_spec(DELETE_PENDING, DELETE_TARGET);
    wait_for_state(&spec, || delete_probe(api, instance_id, name))
        .await
        .map_err(|e| TroveError::wait(KIND, name, e))?;

    info!(name, instance = instance_id, "database deleted");
    Ok(())
}

/// Delete-poll probe: the whole parent instance being gone also counts as
/// the database being gone.
async fn delete_probe(api: &dyn DbApi, instance_id: &str, name: &str) -> Result<Probe, TroveError> {
    match probe(api, instance_id, name).await {
        Err(e) if e.is_not_found() => Ok(Probe::Absent),
        other => other,
    }
}
