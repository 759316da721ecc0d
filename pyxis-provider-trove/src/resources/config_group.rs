//! Configuration group adapter
//!
//! Configuration groups carry no status field on the remote side: a group
//! that exists probes as ACTIVE, a 404 probes as DELETED. Declared parameter
//! values are strings in the manifest; values that parse as integers are
//! coerced before transmission because the datastore engine distinguishes
//! numeric parameters from string ones.

use std::collections::BTreeMap;

use pyxis_core::{LifecycleState, Probe, wait_for_state};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::DbApi;
use crate::config::PollTuning;
use crate::error::{TroveError, TroveResult};
use crate::types::{ConfigValue, Configuration, ConfigurationCreate, Datastore};

const KIND: &str = "configuration";

const CREATE_PENDING: &[LifecycleState] = &[LifecycleState::Build];
const CREATE_TARGET: &[LifecycleState] = &[LifecycleState::Active];
const DELETE_PENDING: &[LifecycleState] = &[LifecycleState::Active, LifecycleState::Shutoff];
const DELETE_TARGET: &[LifecycleState] = &[LifecycleState::Deleted];

/// Declared configuration for a configuration group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigGroupConfig {
    pub name: String,
    pub description: String,
    pub datastore: Datastore,
    /// Datastore parameters applied by this group.
    #[serde(default)]
    pub configuration: Vec<ConfigParam>,
}

/// One declared datastore parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigParam {
    pub name: String,
    pub value: String,
}

/// Map the declared configuration into the wire payload, coercing values.
pub fn build_create_request(config: &ConfigGroupConfig) -> TroveResult<ConfigurationCreate> {
    if config.name.trim().is_empty() {
        return Err(TroveError::validation(KIND, "name must not be empty"));
    }
    if config.datastore.kind.trim().is_empty() || config.datastore.version.trim().is_empty() {
        return Err(TroveError::validation(
            KIND,
            "datastore type and version are required",
        ));
    }

    let mut values = BTreeMap::new();
    for param in &config.configuration {
        if param.name.trim().is_empty() {
            return Err(TroveError::validation(
                KIND,
                "configuration parameter name must not be empty",
            ));
        }
        values.insert(param.name.clone(), ConfigValue::coerce(&param.value));
    }

    Ok(ConfigurationCreate {
        name: config.name.clone(),
        description: config.description.clone(),
        datastore: config.datastore.clone(),
        values,
    })
}

/// Create the configuration group and wait for it to exist.
pub async fn create(
    api: &dyn DbApi,
    tuning: &PollTuning,
    config: &ConfigGroupConfig,
) -> TroveResult<Configuration> {
    let body = build_create_request(config)?;
    debug!(name = %body.name, "creating configuration group");

    let group = api.create_configuration(&body).await?;
    info!(id = %group.id, "configuration group created, waiting for ACTIVE");

    let spec = tuning.create_spec(CREATE_PENDING, CREATE_TARGET);
    wait_for_state(&spec, || probe(api, &group.id))
        .await
        .map_err(|e| TroveError::wait(KIND, &group.id, e))?;

    api.get_configuration(&group.id).await
}

/// Observe the group's lifecycle state. An existing group is always ACTIVE;
/// a 404 probes as the canonical `Deleted` state.
pub async fn probe(api: &dyn DbApi, id: &str) -> Result<Probe, TroveError> {
    match api.get_configuration(id).await {
        Ok(_) => Ok(Probe::Status(LifecycleState::Active)),
        Err(e) if e.is_not_found() => Ok(Probe::Status(LifecycleState::Deleted)),
        Err(e) => Err(e),
    }
}

/// Fetch the group, tolerating out-of-band disappearance.
pub async fn read(api: &dyn DbApi, id: &str) -> TroveResult<Option<Configuration>> {
    match api.get_configuration(id).await {
        Ok(group) => Ok(Some(group)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Delete the group and wait for it to disappear.
pub async fn delete(api: &dyn DbApi, tuning: &PollTuning, id: &str) -> TroveResult<()> {
    debug!(id, "deleting configuration group");
    match api.delete_configuration(id).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            debug!(id, "configuration group already gone");
        }
        Err(e) => return Err(e),
    }

    let spec = tuning.delete_spec(DELETE_PENDING, DELETE_TARGET);
    wait_for_state(&spec, || probe(api, id))
        .await
        .map_err(|e| TroveError::wait(KIND, id, e))?;

    info!(id, "configuration group deleted");
    Ok(())
}
