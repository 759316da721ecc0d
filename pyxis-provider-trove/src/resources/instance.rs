//! Database instance adapter
//!
//! Instances are the composite resource: the create payload may bundle
//! initial databases and users, which the service provisions alongside the
//! instance. Only the instance's own status is awaited; the bundled children
//! are assumed to follow once the instance goes ACTIVE and can be observed
//! afterwards through the listing endpoints.

use pyxis_core::{LifecycleState, Probe, wait_for_state};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::DbApi;
use crate::config::PollTuning;
use crate::error::{TroveError, TroveResult};
use crate::types::{
    Datastore, DatabaseCreate, DatabaseRef, Instance, InstanceCreate, Nic, UserCreate, Volume,
};

const KIND: &str = "instance";

const CREATE_PENDING: &[LifecycleState] = &[LifecycleState::Build];
const CREATE_TARGET: &[LifecycleState] = &[LifecycleState::Active];
const DELETE_PENDING: &[LifecycleState] = &[LifecycleState::Active, LifecycleState::Shutoff];
const DELETE_TARGET: &[LifecycleState] = &[LifecycleState::Deleted];

/// Declared configuration for a database instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub name: String,
    /// Flavor reference; falls back to the provider's default flavor.
    #[serde(default)]
    pub flavor: Option<String>,
    /// Volume size in gigabytes.
    pub size: i64,
    pub datastore: Datastore,
    #[serde(default)]
    pub network: Vec<NetworkAttachment>,
    /// Databases created together with the instance.
    #[serde(default)]
    pub database: Vec<DatabaseSpec>,
    /// Users created together with the instance.
    #[serde(default)]
    pub user: Vec<UserSpec>,
}

/// Declared network attachment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkAttachment {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub fixed_ip_v4: Option<String>,
    #[serde(default)]
    pub fixed_ip_v6: Option<String>,
}

/// Database bundled into an instance create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSpec {
    pub name: String,
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(default)]
    pub collate: Option<String>,
}

/// User bundled into an instance create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSpec {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub databases: Vec<String>,
}

/// Map the declared configuration into the wire payload.
pub fn build_create_request(
    config: &InstanceConfig,
    default_flavor: Option<&str>,
) -> TroveResult<InstanceCreate> {
    if config.name.trim().is_empty() {
        return Err(TroveError::validation(KIND, "name must not be empty"));
    }
    if config.datastore.kind.trim().is_empty() || config.datastore.version.trim().is_empty() {
        return Err(TroveError::validation(
            KIND,
            "datastore type and version are required",
        ));
    }
    if config.size < 1 {
        return Err(TroveError::validation(KIND, "size must be at least 1"));
    }

    let flavor_ref = config
        .flavor
        .as_deref()
        .or(default_flavor)
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| {
            TroveError::validation(KIND, "no flavor declared and no default flavor configured")
        })?
        .to_string();

    let nics = config
        .network
        .iter()
        .map(|net| Nic {
            net_id: net.uuid.clone(),
            port_id: net.port.clone(),
            v4_fixed_ip: net.fixed_ip_v4.clone(),
            v6_fixed_ip: net.fixed_ip_v6.clone(),
        })
        .collect();

    let databases = config
        .database
        .iter()
        .map(|db| DatabaseCreate {
            name: db.name.clone(),
            character_set: db.charset.clone(),
            collate: db.collate.clone(),
        })
        .collect();

    let users = config
        .user
        .iter()
        .map(|user| UserCreate {
            name: user.name.clone(),
            password: user.password.clone(),
            host: user.host.clone(),
            databases: user
                .databases
                .iter()
                .map(|name| DatabaseRef { name: name.clone() })
                .collect(),
        })
        .collect();

    Ok(InstanceCreate {
        name: config.name.clone(),
        flavor_ref,
        volume: Volume { size: config.size },
        datastore: config.datastore.clone(),
        nics,
        databases,
        users,
    })
}

/// Create the instance and wait for it to become ACTIVE.
pub async fn create(
    api: &dyn DbApi,
    tuning: &PollTuning,
    config: &InstanceConfig,
    default_flavor: Option<&str>,
) -> TroveResult<Instance> {
    let body = build_create_request(config, default_flavor)?;
    debug!(name = %body.name, flavor = %body.flavor_ref, "creating instance");

    let instance = api.create_instance(&body).await?;
    info!(id = %instance.id, "instance created, waiting for ACTIVE");

    let spec = tuning.create_spec(CREATE_PENDING, CREATE_TARGET);
    wait_for_state(&spec, || probe(api, &instance.id))
        .await
        .map_err(|e| TroveError::wait(KIND, &instance.id, e))?;

    api.get_instance(&instance.id).await
}

/// Observe the instance's lifecycle state.
///
/// HTTP 404 probes as the canonical `Deleted` state, and an ERROR status
/// fails the wait immediately with the remote fault message.
pub async fn probe(api: &dyn DbApi, id: &str) -> Result<Probe, TroveError> {
    match api.get_instance(id).await {
        Ok(instance) => {
            let state = LifecycleState::parse(&instance.status);
            if state.is_error() {
                let message = instance
                    .fault
                    .map(|f| f.message)
                    .unwrap_or_else(|| "instance entered ERROR state".to_string());
                return Ok(Probe::Fault { state, message });
            }
            Ok(Probe::Status(state))
        }
        Err(e) if e.is_not_found() => Ok(Probe::Status(LifecycleState::Deleted)),
        Err(e) => Err(e),
    }
}

/// Fetch the instance, tolerating out-of-band disappearance.
pub async fn read(api: &dyn DbApi, id: &str) -> TroveResult<Option<Instance>> {
    match api.get_instance(id).await {
        Ok(instance) => Ok(Some(instance)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Delete the instance and wait for it to disappear.
///
/// A 404 from the delete call itself is swallowed; the poll below confirms
/// absence either way, making delete idempotent from the caller's side.
pub async fn delete(api: &dyn DbApi, tuning: &PollTuning, id: &str) -> TroveResult<()> {
    debug!(id, "deleting instance");
    match api.delete_instance(id).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            debug!(id, "instance already gone");
        }
        Err(e) => return Err(e),
    }

    let spec = tuning.delete_spec(DELETE_PENDING, DELETE_TARGET);
    wait_for_state(&spec, || probe(api, id))
        .await
        .map_err(|e| TroveError::wait(KIND, id, e))?;

    info!(id, "instance deleted");
    Ok(())
}
