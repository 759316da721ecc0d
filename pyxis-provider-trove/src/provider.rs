//! Trove provider handle
//!
//! `TroveProvider` owns the API client and poll tuning and exposes the
//! per-kind create/read/delete operations. It is passed explicitly into
//! whatever drives reconciliation; there is no process-wide client.

use std::sync::Arc;

use crate::client::{DbApi, TroveClient};
use crate::config::{PollTuning, TroveConfig};
use crate::error::TroveResult;
use crate::resources::{config_group, database, instance, user};
use crate::resources::{ConfigGroupConfig, DatabaseConfig, InstanceConfig, UserConfig};
use crate::types::{Configuration, Database, Instance, User};

/// Provider handle for OpenStack Trove.
///
/// Cheap to clone; safe to share across concurrent reconciliations. Each
/// operation is self-contained: create and delete block until the target
/// state is reached or the configured timeout elapses.
#[derive(Clone)]
pub struct TroveProvider {
    api: Arc<dyn DbApi>,
    poll: PollTuning,
    default_flavor: Option<String>,
}

impl std::fmt::Debug for TroveProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TroveProvider")
            .field("poll", &self.poll)
            .field("default_flavor", &self.default_flavor)
            .finish_non_exhaustive()
    }
}

impl TroveProvider {
    /// Construct the provider, building the HTTP client from configuration.
    /// This is the only fallible step before remote calls.
    pub fn new(config: &TroveConfig) -> TroveResult<Self> {
        let client = TroveClient::new(config)?;
        Ok(Self {
            api: Arc::new(client),
            poll: config.poll.clone(),
            default_flavor: config.default_flavor.clone(),
        })
    }

    /// Construct the provider over an existing API implementation.
    pub fn with_api(api: Arc<dyn DbApi>, poll: PollTuning) -> Self {
        Self {
            api,
            poll,
            default_flavor: None,
        }
    }

    pub fn with_default_flavor(mut self, flavor: impl Into<String>) -> Self {
        self.default_flavor = Some(flavor.into());
        self
    }

    // =========================================================================
    // Instances
    // =========================================================================

    pub async fn create_instance(&self, config: &InstanceConfig) -> TroveResult<Instance> {
        instance::create(
            self.api.as_ref(),
            &self.poll,
            config,
            self.default_flavor.as_deref(),
        )
        .await
    }

    pub async fn read_instance(&self, id: &str) -> TroveResult<Option<Instance>> {
        instance::read(self.api.as_ref(), id).await
    }

    pub async fn delete_instance(&self, id: &str) -> TroveResult<()> {
        instance::delete(self.api.as_ref(), &self.poll, id).await
    }

    // =========================================================================
    // Databases
    // =========================================================================

    pub async fn create_database(&self, config: &DatabaseConfig) -> TroveResult<Database> {
        database::create(self.api.as_ref(), &self.poll, config).await
    }

    pub async fn read_database(
        &self,
        instance_id: &str,
        name: &str,
    ) -> TroveResult<Option<Database>> {
        database::read(self.api.as_ref(), instance_id, name).await
    }

    pub async fn delete_database(&self, instance_id: &str, name: &str) -> TroveResult<()> {
        database::delete(self.api.as_ref(), &self.poll, instance_id, name).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn create_user(&self, config: &UserConfig) -> TroveResult<User> {
        user::create(self.api.as_ref(), &self.poll, config).await
    }

    pub async fn read_user(&self, instance_id: &str, name: &str) -> TroveResult<Option<User>> {
        user::read(self.api.as_ref(), instance_id, name).await
    }

    pub async fn delete_user(&self, instance_id: &str, name: &str) -> TroveResult<()> {
        user::delete(self.api.as_ref(), &self.poll, instance_id, name).await
    }

    // =========================================================================
    // Configuration groups
    // =========================================================================

    pub async fn create_config_group(
        &self,
        config: &ConfigGroupConfig,
    ) -> TroveResult<Configuration> {
        config_group::create(self.api.as_ref(), &self.poll, config).await
    }

    pub async fn read_config_group(&self, id: &str) -> TroveResult<Option<Configuration>> {
        config_group::read(self.api.as_ref(), id).await
    }

    pub async fn delete_config_group(&self, id: &str) -> TroveResult<()> {
        config_group::delete(self.api.as_ref(), &self.poll, id).await
    }
}
