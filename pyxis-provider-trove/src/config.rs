//! Provider configuration
//!
//! The provider is handed an endpoint and a pre-issued auth token; identity
//! negotiation is out of scope. Every setting can fall back to the standard
//! OpenStack environment variables so a manifest only has to spell out what
//! differs from the ambient credentials.

use std::time::Duration;

use pyxis_core::{LifecycleState, PollSpec};
use serde::{Deserialize, Serialize};

use crate::error::{TroveError, TroveResult};

/// Environment fallbacks, matching the usual OpenStack client conventions.
const ENV_ENDPOINT: &str = "OS_DATABASE_ENDPOINT";
const ENV_TOKEN: &str = "OS_AUTH_TOKEN";
const ENV_REGION: &str = "OS_REGION_NAME";
const ENV_FLAVOR: &str = "OS_FLAVOR_ID";

/// Connection settings for the Trove API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TroveConfig {
    /// Base URL of the database service endpoint.
    pub endpoint: String,
    /// Pre-issued authentication token, sent as `X-Auth-Token`.
    pub token: String,
    /// Region name, informational only for a direct endpoint.
    #[serde(default)]
    pub region: Option<String>,
    /// Flavor used for instances that do not declare one.
    #[serde(default)]
    pub default_flavor: Option<String>,
    /// Poll cadence and timeouts.
    #[serde(default)]
    pub poll: PollTuning,
}

impl TroveConfig {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            region: None,
            default_flavor: None,
            poll: PollTuning::default(),
        }
    }

    /// Build a configuration entirely from the environment.
    pub fn from_env() -> TroveResult<Self> {
        let endpoint = std::env::var(ENV_ENDPOINT)
            .map_err(|_| TroveError::configuration(format!("{ENV_ENDPOINT} is not set")))?;
        let token = std::env::var(ENV_TOKEN)
            .map_err(|_| TroveError::configuration(format!("{ENV_TOKEN} is not set")))?;

        let mut config = Self::new(endpoint, token);
        config.apply_env_fallbacks();
        Ok(config)
    }

    /// Fill unset optional fields from the environment.
    pub fn apply_env_fallbacks(&mut self) {
        if self.region.is_none() {
            self.region = std::env::var(ENV_REGION).ok();
        }
        if self.default_flavor.is_none() {
            self.default_flavor = std::env::var(ENV_FLAVOR).ok();
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_default_flavor(mut self, flavor: impl Into<String>) -> Self {
        self.default_flavor = Some(flavor.into());
        self
    }

    pub fn with_poll(mut self, poll: PollTuning) -> Self {
        self.poll = poll;
        self
    }
}

/// Poll cadence and per-operation timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollTuning {
    pub create_timeout_secs: u64,
    pub delete_timeout_secs: u64,
    pub delay_secs: u64,
    pub min_interval_secs: u64,
}

impl Default for PollTuning {
    fn default() -> Self {
        Self {
            create_timeout_secs: 600,
            delete_timeout_secs: 600,
            delay_secs: 10,
            min_interval_secs: 3,
        }
    }
}

impl PollTuning {
    /// Poll spec for a create wait.
    pub fn create_spec(
        &self,
        pending: &[LifecycleState],
        target: &[LifecycleState],
    ) -> PollSpec {
        PollSpec::new(pending.to_vec(), target.to_vec())
            .with_timeout(Duration::from_secs(self.create_timeout_secs))
            .with_cadence(
                Duration::from_secs(self.delay_secs),
                Duration::from_secs(self.min_interval_secs),
            )
    }

    /// Poll spec for a delete wait.
    pub fn delete_spec(
        &self,
        pending: &[LifecycleState],
        target: &[LifecycleState],
    ) -> PollSpec {
        PollSpec::new(pending.to_vec(), target.to_vec())
            .with_timeout(Duration::from_secs(self.delete_timeout_secs))
            .with_cadence(
                Duration::from_secs(self.delay_secs),
                Duration::from_secs(self.min_interval_secs),
            )
    }
}
