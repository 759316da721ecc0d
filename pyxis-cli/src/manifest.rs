//! Manifest loading and validation
//!
//! A manifest is a TOML file declaring the provider connection, the state
//! file location, and the desired objects: `[[instance]]`, `[[database]]`,
//! `[[user]]` and `[[configuration_group]]` tables. Databases and users name
//! their parent instance by its declared name; the remote ID is resolved
//! through the state file at apply time.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use pyxis_provider_trove::resources::{
    ConfigGroupConfig, DatabaseConfig, InstanceConfig, UserConfig, config_group, database,
    instance, user,
};
use pyxis_provider_trove::{PollTuning, TroveConfig};

const ENV_ENDPOINT: &str = "OS_DATABASE_ENDPOINT";
const ENV_TOKEN: &str = "OS_AUTH_TOKEN";
const ENV_FLAVOR: &str = "OS_FLAVOR_ID";

#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub provider: ProviderSection,
    #[serde(default)]
    pub state: StateSection,
    #[serde(default, rename = "instance")]
    pub instances: Vec<InstanceConfig>,
    #[serde(default, rename = "configuration_group")]
    pub configuration_groups: Vec<ConfigGroupConfig>,
    #[serde(default, rename = "database")]
    pub databases: Vec<DatabaseConfig>,
    #[serde(default, rename = "user")]
    pub users: Vec<UserConfig>,
}

impl Manifest {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let manifest: Manifest = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(manifest)
    }

    pub fn resource_count(&self) -> usize {
        self.instances.len()
            + self.configuration_groups.len()
            + self.databases.len()
            + self.users.len()
    }

    /// Structural checks that need no remote API: duplicate names, dangling
    /// parent references, and payloads the provider would reject.
    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();
        let default_flavor = self.provider.resolved_default_flavor();

        let mut instance_names = HashSet::new();
        for config in &self.instances {
            if !instance_names.insert(config.name.as_str()) {
                errors.push(format!("instance.{}: declared more than once", config.name));
            }
            if let Err(e) = instance::build_create_request(config, default_flavor.as_deref()) {
                errors.push(format!("instance.{}: {}", config.name, e));
            }
        }

        let mut group_names = HashSet::new();
        for config in &self.configuration_groups {
            if !group_names.insert(config.name.as_str()) {
                errors.push(format!(
                    "configuration_group.{}: declared more than once",
                    config.name
                ));
            }
            if let Err(e) = config_group::build_create_request(config) {
                errors.push(format!("configuration_group.{}: {}", config.name, e));
            }
        }

        let mut database_names = HashSet::new();
        for config in &self.databases {
            if !database_names.insert(config.name.as_str()) {
                errors.push(format!("database.{}: declared more than once", config.name));
            }
            if !instance_names.contains(config.instance.as_str()) {
                errors.push(format!(
                    "database.{}: references undeclared instance \"{}\"",
                    config.name, config.instance
                ));
            }
            if let Err(e) = database::build_create_request(config) {
                errors.push(format!("database.{}: {}", config.name, e));
            }
        }

        let mut user_names = HashSet::new();
        for config in &self.users {
            if !user_names.insert(config.name.as_str()) {
                errors.push(format!("user.{}: declared more than once", config.name));
            }
            if !instance_names.contains(config.instance.as_str()) {
                errors.push(format!(
                    "user.{}: references undeclared instance \"{}\"",
                    config.name, config.instance
                ));
            }
            if let Err(e) = user::build_create_request(config) {
                errors.push(format!("user.{}: {}", config.name, e));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }
}

/// `[provider]` section. Every field falls back to the usual OpenStack
/// environment variables so a manifest only spells out what differs from
/// the ambient credentials.
#[derive(Debug, Default, Deserialize)]
pub struct ProviderSection {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub region: Option<String>,
    pub default_flavor: Option<String>,
    pub poll: Option<PollTuning>,
}

impl ProviderSection {
    pub fn trove_config(&self) -> anyhow::Result<TroveConfig> {
        let endpoint = self
            .endpoint
            .clone()
            .or_else(|| std::env::var(ENV_ENDPOINT).ok())
            .with_context(|| format!("no provider endpoint declared and {ENV_ENDPOINT} is not set"))?;
        let token = self
            .token
            .clone()
            .or_else(|| std::env::var(ENV_TOKEN).ok())
            .with_context(|| format!("no provider token declared and {ENV_TOKEN} is not set"))?;

        let mut config = TroveConfig::new(endpoint, token);
        config.region = self.region.clone();
        config.default_flavor = self.default_flavor.clone();
        if let Some(poll) = &self.poll {
            config.poll = poll.clone();
        }
        config.apply_env_fallbacks();
        Ok(config)
    }

    pub fn resolved_default_flavor(&self) -> Option<String> {
        self.default_flavor
            .clone()
            .or_else(|| std::env::var(ENV_FLAVOR).ok())
    }
}

/// `[state]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StateSection {
    pub path: PathBuf,
}

impl Default for StateSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("pyxis.state.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [provider]
        endpoint = "https://db.example/v1.0/tenant"
        token = "tok"
        default_flavor = "flavor-1"

        [state]
        path = "env/prod.state.json"

        [[instance]]
        name = "app-db"
        size = 10

        [instance.datastore]
        type = "mysql"
        version = "8.0"

        [[configuration_group]]
        name = "tuned"
        description = "production tuning"
        configuration = [
            { name = "max_connections", value = "200" },
        ]

        [configuration_group.datastore]
        type = "mysql"
        version = "8.0"

        [[database]]
        name = "app"
        instance = "app-db"
        charset = "utf8mb4"

        [[user]]
        name = "svc"
        instance = "app-db"
        password = "secret"
        databases = ["app"]
    "#;

    #[test]
    fn sample_manifest_parses_and_validates() {
        let manifest: Manifest = toml::from_str(SAMPLE).unwrap();
        assert_eq!(manifest.resource_count(), 4);
        assert_eq!(manifest.state.path, PathBuf::from("env/prod.state.json"));
        assert_eq!(manifest.instances[0].datastore.kind, "mysql");
        assert_eq!(manifest.databases[0].instance, "app-db");
        manifest.validate().unwrap();
    }

    #[test]
    fn load_reads_manifest_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyxis.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.resource_count(), 4);
        assert_eq!(manifest.instances[0].name, "app-db");
    }

    #[test]
    fn load_reports_missing_file_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = Manifest::load(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn load_reports_malformed_toml_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyxis.toml");
        std::fs::write(&path, "[[instance]\nname =").unwrap();

        let err = Manifest::load(&path).unwrap_err();
        assert!(err.to_string().contains("pyxis.toml"));
    }

    #[test]
    fn state_path_defaults_when_section_is_absent() {
        let manifest: Manifest = toml::from_str(
            r#"
            [provider]
            endpoint = "https://db.example"
            token = "tok"
            "#,
        )
        .unwrap();
        assert_eq!(manifest.state.path, PathBuf::from("pyxis.state.json"));
        assert_eq!(manifest.resource_count(), 0);
    }

    #[test]
    fn validate_rejects_dangling_parent_reference() {
        let manifest: Manifest = toml::from_str(
            r#"
            [[database]]
            name = "orphan"
            instance = "missing"
            "#,
        )
        .unwrap();
        let errors = manifest.validate().unwrap_err();
        assert!(errors.contains("references undeclared instance \"missing\""));
    }

    #[test]
    fn validate_rejects_duplicate_names() {
        let manifest: Manifest = toml::from_str(
            r#"
            [provider]
            default_flavor = "flavor-1"

            [[instance]]
            name = "twin"
            size = 1
            [instance.datastore]
            type = "mysql"
            version = "8.0"

            [[instance]]
            name = "twin"
            size = 1
            [instance.datastore]
            type = "mysql"
            version = "8.0"
            "#,
        )
        .unwrap();
        let errors = manifest.validate().unwrap_err();
        assert!(errors.contains("declared more than once"));
    }

    #[test]
    fn validate_surfaces_provider_payload_errors() {
        let manifest: Manifest = toml::from_str(
            r#"
            [[instance]]
            name = "bad"
            size = 0
            [instance.datastore]
            type = "mysql"
            version = "8.0"
            "#,
        )
        .unwrap();
        let errors = manifest.validate().unwrap_err();
        assert!(errors.contains("size must be at least 1"));
    }

    #[test]
    fn provider_section_prefers_declared_values() {
        let section = ProviderSection {
            endpoint: Some("https://db.example".into()),
            token: Some("tok".into()),
            region: Some("RegionOne".into()),
            default_flavor: None,
            poll: Some(PollTuning {
                create_timeout_secs: 120,
                ..PollTuning::default()
            }),
        };
        let config = section.trove_config().unwrap();
        assert_eq!(config.endpoint, "https://db.example");
        assert_eq!(config.region.as_deref(), Some("RegionOne"));
        assert_eq!(config.poll.create_timeout_secs, 120);
    }
}
