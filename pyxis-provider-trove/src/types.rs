//! Wire types for the Trove v1 API
//!
//! Field names follow the service's JSON exactly (`flavorRef`, `net-id`,
//! `character_set`, ...). Every nested block is a typed record; nothing here
//! is an untyped map except the configuration values, which the API models
//! as a parameter-name-to-value object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Datastore selection, required on instances and configuration groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datastore {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
}

/// Network attachment for an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nic {
    #[serde(rename = "net-id", skip_serializing_if = "Option::is_none")]
    pub net_id: Option<String>,
    #[serde(rename = "port-id", skip_serializing_if = "Option::is_none")]
    pub port_id: Option<String>,
    #[serde(rename = "v4-fixed-ip", skip_serializing_if = "Option::is_none")]
    pub v4_fixed_ip: Option<String>,
    #[serde(rename = "v6-fixed-ip", skip_serializing_if = "Option::is_none")]
    pub v6_fixed_ip: Option<String>,
}

/// Storage volume attached to an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub size: i64,
}

/// Request body for creating an instance, including optionally bundled
/// databases and users. Only the instance itself is polled after creation;
/// the bundled children are created by the service as part of provisioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceCreate {
    pub name: String,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    pub volume: Volume,
    pub datastore: Datastore,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nics: Vec<Nic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub databases: Vec<DatabaseCreate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<UserCreate>,
}

/// Instance as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datastore: Option<Datastore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Volume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<Fault>,
}

/// Fault details attached to an instance in ERROR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub message: String,
}

/// Request body for creating a database within an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseCreate {
    pub name: String,
    #[serde(rename = "character_set", skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collate: Option<String>,
}

/// Database as reported in an instance's listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    #[serde(rename = "character_set", default)]
    pub character_set: Option<String>,
    #[serde(default)]
    pub collate: Option<String>,
}

/// Reference to a database by name, used for user grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRef {
    pub name: String,
}

/// Request body for creating a user within an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreate {
    pub name: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub databases: Vec<DatabaseRef>,
}

/// User as reported in an instance's listing. The service never echoes
/// passwords back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub databases: Vec<DatabaseRef>,
}

/// A configuration parameter value.
///
/// The wire format distinguishes numeric parameters from string ones, and
/// the datastore engine cares about the difference: `max_connections` must
/// arrive as `5`, not `"5"`, while `collation_server` stays a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Integer(i64),
    Text(String),
}

impl ConfigValue {
    /// Coerce a declared string value: anything that parses as an integer is
    /// transmitted as one, everything else is passed through unchanged.
    pub fn coerce(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(n) => Self::Integer(n),
            Err(_) => Self::Text(raw.to_string()),
        }
    }
}

/// Request body for creating a configuration group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationCreate {
    pub name: String,
    pub description: String,
    pub datastore: Datastore,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, ConfigValue>,
}

/// Configuration group as reported by the service. It carries no status
/// field; an existing group is always treated as ACTIVE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub datastore_name: Option<String>,
    #[serde(default)]
    pub datastore_version_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, ConfigValue>,
}
