//! State file structures for persisting managed-object identity

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kinds of remote objects Pyxis manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Instance,
    Database,
    User,
    ConfigurationGroup,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Instance => "instance",
            Self::Database => "database",
            Self::User => "user",
            Self::ConfigurationGroup => "configuration_group",
        };
        f.write_str(name)
    }
}

/// The main state file structure that persists to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Unique identifier for this state lineage (prevents accidental overwrites)
    pub lineage: String,
    /// Version of Pyxis that last modified this state
    pub pyxis_version: String,
    /// Identity records for all managed objects
    pub resources: Vec<ResourceRecord>,
}

impl StateFile {
    /// Current state file format version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a new empty state file
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            pyxis_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Increment serial and update the tool version for a new state write
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.pyxis_version = env!("CARGO_PKG_VERSION").to_string();
    }

    /// Find a record by kind and declared name
    pub fn find_record(&self, kind: ResourceKind, name: &str) -> Option<&ResourceRecord> {
        self.resources
            .iter()
            .find(|r| r.kind == kind && r.name == name)
    }

    /// Add or replace a record
    pub fn upsert_record(&mut self, record: ResourceRecord) {
        if let Some(existing) = self
            .resources
            .iter_mut()
            .find(|r| r.kind == record.kind && r.name == record.name)
        {
            *existing = record;
        } else {
            self.resources.push(record);
        }
    }

    /// Remove a record, returning it if present
    pub fn remove_record(&mut self, kind: ResourceKind, name: &str) -> Option<ResourceRecord> {
        let pos = self
            .resources
            .iter()
            .position(|r| r.kind == kind && r.name == name)?;
        Some(self.resources.remove(pos))
    }

    /// All records of one kind, in insertion order
    pub fn records_of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceRecord> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a single managed object.
///
/// The remote ID is the join key between declared configuration and remote
/// reality. For databases and users, which have no identifier of their own,
/// `id` holds the parent instance's ID and `instance` the declared name of
/// that parent, so the scope can be re-resolved on later runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub kind: ResourceKind,
    /// Declared name in the manifest
    pub name: String,
    /// Remote identifier (for children: the parent instance's ID)
    pub id: String,
    /// Declared name of the parent instance, set only for databases and users
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl ResourceRecord {
    pub fn new(kind: ResourceKind, name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            id: id.into(),
            instance: None,
        }
    }

    /// Attach the declared parent instance name (databases and users)
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }
}
