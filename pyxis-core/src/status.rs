//! Lifecycle states reported by remote managed objects

use std::fmt;

/// Status of a remote managed object at one observation instant.
///
/// States are never cached locally; every probe re-queries the remote source
/// of truth. `Deleted` is the single canonical "object absent" state,
/// regardless of how the remote spells it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// The object is being provisioned.
    Build,
    /// The object is ready for use.
    Active,
    /// The object exists but is powered off.
    Shutoff,
    /// Provisioning failed on the remote side.
    Error,
    /// The object does not exist (or no longer exists).
    Deleted,
    /// A status string this tool does not know about.
    Other(String),
}

impl LifecycleState {
    /// Parse a remote status string, case-insensitively.
    ///
    /// OpenStack services are not consistent about status casing ("error" and
    /// "ERROR" both occur in the wild), so everything is normalized here.
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        match upper.as_str() {
            "BUILD" => Self::Build,
            "ACTIVE" => Self::Active,
            "SHUTOFF" => Self::Shutoff,
            "ERROR" => Self::Error,
            "DELETED" => Self::Deleted,
            _ => Self::Other(upper),
        }
    }

    /// Canonical uppercase rendering of this state.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Build => "BUILD",
            Self::Active => "ACTIVE",
            Self::Shutoff => "SHUTOFF",
            Self::Error => "ERROR",
            Self::Deleted => "DELETED",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Returns true if the remote reported a failed provisioning.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for LifecycleState {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}
