//! Resource identity, deployment tokens, and the stored record schema

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable, unique key of one externally provisioned resource.
///
/// Identities are opaque to the collector and never reused after deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Create an identity from any string-like key.
    ///
    /// # Panics
    /// Panics if `id` is empty.
    pub fn new<S: Into<String>>(id: S) -> Self {
        let id = id.into();
        assert!(!id.is_empty(), "resource identity must not be empty");
        Self(id)
    }

    /// The identity as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque token identifying one deployment run.
///
/// A fresh token is issued per run; records stamped with the current token
/// survive the run's sweep. A random UUID rather than a timestamp, so clock
/// skew can never make two runs ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(Uuid);

impl DeploymentId {
    /// Issue a fresh token for a new deployment run
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an externally supplied token (e.g. from a `--deployment-id` flag)
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // lowercase hyphenated, matching the wire format of stored records
        write!(f, "{}", self.0)
    }
}

/// Persistent record of one provisioned resource.
///
/// Owned exclusively by the record store; the marker, allocator, and sweep
/// engine read and mutate records only through the store interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Stable unique key, immutable for the record's lifetime
    pub identity: ResourceId,
    /// Scope-matching attributes; always carries at least `manager`
    pub attributes: HashMap<String, String>,
    /// Surrogate for the dependency partial order: a resource may only
    /// depend on resources with a strictly smaller order
    pub dependency_order: i64,
    /// Token of the last deployment run that marked this resource
    pub deployment_id: DeploymentId,
    /// Whether collection was enabled when the resource was last touched
    pub gc_enabled: bool,
}

impl ResourceRecord {
    /// Attribute key every record carries, identifying the owning module
    pub const MANAGER_ATTR: &'static str = "manager";

    /// Convenience accessor for the owning manager attribute
    #[must_use]
    pub fn manager(&self) -> Option<&str> {
        self.attributes.get(Self::MANAGER_ATTR).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_ids_are_unique_per_run() {
        assert_ne!(DeploymentId::generate(), DeploymentId::generate());
    }

    #[test]
    fn deployment_id_displays_lowercase_hyphenated() {
        let id = DeploymentId::generate().to_string();
        assert_eq!(id.len(), 36);
        assert_eq!(id, id.to_lowercase());
    }

    #[test]
    fn resource_id_round_trips_through_serde() {
        let id = ResourceId::new("vpc-main");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"vpc-main\"");
        let back: ResourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    #[should_panic(expected = "resource identity must not be empty")]
    fn empty_identity_panics() {
        ResourceId::new("");
    }
}
