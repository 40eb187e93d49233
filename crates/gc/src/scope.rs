//! Collection scope — the attribute filter bounding what a pass may delete

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::ResourceRecord;

/// Attribute-match filter defining which stored resources a deployment's
/// collection pass may ever delete.
///
/// A resource is in scope iff every scope key is present on the resource
/// with an equal value; a missing attribute means out-of-scope. Matching is
/// a pure predicate and the scope is treated as an immutable snapshot for
/// the duration of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GcScope {
    // BTreeMap so Display and serde output are deterministic
    constraints: BTreeMap<String, String>,
}

impl GcScope {
    /// The default scope: everything owned by the given manager identity.
    ///
    /// # Panics
    /// Panics if `manager_id` is empty.
    pub fn manager<S: Into<String>>(manager_id: S) -> Self {
        let manager_id = manager_id.into();
        assert!(!manager_id.is_empty(), "manager identity must not be empty");
        let mut constraints = BTreeMap::new();
        constraints.insert(ResourceRecord::MANAGER_ATTR.to_string(), manager_id);
        Self { constraints }
    }

    /// Narrow the scope with an additional attribute constraint
    /// (e.g. limiting collection to a single account).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.constraints.insert(key.into(), value.into());
        self
    }

    /// Check that the scope is usable for a pass.
    ///
    /// An empty scope would place every stored resource in scope, so it is
    /// rejected rather than silently collecting the world. Keys must be
    /// non-empty so they can be resolved against record attributes.
    pub fn validate(&self) -> Result<()> {
        if self.constraints.is_empty() {
            return Err(Error::scope_config(
                "scope has no constraints; refusing to match every resource",
            ));
        }
        if let Some((key, _)) = self.constraints.iter().find(|(k, _)| k.is_empty()) {
            return Err(Error::scope_config(format!(
                "scope key {key:?} cannot be resolved against resource attributes"
            )));
        }
        Ok(())
    }

    /// Whether `record` falls inside this scope
    #[must_use]
    pub fn matches(&self, record: &ResourceRecord) -> bool {
        self.constraints
            .iter()
            .all(|(key, value)| record.attributes.get(key) == Some(value))
    }

    /// Number of attribute constraints in the scope
    #[must_use]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Whether the scope carries no constraints (always invalid for a pass)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl fmt::Display for GcScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.constraints {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}
