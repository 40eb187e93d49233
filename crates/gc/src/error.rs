//! Error types for collection passes
use thiserror::Error;

/// Result type for collection operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for marking, order repair, and sweep operations
#[derive(Error, Debug)]
pub enum Error {
    /// The collection scope cannot be used for this pass.
    ///
    /// Fatal for the current pass: no deletions are attempted.
    #[error("Invalid collection scope: {reason}")]
    ScopeConfig {
        /// Why the scope was rejected
        reason: String,
    },

    /// The record store has no record under the given identity
    #[error("No record for resource '{identity}'")]
    NotFound {
        /// The resource identity that was looked up
        identity: String,
    },

    /// The record store failed an operation
    #[error("Record store failure: {reason}")]
    Store {
        /// What the store was doing when it failed
        reason: String,
        /// The underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The external deletion collaborator reported failure for a resource.
    ///
    /// The sweep records this per resource and halts all tiers at or below
    /// the failed one; it is only returned directly when a deleter is
    /// invoked outside a sweep pass.
    #[error("External deletion failed for resource '{identity}': {reason}")]
    DeletionFailed {
        /// The resource whose external deletion failed
        identity: String,
        /// The failure reason reported by the collaborator
        reason: String,
    },
}

impl Error {
    /// Create a scope configuration error
    pub fn scope_config<S: Into<String>>(reason: S) -> Self {
        Self::ScopeConfig {
            reason: reason.into(),
        }
    }

    /// Create a store error without an underlying source
    pub fn store<S: Into<String>>(reason: S) -> Self {
        Self::Store {
            reason: reason.into(),
            source: None,
        }
    }

    /// Create a deletion failure for the given resource
    pub fn deletion_failed<I: Into<String>, R: Into<String>>(identity: I, reason: R) -> Self {
        Self::DeletionFailed {
            identity: identity.into(),
            reason: reason.into(),
        }
    }

    /// Get the resource identity associated with this error (if any)
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::ScopeConfig { .. } | Self::Store { .. } => None,
            Self::NotFound { identity } | Self::DeletionFailed { identity, .. } => Some(identity),
        }
    }
}
