//! Per-pass collection configuration
//!
//! Configuration is passed explicitly into each pass rather than held as
//! ambient mutable state, so passes stay independently testable and multiple
//! scopes can be processed in one process without races.

use serde::{Deserialize, Serialize};

use crate::scope::GcScope;

/// Configuration for one deployment run's marking and collection pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcConfig {
    /// Attribute filter bounding what this pass may delete
    pub scope: GcScope,
    /// Whether collection is enabled at all. When false the pass neither
    /// deletes nor repairs ordering.
    ///
    /// Turning this on over a store that already holds unmarked in-scope
    /// resources created before ordering was tracked is a documented
    /// precondition violation: sweep proceeds but may delete in an unsafe
    /// order. Callers must ensure no unmarked resources exist at first
    /// enablement.
    pub support_gc: bool,
    /// Report-only mode: no deletions, but the order-repair pass runs so
    /// the kept resources stay safely sequenced for future runs.
    pub dry_gc: bool,
}

impl GcConfig {
    /// Collection enabled for everything owned by `manager_id`, wet run.
    ///
    /// # Panics
    /// Panics if `manager_id` is empty.
    pub fn for_manager<S: Into<String>>(manager_id: S) -> Self {
        Self {
            scope: GcScope::manager(manager_id),
            support_gc: true,
            dry_gc: false,
        }
    }

    /// Switch the pass to report-only mode
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_gc = true;
        self
    }

    /// Disable collection entirely for the pass
    #[must_use]
    pub fn without_gc(mut self) -> Self {
        self.support_gc = false;
        self
    }
}
