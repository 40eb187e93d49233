//! Dependency order allocation and the disabled-collection repair pass

use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::Result;
use crate::record::DeploymentId;
use crate::scope::GcScope;
use crate::store::RecordStore;

/// Run-scoped allocator of `dependency_order` values.
///
/// Each deployment run gets a fresh allocator counting up from zero, so a
/// resource put later in the run (which may depend on anything put earlier)
/// always receives a strictly greater order. The scheme is only safe when
/// creation order coincides with dependency order, which the provisioning
/// engine guarantees by putting dependencies before dependents.
#[derive(Debug, Default)]
pub struct OrderAllocator {
    next: AtomicI64,
}

impl OrderAllocator {
    /// Fresh allocator for a new deployment run
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next order slot. Monotonically increasing within the run.
    pub fn allocate(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// How many slots this run has handed out so far
    #[must_use]
    pub fn allocated(&self) -> i64 {
        self.next.load(Ordering::SeqCst)
    }
}

/// Outcome summary of an order-repair pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRepair {
    /// How many records had their order rewritten
    pub shifted: usize,
    /// The uniform shift applied to every unmarked in-scope record
    pub delta: i64,
}

/// Repair dependency ordering for a pass that kept its garbage.
///
/// When collection is disabled ([`GcConfig::dry_gc`]), the unmarked in-scope
/// resources `U` that a wet run would have deleted are instead renumbered so
/// they sit strictly above every resource marked this run (`M`, `k = |M|`,
/// occupying orders `0..k-1`). Each member of `U` is shifted by the same
/// `k - min(U)`, which lands the smallest member exactly on `k` and leaves
/// relative order within `U` untouched. Marked and out-of-scope records are
/// never modified.
///
/// Must run to completion before the next deployment begins marking; new
/// orders are only safe relative to the post-repair layout.
pub fn repair_order<S: RecordStore>(
    store: &S,
    scope: &GcScope,
    deployment_id: DeploymentId,
) -> Result<OrderRepair> {
    scope.validate()?;

    let marked = store.query(&|r| r.deployment_id == deployment_id)?;
    let kept = store.query(&|r| r.deployment_id != deployment_id && scope.matches(r))?;

    let Some(min_order) = kept.iter().map(|r| r.dependency_order).min() else {
        tracing::debug!(%deployment_id, "no unmarked in-scope resources; ordering needs no repair");
        return Ok(OrderRepair {
            shifted: 0,
            delta: 0,
        });
    };

    let delta = marked.len() as i64 - min_order;
    if delta == 0 {
        return Ok(OrderRepair {
            shifted: 0,
            delta: 0,
        });
    }

    let shifted = kept.len();
    for mut record in kept {
        record.dependency_order += delta;
        store.put(record)?;
    }

    tracing::info!(%deployment_id, scope = %scope, shifted, delta, "repaired dependency ordering");
    Ok(OrderRepair { shifted, delta })
}
