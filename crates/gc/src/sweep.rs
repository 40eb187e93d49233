//! Sweep — reverse-dependency-ordered deletion of unmarked in-scope resources

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::allocator::{OrderRepair, repair_order};
use crate::config::GcConfig;
use crate::error::Result;
use crate::record::{DeploymentId, ResourceId, ResourceRecord};
use crate::store::RecordStore;

/// External deletion collaborator.
///
/// Implementations perform the actual delete call against the provider.
/// Deletion is assumed idempotent (deleting an already-absent external
/// object reports success) and retryable; the sweep assumes nothing beyond
/// "eventually succeeds or reports failure".
#[async_trait]
pub trait Deleter: Send + Sync {
    /// Delete the external object described by `record`
    async fn delete_external(&self, record: &ResourceRecord) -> Result<()>;
}

/// What happened to one sweep candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepStatus {
    /// External deletion succeeded and the record was removed from the store
    Deleted,
    /// The candidate was intentionally left alone (e.g. dry run)
    Skipped {
        /// Why the candidate was not deleted
        reason: String,
    },
    /// The external collaborator reported failure; the record is retained
    Failed {
        /// The failure reason reported by the collaborator
        reason: String,
    },
    /// A failure in a higher tier halted the sweep before this candidate
    NotAttempted,
}

/// Per-candidate sweep result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    /// The candidate's identity
    pub identity: ResourceId,
    /// The candidate's dependency order at sweep time
    pub dependency_order: i64,
    /// What happened to it
    pub status: SweepStatus,
}

/// Best-effort diagnostics surfaced alongside the outcomes.
///
/// Warnings never stop a sweep: the order is a surrogate, not authoritative
/// dependency data, so deletion proceeds in computed order regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepWarning {
    /// Multiple candidates share one dependency order, so their relative
    /// deletion order cannot be sequenced by the surrogate
    OrderingInconsistency {
        /// The shared order value
        dependency_order: i64,
        /// The candidates sharing it
        identities: Vec<ResourceId>,
    },
    /// A candidate predates collection tracking (`gc_enabled` false): its
    /// dependency relationships may not be captured by the stored order
    UntrackedResource {
        /// The candidate's identity
        identity: ResourceId,
    },
}

/// Aggregated result of one sweep pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Token of the deployment run this sweep closed out
    pub deployment_id: DeploymentId,
    /// Per-candidate results, in descending dependency order (attempt order)
    pub outcomes: Vec<SweepOutcome>,
    /// Best-effort diagnostics for this pass
    pub warnings: Vec<SweepWarning>,
    /// False when a deletion failure halted the pass early; the caller can
    /// retry by running another sweep, which recomputes candidates
    pub completed: bool,
    /// The order repair applied instead of deletion, when the pass ran dry
    pub repair: Option<OrderRepair>,
}

impl SweepReport {
    fn empty(deployment_id: DeploymentId) -> Self {
        Self {
            deployment_id,
            outcomes: Vec::new(),
            warnings: Vec::new(),
            completed: true,
            repair: None,
        }
    }

    /// How many candidates were deleted
    #[must_use]
    pub fn deleted(&self) -> usize {
        self.count(|s| matches!(s, SweepStatus::Deleted))
    }

    /// How many candidates failed external deletion
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, SweepStatus::Failed { .. }))
    }

    /// How many candidates were never attempted because the pass halted
    #[must_use]
    pub fn not_attempted(&self) -> usize {
        self.count(|s| matches!(s, SweepStatus::NotAttempted))
    }

    fn count(&self, pred: impl Fn(&SweepStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// End-of-deployment collector.
///
/// Computes the unmarked in-scope candidate set, orders it by descending
/// dependency order (dependents before dependencies), and deletes tier by
/// tier: candidates sharing an order are deleted concurrently, with a
/// strict barrier before the next lower tier begins. Records are removed
/// from the store only after the external collaborator confirms deletion,
/// so an aborted sweep leaves the store consistent and can simply be re-run.
#[derive(Debug)]
pub struct SweepEngine<S, D> {
    store: Arc<S>,
    deleter: Arc<D>,
}

impl<S: RecordStore, D: Deleter> SweepEngine<S, D> {
    /// Engine over the given store and deletion collaborator
    #[must_use]
    pub fn new(store: Arc<S>, deleter: Arc<D>) -> Self {
        Self { store, deleter }
    }

    /// Run the collection pass for a finished deployment run.
    ///
    /// All marking for `deployment_id` must have completed before this is
    /// called; the provisioning engine calls it exactly once per run.
    pub async fn sweep(&self, config: &GcConfig, deployment_id: DeploymentId) -> Result<SweepReport> {
        config.scope.validate()?;

        if !config.support_gc {
            tracing::info!(%deployment_id, "collection disabled; leaving unmarked resources in place");
            return Ok(SweepReport::empty(deployment_id));
        }

        // Candidates: in scope, not stamped by this run. Descending order so
        // dependents are deleted before anything they may depend on.
        let scope = &config.scope;
        let mut candidates =
            self.store.query(&|r| r.deployment_id != deployment_id && scope.matches(r))?;
        candidates.reverse();

        let warnings = collect_warnings(&candidates);

        let mut report = SweepReport::empty(deployment_id);
        report.warnings = warnings;

        if config.dry_gc {
            for record in &candidates {
                tracing::info!(identity = %record.identity, "would delete (dry run)");
                report.outcomes.push(SweepOutcome {
                    identity: record.identity.clone(),
                    dependency_order: record.dependency_order,
                    status: SweepStatus::Skipped {
                        reason: "dry run".to_string(),
                    },
                });
            }
            report.repair = Some(repair_order(self.store.as_ref(), scope, deployment_id)?);
            return Ok(report);
        }

        let mut halted = false;
        let mut idx = 0;
        while idx < candidates.len() {
            // One tier: every candidate sharing this dependency order.
            let order = candidates[idx].dependency_order;
            let end = candidates[idx..]
                .iter()
                .position(|r| r.dependency_order != order)
                .map_or(candidates.len(), |n| idx + n);
            let tier = &candidates[idx..end];

            if halted {
                for record in tier {
                    report.outcomes.push(SweepOutcome {
                        identity: record.identity.clone(),
                        dependency_order: record.dependency_order,
                        status: SweepStatus::NotAttempted,
                    });
                }
                idx = end;
                continue;
            }

            let results = join_all(tier.iter().map(|r| self.deleter.delete_external(r))).await;
            for (record, result) in tier.iter().zip(results) {
                let status = match result {
                    Ok(()) => {
                        self.store.delete(&record.identity)?;
                        tracing::info!(identity = %record.identity, order, "deleted resource");
                        SweepStatus::Deleted
                    }
                    Err(err) => {
                        tracing::warn!(identity = %record.identity, order, error = %err, "deletion failed; halting lower tiers");
                        halted = true;
                        SweepStatus::Failed {
                            reason: err.to_string(),
                        }
                    }
                };
                report.outcomes.push(SweepOutcome {
                    identity: record.identity.clone(),
                    dependency_order: record.dependency_order,
                    status,
                });
            }

            idx = end;
        }

        report.completed = !halted;
        tracing::info!(
            %deployment_id,
            scope = %scope,
            deleted = report.deleted(),
            failed = report.failed(),
            not_attempted = report.not_attempted(),
            "sweep finished"
        );
        Ok(report)
    }
}

/// Best-effort pre-flight checks over the candidate set.
///
/// Expects `candidates` sorted by dependency order (either direction).
fn collect_warnings(candidates: &[ResourceRecord]) -> Vec<SweepWarning> {
    let mut warnings = Vec::new();

    let mut idx = 0;
    while idx < candidates.len() {
        let order = candidates[idx].dependency_order;
        let end = candidates[idx..]
            .iter()
            .position(|r| r.dependency_order != order)
            .map_or(candidates.len(), |n| idx + n);
        if end - idx > 1 {
            let identities: Vec<ResourceId> =
                candidates[idx..end].iter().map(|r| r.identity.clone()).collect();
            tracing::warn!(
                dependency_order = order,
                count = identities.len(),
                "candidates share a dependency order; deletion within the tier is unsequenced"
            );
            warnings.push(SweepWarning::OrderingInconsistency {
                dependency_order: order,
                identities,
            });
        }
        idx = end;
    }

    for record in candidates {
        if !record.gc_enabled {
            tracing::warn!(
                identity = %record.identity,
                "candidate predates collection tracking; its ordering may be unsafe"
            );
            warnings.push(SweepWarning::UntrackedResource {
                identity: record.identity.clone(),
            });
        }
    }

    warnings
}
