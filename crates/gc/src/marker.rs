//! Marking — stamping put resources with the current deployment token

use std::collections::HashMap;
use std::sync::Arc;

use crate::allocator::OrderAllocator;
use crate::config::GcConfig;
use crate::error::Result;
use crate::record::{DeploymentId, ResourceId, ResourceRecord};
use crate::store::RecordStore;

/// Per-run marker.
///
/// The provisioning engine calls [`mark`](Marker::mark) once for every
/// successfully put resource, in put order. Marking independent identities
/// may run concurrently; the engine calls each identity at most once per
/// run (re-marking the same identity is idempotent but the collector does
/// not serialize racing marks on one identity itself — that atomicity is
/// the store's contract).
#[derive(Debug)]
pub struct Marker<S> {
    store: Arc<S>,
    allocator: OrderAllocator,
    deployment_id: DeploymentId,
}

impl<S: RecordStore> Marker<S> {
    /// Marker for a brand-new deployment run with a fresh token
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_deployment_id(store, DeploymentId::generate())
    }

    /// Marker for a run whose token was issued externally
    #[must_use]
    pub fn with_deployment_id(store: Arc<S>, deployment_id: DeploymentId) -> Self {
        Self {
            store,
            allocator: OrderAllocator::new(),
            deployment_id,
        }
    }

    /// The token this run stamps onto every marked resource
    #[must_use]
    pub fn deployment_id(&self) -> DeploymentId {
        self.deployment_id
    }

    /// Stamp one put resource with the run's deployment token.
    ///
    /// The first mark of an identity in this run assigns the run's next
    /// dependency order slot (put order, counting from zero), so a resource
    /// always sits strictly above everything it could have depended on.
    /// Marking the same identity again within the run refreshes the record
    /// without consuming another slot. Caller-supplied attributes replace
    /// the stored ones: the provisioning engine owns attribute truth.
    pub fn mark(
        &self,
        identity: ResourceId,
        attributes: HashMap<String, String>,
        config: &GcConfig,
    ) -> Result<ResourceRecord> {
        let dependency_order = match self.store.get(&identity)? {
            // Already marked this run: idempotent, keep the assigned slot.
            Some(existing) if existing.deployment_id == self.deployment_id => {
                existing.dependency_order
            }
            // New resource, or a survivor from a previous run: either way it
            // was just put, so it takes this run's next slot.
            _ => self.allocator.allocate(),
        };

        let record = ResourceRecord {
            identity,
            attributes,
            dependency_order,
            deployment_id: self.deployment_id,
            gc_enabled: config.support_gc,
        };
        self.store.put(record.clone())?;

        tracing::debug!(
            identity = %record.identity,
            deployment_id = %self.deployment_id,
            dependency_order,
            "marked resource"
        );
        Ok(record)
    }

    /// How many resources this run has marked so far
    #[must_use]
    pub fn marked(&self) -> i64 {
        self.allocator.allocated()
    }
}
