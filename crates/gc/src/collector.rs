//! Collector façade tying marking and sweeping to one store and deleter

use std::sync::Arc;

use crate::config::GcConfig;
use crate::error::Result;
use crate::marker::Marker;
use crate::record::DeploymentId;
use crate::store::RecordStore;
use crate::sweep::{Deleter, SweepEngine, SweepReport};

/// Entry point for deployment runs.
///
/// Owns the record store and the external deletion collaborator, and hands
/// out per-run [`Marker`]s. A run is: [`begin`](Collector::begin), mark every
/// put resource, then [`collect`](Collector::collect) exactly once after all
/// marking has completed. The collector assumes at most one active run per
/// scope; callers serialize overlapping scopes externally.
#[derive(Debug)]
pub struct Collector<S, D> {
    store: Arc<S>,
    engine: SweepEngine<S, D>,
}

impl<S: RecordStore, D: Deleter> Collector<S, D> {
    /// Collector over the given store and deletion collaborator
    #[must_use]
    pub fn new(store: Arc<S>, deleter: Arc<D>) -> Self {
        let engine = SweepEngine::new(Arc::clone(&store), deleter);
        Self { store, engine }
    }

    /// Start a deployment run with a fresh deployment token
    #[must_use]
    pub fn begin(&self) -> Marker<S> {
        let marker = Marker::new(Arc::clone(&self.store));
        tracing::debug!(deployment_id = %marker.deployment_id(), "began deployment run");
        marker
    }

    /// Start a deployment run under an externally issued token
    #[must_use]
    pub fn begin_with(&self, deployment_id: DeploymentId) -> Marker<S> {
        Marker::with_deployment_id(Arc::clone(&self.store), deployment_id)
    }

    /// Close out a run: sweep unmarked in-scope resources, or repair their
    /// ordering when the pass runs dry
    pub async fn collect(
        &self,
        config: &GcConfig,
        deployment_id: DeploymentId,
    ) -> Result<SweepReport> {
        self.engine.sweep(config, deployment_id).await
    }

    /// The record store this collector operates on
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}
