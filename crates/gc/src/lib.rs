//! # Stratus GC
//!
//! Dependency-ordered mark-and-sweep collection for externally provisioned
//! resources. Each deployment run stamps every put resource with a fresh
//! deployment token; when provisioning finishes, the sweep deletes the
//! in-scope resources the run did not stamp, dependents before dependencies,
//! using an integral dependency order as a cheap surrogate for the resource
//! dependency graph.

pub mod allocator;
pub mod collector;
pub mod config;
pub mod error;
pub mod marker;
pub mod record;
pub mod scope;
pub mod store;
pub mod sweep;

pub use allocator::{OrderAllocator, OrderRepair, repair_order};
pub use collector::Collector;
pub use config::GcConfig;
pub use error::{Error, Result};
pub use marker::Marker;
pub use record::{DeploymentId, ResourceId, ResourceRecord};
pub use scope::GcScope;
pub use store::{MemoryStore, RecordStore};
pub use sweep::{Deleter, SweepEngine, SweepOutcome, SweepReport, SweepStatus, SweepWarning};
