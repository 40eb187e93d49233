//! Record store contract and the in-memory reference implementation

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::record::{ResourceId, ResourceRecord};

/// Persistent mapping from resource identity to its metadata.
///
/// The store exclusively owns all records; every other component reads and
/// requests mutations through this interface and caches nothing across a
/// pass boundary. Implementations must make per-record read-modify-write
/// linearizable per identity so concurrent marking cannot lose updates.
pub trait RecordStore: Send + Sync {
    /// Fetch the record under `identity`, if any
    fn get(&self, identity: &ResourceId) -> Result<Option<ResourceRecord>>;

    /// Insert or replace the record under its identity
    fn put(&self, record: ResourceRecord) -> Result<()>;

    /// Remove the record under `identity` entirely.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if no record exists under `identity`.
    fn delete(&self, identity: &ResourceId) -> Result<()>;

    /// All records satisfying `predicate`, in ascending dependency order.
    ///
    /// The ordering guarantee is part of the contract: pass computations
    /// (candidate selection, order repair) rely on it for determinism.
    fn query(&self, predicate: &dyn Fn(&ResourceRecord) -> bool) -> Result<Vec<ResourceRecord>>;
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<ResourceId, ResourceRecord>,
    /// Explicit ordered index: dependency order -> identities at that order.
    ///
    /// Kept separately from the record map so the order is independently
    /// queryable and bulk-mutable during repair, rather than an artifact of
    /// insertion order.
    by_order: BTreeMap<i64, BTreeSet<ResourceId>>,
}

impl Inner {
    fn unindex(&mut self, order: i64, identity: &ResourceId) {
        if let Some(ids) = self.by_order.get_mut(&order) {
            ids.remove(identity);
            if ids.is_empty() {
                self.by_order.remove(&order);
            }
        }
    }
}

/// In-memory [`RecordStore`].
///
/// A single lock covers the record map and the order index so the two can
/// never disagree. Suited to tests and single-process deployments; durable
/// backends implement the same trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Whether the store holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// The greatest dependency order currently stored, if any record exists
    #[must_use]
    pub fn max_dependency_order(&self) -> Option<i64> {
        self.inner.read().by_order.keys().next_back().copied()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, identity: &ResourceId) -> Result<Option<ResourceRecord>> {
        Ok(self.inner.read().records.get(identity).cloned())
    }

    fn put(&self, record: ResourceRecord) -> Result<()> {
        let mut inner = self.inner.write();
        let old_order = inner
            .records
            .get(&record.identity)
            .map(|previous| previous.dependency_order);
        if let Some(old_order) = old_order
            && old_order != record.dependency_order
        {
            inner.unindex(old_order, &record.identity);
        }
        inner
            .by_order
            .entry(record.dependency_order)
            .or_default()
            .insert(record.identity.clone());
        inner.records.insert(record.identity.clone(), record);
        Ok(())
    }

    fn delete(&self, identity: &ResourceId) -> Result<()> {
        let mut inner = self.inner.write();
        let Some(record) = inner.records.remove(identity) else {
            return Err(Error::NotFound {
                identity: identity.to_string(),
            });
        };
        inner.unindex(record.dependency_order, identity);
        Ok(())
    }

    fn query(&self, predicate: &dyn Fn(&ResourceRecord) -> bool) -> Result<Vec<ResourceRecord>> {
        let inner = self.inner.read();
        let mut matched = Vec::new();
        for ids in inner.by_order.values() {
            for id in ids {
                // records and by_order are maintained under one lock
                let record = &inner.records[id];
                if predicate(record) {
                    matched.push(record.clone());
                }
            }
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DeploymentId;

    fn record(id: &str, order: i64) -> ResourceRecord {
        ResourceRecord {
            identity: ResourceId::new(id),
            attributes: HashMap::new(),
            dependency_order: order,
            deployment_id: DeploymentId::generate(),
            gc_enabled: true,
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = MemoryStore::new();
        let rec = record("a", 1);
        store.put(rec.clone()).unwrap();
        assert_eq!(store.get(&ResourceId::new("a")).unwrap(), Some(rec));
    }

    #[test]
    fn get_missing_returns_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get(&ResourceId::new("nope")).unwrap(), None);
    }

    #[test]
    fn delete_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.delete(&ResourceId::new("nope")).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn query_returns_ascending_dependency_order() {
        let store = MemoryStore::new();
        store.put(record("c", 30)).unwrap();
        store.put(record("a", 10)).unwrap();
        store.put(record("b", 20)).unwrap();

        let all = store.query(&|_| true).unwrap();
        let orders: Vec<i64> = all.iter().map(|r| r.dependency_order).collect();
        assert_eq!(orders, vec![10, 20, 30]);
    }

    #[test]
    fn reput_with_new_order_moves_index_entry() {
        let store = MemoryStore::new();
        store.put(record("a", 1)).unwrap();
        store.put(record("b", 2)).unwrap();

        let mut moved = record("a", 9);
        moved.gc_enabled = false;
        store.put(moved).unwrap();

        let all = store.query(&|_| true).unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(store.max_dependency_order(), Some(9));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn delete_prunes_the_order_index() {
        let store = MemoryStore::new();
        store.put(record("a", 5)).unwrap();
        store.delete(&ResourceId::new("a")).unwrap();
        assert_eq!(store.max_dependency_order(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn records_sharing_an_order_are_both_returned() {
        let store = MemoryStore::new();
        store.put(record("a", 1)).unwrap();
        store.put(record("b", 1)).unwrap();
        assert_eq!(store.query(&|_| true).unwrap().len(), 2);
    }
}
