//! Property tests for the order-repair pass and run-local order allocation.
//!
//! Verifies the structural guarantees the sweep relies on:
//! - the repair shift is uniform, so relative order within the kept set is
//!   preserved
//! - the smallest kept order lands exactly on k, strictly above the marked
//!   band 0..k-1
//! - marked and out-of-scope records are never modified
//! - within a run, put order and dependency order coincide

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use proptest::prelude::*;

use stratus_gc::{
    DeploymentId, GcConfig, GcScope, Marker, MemoryStore, RecordStore, ResourceId,
    ResourceRecord, repair_order,
};

fn record(id: &str, order: i64, deployment_id: DeploymentId, manager: &str) -> ResourceRecord {
    let mut attributes = HashMap::new();
    attributes.insert("manager".to_string(), manager.to_string());
    ResourceRecord {
        identity: ResourceId::new(id),
        attributes,
        dependency_order: order,
        deployment_id,
        gc_enabled: true,
    }
}

/// Distinct stale orders for the kept (unmarked, in-scope) records. Negative
/// values are legal: earlier repairs can shift orders below zero.
fn arb_kept_orders() -> impl Strategy<Value = BTreeSet<i64>> {
    proptest::collection::btree_set(-20i64..50, 0..6)
}

fn arb_foreign_orders() -> impl Strategy<Value = BTreeSet<i64>> {
    proptest::collection::btree_set(-20i64..50, 0..4)
}

proptest! {
    #[test]
    fn repair_shift_is_uniform_and_lands_on_the_band_edge(
        marked_count in 0usize..5,
        kept_orders in arb_kept_orders(),
        foreign_orders in arb_foreign_orders(),
    ) {
        let store = MemoryStore::new();
        let current = DeploymentId::generate();
        let stale = DeploymentId::generate();

        for i in 0..marked_count {
            store.put(record(&format!("m{i}"), i as i64, current, "mod1")).unwrap();
        }
        for (n, order) in kept_orders.iter().enumerate() {
            store.put(record(&format!("u{n}"), *order, stale, "mod1")).unwrap();
        }
        for (n, order) in foreign_orders.iter().enumerate() {
            store.put(record(&format!("o{n}"), *order, stale, "mod2")).unwrap();
        }

        let repair = repair_order(&store, &GcScope::manager("mod1"), current).unwrap();

        let k = marked_count as i64;
        if kept_orders.is_empty() {
            prop_assert_eq!(repair.shifted, 0);
            prop_assert_eq!(repair.delta, 0);
        } else {
            let m = *kept_orders.iter().next().unwrap();
            let expected_delta = k - m;

            // Every kept record moved by exactly k - m.
            let mut new_orders = Vec::new();
            for (n, order) in kept_orders.iter().enumerate() {
                let rec = store.get(&ResourceId::new(format!("u{n}"))).unwrap().unwrap();
                prop_assert_eq!(rec.dependency_order, order + expected_delta);
                new_orders.push(rec.dependency_order);
            }

            // Uniform shift: relative order within the kept set is intact.
            let mut sorted = new_orders.clone();
            sorted.sort_unstable();
            prop_assert_eq!(&new_orders, &sorted);

            // The smallest kept order lands exactly on k, strictly above the
            // marked band 0..k-1.
            prop_assert_eq!(sorted[0], k);
            for i in 0..marked_count {
                let marked = store.get(&ResourceId::new(format!("m{i}"))).unwrap().unwrap();
                prop_assert!(marked.dependency_order < sorted[0]);
            }
        }

        // Marked records keep their slots; foreign managers are untouched.
        for i in 0..marked_count {
            let rec = store.get(&ResourceId::new(format!("m{i}"))).unwrap().unwrap();
            prop_assert_eq!(rec.dependency_order, i as i64);
        }
        for (n, order) in foreign_orders.iter().enumerate() {
            let rec = store.get(&ResourceId::new(format!("o{n}"))).unwrap().unwrap();
            prop_assert_eq!(rec.dependency_order, *order);
        }
    }

    #[test]
    fn repair_is_stable_for_an_already_repaired_store(
        marked_count in 1usize..5,
        kept_orders in arb_kept_orders(),
    ) {
        // Running repair twice must not move anything the second time: after
        // the first pass min(U) == k, so the next delta is zero.
        let store = MemoryStore::new();
        let current = DeploymentId::generate();
        let stale = DeploymentId::generate();

        for i in 0..marked_count {
            store.put(record(&format!("m{i}"), i as i64, current, "mod1")).unwrap();
        }
        for (n, order) in kept_orders.iter().enumerate() {
            store.put(record(&format!("u{n}"), *order, stale, "mod1")).unwrap();
        }

        repair_order(&store, &GcScope::manager("mod1"), current).unwrap();
        let snapshot = store.query(&|_| true).unwrap();

        let second = repair_order(&store, &GcScope::manager("mod1"), current).unwrap();
        prop_assert_eq!(second.delta, 0);
        prop_assert_eq!(store.query(&|_| true).unwrap(), snapshot);
    }

    #[test]
    fn put_order_and_dependency_order_coincide_within_a_run(
        count in 1usize..20,
    ) {
        let store = Arc::new(MemoryStore::new());
        let marker = Marker::new(Arc::clone(&store));
        let config = GcConfig::for_manager("mod1");

        let mut attrs = HashMap::new();
        attrs.insert("manager".to_string(), "mod1".to_string());

        for n in 0..count {
            let rec = marker
                .mark(ResourceId::new(format!("r{n}")), attrs.clone(), &config)
                .unwrap();
            prop_assert_eq!(rec.dependency_order, n as i64);
        }

        // The store's ordered view reflects creation order.
        let all = store.query(&|_| true).unwrap();
        let ids: Vec<String> = all.iter().map(|r| r.identity.to_string()).collect();
        let expected: Vec<String> = (0..count).map(|n| format!("r{n}")).collect();
        prop_assert_eq!(ids, expected);
    }
}
