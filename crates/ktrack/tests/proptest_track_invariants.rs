//! Property-based invariant tests for property tracking.
//!
//! 1. Tracking preserves every field's value and the object's key order
//! 2. Every tracked field has a handle holding the field's value
//! 3. Field writes and handle writes stay in sync
//! 4. Re-tracking always yields a fresh handle seeded with the current value
//! 5. Tracking one object never exposes handles on another

use std::collections::BTreeMap;

use ktrack::{ObjectRef, ObservableHandle, Reactive, Value, attach};
use proptest::prelude::*;

// ── Helpers ──────────────────────────────────────────────────────────

fn arb_fields() -> impl Strategy<Value = BTreeMap<String, i32>> {
    proptest::collection::btree_map("[a-z]{1,6}", any::<i32>(), 0..8)
}

fn build(fields: &BTreeMap<String, i32>) -> ObjectRef {
    ObjectRef::from_pairs(fields.iter().map(|(k, v)| (k.as_str(), Value::from(*v))))
}

#[derive(Debug, Clone)]
enum Op {
    FieldWrite(usize, i32),
    HandleWrite(usize, i32),
    Notify(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<usize>(), any::<i32>()).prop_map(|(i, v)| Op::FieldWrite(i, v)),
        (any::<usize>(), any::<i32>()).prop_map(|(i, v)| Op::HandleWrite(i, v)),
        any::<usize>().prop_map(Op::Notify),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1-2. Values, order and handles survive tracking
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn tracking_preserves_fields(fields in arb_fields()) {
        let ko = attach(Reactive);
        let obj = build(&fields);
        let target = Value::from(&obj);
        let before = obj.keys();

        ko.track(&target).unwrap();

        prop_assert_eq!(obj.keys(), before);
        for (name, value) in &fields {
            prop_assert_eq!(obj.get(name), Value::from(*value));
            let handle = ko.get_observable(&target, name).unwrap();
            prop_assert_eq!(handle.read(), Value::from(*value));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Writes stay in sync
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn writes_stay_in_sync(
        fields in arb_fields().prop_filter("non-empty", |f| !f.is_empty()),
        ops in proptest::collection::vec(arb_op(), 0..32),
    ) {
        let ko = attach(Reactive);
        let obj = build(&fields);
        let target = Value::from(&obj);
        ko.track(&target).unwrap();

        let names: Vec<&String> = fields.keys().collect();
        let mut model: BTreeMap<&str, i32> =
            fields.iter().map(|(k, v)| (k.as_str(), *v)).collect();

        for op in ops {
            match op {
                Op::FieldWrite(i, v) => {
                    let name = names[i % names.len()];
                    prop_assert!(obj.set(name, Value::from(v)));
                    model.insert(name, v);
                }
                Op::HandleWrite(i, v) => {
                    let name = names[i % names.len()];
                    ko.get_observable(&target, name).unwrap().write(Value::from(v));
                    model.insert(name, v);
                }
                Op::Notify(i) => {
                    ko.notify_mutated(&target, names[i % names.len()]);
                }
            }
        }

        for (name, value) in model {
            prop_assert_eq!(obj.get(name), Value::from(value));
            prop_assert_eq!(ko.get_observable(&target, name).unwrap().read(), Value::from(value));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Re-tracking
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn retracking_yields_fresh_seeded_handle(
        fields in arb_fields().prop_filter("non-empty", |f| !f.is_empty()),
        update in any::<i32>(),
    ) {
        let ko = attach(Reactive);
        let obj = build(&fields);
        let target = Value::from(&obj);
        ko.track(&target).unwrap();

        let name = fields.keys().next().unwrap();
        obj.set(name, Value::from(update));
        let first = ko.get_observable(&target, name).unwrap();

        ko.track_fields(&target, &[name]).unwrap();
        let second = ko.get_observable(&target, name).unwrap();

        prop_assert!(!first.same_handle(&second));
        prop_assert_eq!(second.read(), Value::from(update));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Isolation between objects
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn untracked_objects_stay_untracked(fields in arb_fields()) {
        let ko = attach(Reactive);
        let tracked = build(&fields);
        let other = build(&fields);
        ko.track(&Value::from(&tracked)).unwrap();

        let other_target = Value::from(&other);
        for name in fields.keys() {
            prop_assert!(ko.get_observable(&other_target, name).is_none());
        }
        prop_assert_eq!(other.own_property_names(), tracked.own_property_names());
    }
}
