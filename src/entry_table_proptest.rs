#![cfg(test)]

// Property tests for EntryTable kept inside the crate so they can reach the
// internal module.

use crate::entry_table::{EntryId, EntryTable};
use crate::key::ResourceKey;
use crate::state::{EntryState, ResourcePolicy};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

#[derive(Clone, Debug)]
enum Op {
    Touch(usize),
    Acquire(usize),
    Release(usize),
    Seal(usize),
    Pin(usize),
    Sweep,
}

#[derive(Clone, Debug, Default)]
struct ModelEntry {
    refs: usize,
    sealed: bool,
    resident: bool,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let idx = 0usize..6;
    let op = prop_oneof![
        idx.clone().prop_map(Op::Touch),
        idx.clone().prop_map(Op::Acquire),
        idx.clone().prop_map(Op::Release),
        idx.clone().prop_map(Op::Seal),
        idx.clone().prop_map(Op::Pin),
        Just(Op::Sweep),
    ];
    proptest::collection::vec(op, 1..80)
}

fn key(i: usize) -> ResourceKey {
    ResourceKey::new(&format!("res{}", i))
}

// Property: state-machine equivalence against a HashMap model.
// Invariants exercised across random operation sequences:
// - At most one entry per key; ids are stable while the entry lives.
// - Reference counts match the model after every step.
// - `sweep` removes exactly the entries with zero references that are
//   neither Final nor Resident, and nothing else.
// - `len` and `contains_key` agree with the model after each op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_sweep_matches_model(ops in arb_ops()) {
        let mut sut: EntryTable<u32> = EntryTable::new();
        let mut model: HashMap<usize, ModelEntry> = HashMap::new();
        let mut ids: HashMap<usize, EntryId> = HashMap::new();

        for op in ops {
            match op {
                Op::Touch(i) => {
                    let (id, _) = sut.find_or_insert(key(i));
                    if let Some(prev) = ids.insert(i, id) {
                        prop_assert_eq!(prev, id, "id must be stable while the entry lives");
                    }
                    model.entry(i).or_default();
                }
                Op::Acquire(i) => {
                    let (id, entry) = sut.find_or_insert(key(i));
                    entry.refcount.increment();
                    ids.insert(i, id);
                    model.entry(i).or_default().refs += 1;
                }
                Op::Release(i) => {
                    if let Some(m) = model.get_mut(&i) {
                        if m.refs > 0 {
                            let id = ids[&i];
                            sut.get(id).unwrap().refcount.decrement();
                            m.refs -= 1;
                        }
                    }
                }
                Op::Seal(i) => {
                    let (id, entry) = sut.find_or_insert(key(i));
                    entry.state = EntryState::Final;
                    entry.data = Some(Rc::new(i as u32));
                    ids.insert(i, id);
                    model.entry(i).or_default().sealed = true;
                }
                Op::Pin(i) => {
                    let (id, entry) = sut.find_or_insert(key(i));
                    entry.policy = ResourcePolicy::Resident;
                    ids.insert(i, id);
                    model.entry(i).or_default().resident = true;
                }
                Op::Sweep => {
                    let removed: BTreeSet<ResourceKey> =
                        sut.sweep().into_iter().map(|e| e.key).collect();
                    let expected: BTreeSet<ResourceKey> = model
                        .iter()
                        .filter(|(_, m)| m.refs == 0 && !m.sealed && !m.resident)
                        .map(|(i, _)| key(*i))
                        .collect();
                    prop_assert_eq!(&removed, &expected);
                    model.retain(|_, m| m.refs > 0 || m.sealed || m.resident);
                    ids.retain(|i, _| model.contains_key(i));
                }
            }

            prop_assert_eq!(sut.len(), model.len());
            for i in 0..6 {
                prop_assert_eq!(sut.contains_key(key(i)), model.contains_key(&i));
                if let Some(m) = model.get(&i) {
                    let e = sut.entry(key(i)).unwrap();
                    prop_assert_eq!(e.refcount.get(), m.refs);
                }
            }
        }
    }
}
