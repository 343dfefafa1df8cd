#![cfg(test)]

// Property tests for BucketTable kept inside the crate so they can drive it
// with controlled hashers and check its structural invariants directly.

use crate::bucket_table::test_hashers::ConstBuildHasher;
use crate::bucket_table::BucketTable;
use core::hash::BuildHasher;
use proptest::prelude::*;
use std::collections::hash_map::RandomState;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    RetainEven,
    Clear,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=40).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            8 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            3 => idx.clone().prop_map(OpI::Get),
            2 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::RetainEven),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against std::collections::HashMap.
// Invariants exercised after every op:
// - insert returns the replaced value; overwrite leaves len and version put.
// - get/contains_key parity with the model; borrowed `&str` lookups agree.
// - remove returns the model's value; structural ops strictly bump version.
// - iter yields each live entry exactly once.
// - every entry sits at `hash & (cap - 1)`, chains are acyclic, len < threshold.
fn run_state_machine<S: BuildHasher>(
    mut sut: BucketTable<Key, i32, S>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();

    for op in ops {
        let before = sut.version();
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(&pool, i);
                let prev = sut.insert(k.clone(), v);
                let mprev = model.insert(k, v);
                prop_assert_eq!(prev, mprev);
                if mprev.is_some() {
                    prop_assert_eq!(sut.version(), before, "overwrite must not be structural");
                } else {
                    prop_assert!(sut.version() > before);
                }
            }
            OpI::Remove(i) => {
                let k = key_from(&pool, i);
                let got = sut.remove_entry(&k);
                let want = model.remove(&k);
                prop_assert_eq!(got.as_ref().map(|(_, v)| *v), want);
                if let Some((kk, _)) = got {
                    prop_assert!(kk == k);
                    prop_assert_eq!(sut.version(), before + 1);
                } else {
                    prop_assert_eq!(sut.version(), before);
                }
            }
            OpI::Get(i) => {
                let k = key_from(&pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
                prop_assert_eq!(sut.get(k.0.as_str()), model.get(&k));
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(vr) = sut.get_mut(&k) {
                    *vr = vr.wrapping_add(d);
                    let mv = model.get_mut(&k).expect("model tracks live key");
                    *mv = mv.wrapping_add(d);
                } else {
                    prop_assert!(!model.contains_key(&k));
                }
                prop_assert_eq!(sut.version(), before);
            }
            OpI::RetainEven => {
                sut.retain(|_, v| *v % 2 == 0);
                let dropped = model.values().filter(|v| **v % 2 != 0).count() as u64;
                model.retain(|_, v| *v % 2 == 0);
                prop_assert_eq!(sut.version(), before + dropped);
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
                prop_assert!(sut.version() > before);
            }
            OpI::Iterate => {
                let s: BTreeMap<_, _> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(s.len(), sut.len(), "iter yielded a duplicate");
                let m: BTreeMap<_, _> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(s, m);
            }
        }

        sut.check_invariants();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.version() >= before);
    }

    let s_keys: BTreeSet<_> = sut.iter().map(|(k, _)| k.clone()).collect();
    let m_keys: BTreeSet<_> = model.keys().cloned().collect();
    prop_assert_eq!(s_keys, m_keys);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(BucketTable::with_hasher(RandomState::new()), pool, ops)?;
    }
}

// Same invariants under worst-case collisions (constant hasher): one chain
// holds every entry, so removal and resize relink it on every step.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(BucketTable::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}

// Growth: for any number of distinct inserts, capacity is the smallest power
// of two (>= 16) whose threshold exceeds len, and every key is retrievable.
proptest! {
    #[test]
    fn prop_capacity_is_minimal(n in 1usize..3_000) {
        let mut t: BucketTable<usize, usize> = BucketTable::with_hasher(RandomState::new());
        for k in 0..n {
            t.insert(k, k * 2);
        }
        let cap = t.capacity();
        prop_assert!(cap.is_power_of_two());
        prop_assert!(n < cap / 4 * 3);
        prop_assert!(cap == 16 || n >= cap / 8 * 3, "table grew too early");
        for k in 0..n {
            prop_assert_eq!(t.get(&k), Some(&(k * 2)));
        }
        t.check_invariants();
    }
}
