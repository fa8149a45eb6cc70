use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
enum Op {
    Put(Vec<u8>, u64),
    Remove(Vec<u8>),
    Get(Vec<u8>),
    Prefix(Vec<u8>),
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // Keys that differ only by trailing 0x00 bytes are the same key at the bit
    // level, which a BTreeMap does not model.
    prop::collection::vec(any::<u8>(), 0..=64).prop_map(trimmed)
}

/// Short keys over a tiny alphabet, so that shared prefixes are common.
fn dense_key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    prop::collection::vec(prop::sample::select(vec![b'a', b'b', 0x80, 0xff]), 0..=6)
}

/// Keys over an alphabet that includes `0x00`, so NUL bytes sit inside keys
/// and at the end of prefixes.
fn nul_key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    prop::collection::vec(prop::sample::select(vec![0x00, b'a', 0x80]), 0..=6)
}

/// Drops trailing `0x00` bytes, which are padding to the tree.
fn trimmed(mut key: Vec<u8>) -> Vec<u8> {
    while key.last() == Some(&0) {
        key.pop();
    }
    key
}

fn ops_strategy(key: impl Strategy<Value = Vec<u8>> + Clone) -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        50 => (key.clone().prop_map(trimmed), any::<u64>()).prop_map(|(k, v)| Op::Put(k, v)),
        25 => key.clone().prop_map(trimmed).prop_map(Op::Remove),
        20 => key.clone().prop_map(trimmed).prop_map(Op::Get),
        5 => key.prop_map(Op::Prefix),
    ];
    prop::collection::vec(op, 0..=1000)
}

fn expected_prefix(m: &BTreeMap<Vec<u8>, u64>, prefix: &[u8]) -> Vec<(Vec<u8>, u64)> {
    m.iter()
        .filter(|(k, _)| {
            prefix
                .iter()
                .enumerate()
                .all(|(i, b)| k.get(i).copied().unwrap_or(0) == *b)
        })
        .map(|(k, v)| (k.clone(), *v))
        .collect()
}

fn entries<'a>(it: impl Iterator<Item = (&'a Vec<u8>, &'a u64)>) -> Vec<(Vec<u8>, u64)> {
    it.map(|(k, v)| (k.clone(), *v)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        max_shrink_iters: 20_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_mutable_equivalence(ops in ops_strategy(key_strategy())) {
        let mut t: MCritBitTree<Vec<u8>, u64> = MCritBitTree::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Put(key, value) => {
                    let old_t = t.put(key.clone(), value);
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Remove(key) => {
                    let old_t = t.remove(key.as_slice());
                    let old_m = m.remove(key.as_slice());
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(key.as_slice()), m.get(key.as_slice()));
                }
                Op::Prefix(prefix) => {
                    prop_assert_eq!(entries(t.prefix_iter(prefix.as_slice())), expected_prefix(&m, &prefix));
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        prop_assert_eq!(t.validate(), Ok(()));
        prop_assert_eq!(entries(t.iter()), entries(m.iter()));
        prop_assert_eq!(t.min(), m.iter().next());
        prop_assert_eq!(t.max(), m.iter().next_back());
    }

    #[test]
    fn prop_persistent_equivalence(ops in ops_strategy(dense_key_strategy())) {
        let mut t: CritBitTree<Vec<u8>, u64> = CritBitTree::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Put(key, value) => {
                    let (next, old_t) = t.put(key.clone(), value);
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_t, old_m);
                    t = next;
                }
                Op::Remove(key) => {
                    let (next, old_t) = t.remove(key.as_slice());
                    let old_m = m.remove(key.as_slice());
                    prop_assert_eq!(old_t, old_m);
                    t = next;
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(key.as_slice()), m.get(key.as_slice()));
                }
                Op::Prefix(prefix) => {
                    let mut got = Vec::new();
                    t.traverse_with_prefix(prefix.as_slice(), |k, v| {
                        got.push((k.clone(), *v));
                        Decision::Continue
                    });
                    prop_assert_eq!(got, expected_prefix(&m, &prefix));
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        prop_assert_eq!(t.validate(), Ok(()));
        prop_assert_eq!(entries(t.iter()), entries(m.iter()));
    }

    #[test]
    fn prop_nul_bytes_match_btreemap(ops in ops_strategy(nul_key_strategy())) {
        let mut p: CritBitTree<Vec<u8>, u64> = CritBitTree::new();
        let mut t: MCritBitTree<Vec<u8>, u64> = MCritBitTree::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Put(key, value) => {
                    let (next, old_p) = p.put(key.clone(), value);
                    prop_assert_eq!(t.put(key.clone(), value), old_p);
                    prop_assert_eq!(m.insert(key, value), old_p);
                    p = next;
                }
                Op::Remove(key) => {
                    let (next, old_p) = p.remove(key.as_slice());
                    prop_assert_eq!(t.remove(key.as_slice()), old_p);
                    prop_assert_eq!(m.remove(key.as_slice()), old_p);
                    p = next;
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(key.as_slice()), m.get(key.as_slice()));
                    prop_assert_eq!(p.get(key.as_slice()), m.get(key.as_slice()));
                }
                Op::Prefix(prefix) => {
                    let expected = expected_prefix(&m, &prefix);
                    prop_assert_eq!(entries(t.prefix_iter(prefix.as_slice())), expected.clone());
                    prop_assert_eq!(entries(p.prefix_iter(prefix.as_slice())), expected);
                }
            }
        }

        prop_assert_eq!(t.validate(), Ok(()));
        prop_assert_eq!(p.validate(), Ok(()));
        prop_assert_eq!(entries(t.iter()), entries(m.iter()));
    }

    #[test]
    fn prop_variants_agree(ops in ops_strategy(dense_key_strategy())) {
        let mut p: CritBitTree<Vec<u8>, u64> = CritBitTree::new();
        let mut t: MCritBitTree<Vec<u8>, u64> = MCritBitTree::with_config(
            ByteAnalyzer,
            Config { check_invariants: true, ..Config::default() },
        );

        for op in ops {
            match op {
                Op::Put(key, value) => {
                    let (next, old_p) = p.put(key.clone(), value);
                    prop_assert_eq!(old_p, t.put(key, value));
                    p = next;
                }
                Op::Remove(key) => {
                    let (next, old_p) = p.remove(key.as_slice());
                    prop_assert_eq!(old_p, t.remove(key.as_slice()));
                    p = next;
                }
                Op::Get(_) | Op::Prefix(_) => {}
            }
        }

        prop_assert_eq!(entries(p.iter()), entries(t.iter()));
    }

    #[test]
    fn prop_snapshots_are_isolated(
        base in prop::collection::btree_map(dense_key_strategy(), any::<u64>(), 0..=64),
        ops in ops_strategy(dense_key_strategy()),
    ) {
        let snapshot: CritBitTree<Vec<u8>, u64> = base.clone().into_iter().collect();
        let mut t = snapshot.clone();
        for op in ops {
            t = match op {
                Op::Put(key, value) => t.insert(key, value),
                Op::Remove(key) => t.without(key.as_slice()),
                Op::Get(_) | Op::Prefix(_) => t,
            };
        }

        prop_assert_eq!(snapshot.len(), base.len());
        prop_assert_eq!(entries(snapshot.iter()), entries(base.iter()));
        prop_assert_eq!(snapshot.validate(), Ok(()));
    }

    #[test]
    fn prop_traverse_mut_matches_retain(
        base in prop::collection::btree_map(key_strategy(), any::<u64>(), 0..=200),
    ) {
        let mut t: MCritBitTree<Vec<u8>, u64> = base.clone().into_iter().collect();
        t.retain(|_, v| *v % 3 != 0);
        let mut m = base;
        m.retain(|_, v| *v % 3 != 0);

        prop_assert_eq!(t.validate(), Ok(()));
        prop_assert_eq!(entries(t.iter()), entries(m.iter()));
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn small_set() -> Vec<&'static str> {
    vec!["a", "b", "c", "aa", "ab", "ba"]
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = small_set();
    let mut sorted = keys.clone();
    sorted.sort();

    for_each_permutation(&keys, |perm| {
        let mut t: MCritBitTree<&str, usize> = MCritBitTree::new();
        let mut p: CritBitTree<&str, usize> = CritBitTree::new();
        for k in perm {
            t.put(k, k.len());
            p = p.insert(k, k.len());
        }

        t.validate().unwrap();
        p.validate().unwrap();
        let got: Vec<&str> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(got, sorted);
        let got: Vec<&str> = p.iter().map(|(k, _)| *k).collect();
        assert_eq!(got, sorted);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_set();

    // Insert in a fixed order, then remove in all permutations.
    let base_mutable: MCritBitTree<&str, usize> = keys.iter().map(|k| (*k, k.len())).collect();
    let base_persistent: CritBitTree<&str, usize> = keys.iter().map(|k| (*k, k.len())).collect();

    for_each_permutation(&keys, |perm| {
        let mut t = base_mutable.clone();
        let mut p = base_persistent.clone();
        let mut live: BTreeMap<&str, usize> = keys.iter().map(|k| (*k, k.len())).collect();

        for k in perm {
            let (next, old) = p.remove(k);
            assert_eq!(old, live.get(k).copied());
            assert_eq!(t.remove(k), live.remove(k));
            p = next;

            assert_eq!(t.len(), live.len());
            assert_eq!(p.len(), live.len());
            t.validate().unwrap();
            p.validate().unwrap();
        }
        assert!(t.is_empty());
        assert!(p.is_empty());
        assert_eq!(t.min(), None);
    });

    // The base snapshot is unaffected by all of the above.
    assert_eq!(base_persistent.len(), keys.len());
}

const SCENARIO: [&str; 19] = [
    "u", "un", "uni", "unin", "uninc", "unind", "unindd", "uninde", "unindew", "unindex",
    "unindey", "unindf", "unine", "unio", "unim", "unh", "unj", "a", "z",
];

const UNIN: [&str; 10] = [
    "unin", "uninc", "unind", "unindd", "uninde", "unindew", "unindex", "unindey", "unindf",
    "unine",
];

/// Takes values longer than five bytes, stopping after the third.
fn long_values_cursor<'a>(
    out: &'a mut Vec<&'static str>,
) -> impl FnMut(&&'static str, &&'static str) -> Decision + 'a {
    move |_: &&'static str, v: &&'static str| {
        if v.len() > 5 {
            out.push(*v);
            if out.len() == 3 {
                return Decision::Exit;
            }
        }
        Decision::Continue
    }
}

#[test]
fn scenario_mutable() {
    let mut t: MCritBitTree<&str, &str> = MCritBitTree::new();
    for k in SCENARIO {
        assert_eq!(t.put(k, k), None);
    }
    t.validate().unwrap();
    assert_eq!(t.len(), SCENARIO.len());
    assert_eq!(t.min(), Some((&"a", &"a")));
    assert_eq!(t.max(), Some((&"z", &"z")));

    let got: Vec<&str> = t.prefix_iter("unin").map(|(k, _)| *k).collect();
    assert_eq!(got, UNIN);

    let mut taken = Vec::new();
    t.traverse_with_prefix("unin", long_values_cursor(&mut taken));
    assert_eq!(taken, ["unindd", "uninde", "unindew"]);

    for k in UNIN {
        assert_eq!(t.remove(k), Some(k));
        t.validate().unwrap();
    }
    assert_eq!(t.len(), 9);
    for k in SCENARIO.iter().filter(|k| !UNIN.contains(*k)) {
        assert_eq!(t.get(k), Some(k));
    }
    assert_eq!(t.prefix_iter("unin").count(), 0);
}

#[test]
fn scenario_persistent() {
    let t: CritBitTree<&str, &str> = SCENARIO.iter().map(|k| (*k, *k)).collect();
    t.validate().unwrap();
    assert_eq!(t.min(), Some((&"a", &"a")));
    assert_eq!(t.max(), Some((&"z", &"z")));

    let mut taken = Vec::new();
    t.traverse_with_prefix("unin", long_values_cursor(&mut taken));
    assert_eq!(taken, ["unindd", "uninde", "unindew"]);

    let pruned = UNIN.iter().fold(t.clone(), |acc, k| acc.without(k));
    pruned.validate().unwrap();
    assert_eq!(pruned.len(), 9);
    assert_eq!(pruned.prefix_iter("unin").count(), 0);
    let mut left = Vec::new();
    pruned.traverse(|k, _| {
        left.push(*k);
        Decision::Continue
    });
    assert_eq!(left, ["a", "u", "un", "unh", "uni", "unim", "unio", "unj", "z"]);

    // The original still has everything.
    assert_eq!(t.len(), SCENARIO.len());
    let got: Vec<&str> = t.prefix_iter("unin").map(|(k, _)| *k).collect();
    assert_eq!(got, UNIN);
}
