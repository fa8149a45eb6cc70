//! Exact-match and closest-leaf descent, shared by both variants.

use std::borrow::Borrow;

use crate::key::KeyAnalyzer;
use crate::node::{Child, Leaf, NodeSource, Side, Slot};

/// Follows `key`'s bits from `root` down to a leaf without comparing keys.
///
/// The reached leaf shares the longest bit prefix with `key` among all stored
/// keys, which makes it the leaf to compare against when inserting.
pub(crate) fn closest_leaf<'a, K, V, S, Q, A>(
    source: &'a S,
    root: &'a Slot<K, V, S::Link>,
    key: &Q,
    analyzer: &A,
) -> &'a Leaf<K, V>
where
    S: NodeSource<K, V>,
    Q: ?Sized,
    A: KeyAnalyzer<Q>,
{
    let mut child = root.as_child();
    loop {
        match child {
            Child::Leaf(leaf) => return leaf,
            Child::Node(link) => {
                let node = source.resolve(link);
                child = node.child(Side::of(analyzer.is_bit_set(key, node.bit())));
            }
        }
    }
}

/// The leaf stored under `key`, if any. Compares keys exactly once.
pub(crate) fn find<'a, K, V, S, Q, A>(
    source: &'a S,
    root: &'a Slot<K, V, S::Link>,
    key: &Q,
    analyzer: &A,
) -> Option<&'a Leaf<K, V>>
where
    S: NodeSource<K, V>,
    K: Borrow<Q>,
    Q: ?Sized,
    A: KeyAnalyzer<Q>,
{
    let leaf = closest_leaf(source, root, key, analyzer);
    let stored: &Q = leaf.key.borrow();
    if analyzer.first_differing_bit(stored, key).is_equal() {
        Some(leaf)
    } else {
        None
    }
}
