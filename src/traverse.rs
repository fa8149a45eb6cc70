//! In-order enumeration, extremes and prefix-bounded walks.

use std::borrow::Borrow;

use smallvec::SmallVec;

use crate::key::KeyAnalyzer;
use crate::node::{Child, Leaf, NodeSource, Side, Slot};

/// What a traversal visitor wants to happen after seeing an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Keep going.
    Continue,
    /// Stop after this entry.
    Exit,
    /// Remove this entry and keep going.
    Remove,
    /// Remove this entry and stop.
    RemoveAndExit,
}

impl Decision {
    #[inline]
    pub fn removes(self) -> bool {
        matches!(self, Decision::Remove | Decision::RemoveAndExit)
    }

    #[inline]
    pub fn exits(self) -> bool {
        matches!(self, Decision::Exit | Decision::RemoveAndExit)
    }
}

/// Depth-first, left-to-right leaf walk with an explicit stack.
pub(crate) struct Walk<'a, K, V, S: NodeSource<K, V>> {
    source: &'a S,
    stack: SmallVec<[Child<'a, K, V, S::Link>; 32]>,
}

impl<'a, K, V, S: NodeSource<K, V>> Walk<'a, K, V, S> {
    pub(crate) fn new(source: &'a S, start: Option<Child<'a, K, V, S::Link>>) -> Self {
        let mut stack = SmallVec::new();
        stack.extend(start);
        Self { source, stack }
    }
}

impl<'a, K, V, S: NodeSource<K, V>> Iterator for Walk<'a, K, V, S> {
    type Item = &'a Leaf<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(child) = self.stack.pop() {
            match child {
                Child::Leaf(leaf) => return Some(leaf),
                Child::Node(link) => {
                    let node = self.source.resolve(link);
                    self.stack.push(node.child(Side::Right));
                    self.stack.push(node.child(Side::Left));
                }
            }
        }
        None
    }
}

/// Feeds leaves to a read-only visitor until it asks to stop.
pub(crate) fn drive<'a, K: 'a, V: 'a>(
    leaves: impl Iterator<Item = &'a Leaf<K, V>>,
    mut visitor: impl FnMut(&K, &V) -> Decision,
) {
    for leaf in leaves {
        let decision = visitor(&leaf.key, &leaf.value);
        debug_assert!(
            !decision.removes(),
            "removal requested from a read-only traversal"
        );
        if decision.exits() {
            break;
        }
    }
}

/// Leftmost (`Side::Left`) or rightmost (`Side::Right`) leaf.
pub(crate) fn extreme<'a, K, V, S: NodeSource<K, V>>(
    source: &'a S,
    root: &'a Slot<K, V, S::Link>,
    side: Side,
) -> &'a Leaf<K, V> {
    let mut child = root.as_child();
    loop {
        match child {
            Child::Leaf(leaf) => return leaf,
            Child::Node(link) => child = source.resolve(link).child(side),
        }
    }
}

/// Topmost child whose subtree holds exactly the keys starting with `prefix`.
///
/// `None` when no stored key has the prefix.
pub(crate) fn prefix_top<'a, K, V, S, Q, A>(
    source: &'a S,
    root: &'a Slot<K, V, S::Link>,
    prefix: &Q,
    analyzer: &A,
) -> Option<Child<'a, K, V, S::Link>>
where
    S: NodeSource<K, V>,
    K: Borrow<Q>,
    Q: ?Sized,
    A: KeyAnalyzer<Q>,
{
    let key_len = analyzer.bit_length(prefix);
    let mut top = root.as_child();
    let mut child = top;
    loop {
        match child {
            Child::Leaf(leaf) => {
                let stored: &Q = leaf.key.borrow();
                return analyzer.is_prefix(stored, prefix).then_some(top);
            }
            Child::Node(link) => {
                let node = source.resolve(link);
                let bit = node.bit();
                child = node.child(Side::of(analyzer.is_bit_set(prefix, bit)));
                if bit < key_len {
                    top = child;
                }
            }
        }
    }
}
