//! Persistent crit-bit tree.
//!
//! Nodes are immutable once built and shared between snapshots through `Arc`.
//! `put` and `remove` copy only the nodes on the path from the root to the
//! change and return a new tree; the receiver is left untouched.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::Result;
use crate::key::{ByteAnalyzer, KeyAnalyzer};
use crate::node::{Child, Internal, Leaf, NodeSource, Side, Slot};
use crate::search;
use crate::traverse::{self, Decision, Walk};
use crate::validate;

/// Reference-counted link to a shared internal node.
pub(crate) struct SharedNode<K, V>(Arc<Internal<K, V, SharedNode<K, V>>>);

impl<K, V> SharedNode<K, V> {
    #[inline]
    fn new(node: Internal<K, V, SharedNode<K, V>>) -> Self {
        Self(Arc::new(node))
    }
}

impl<K, V> Clone for SharedNode<K, V> {
    #[inline]
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// Node source for heap-allocated shared nodes.
pub(crate) struct Heap;

impl<K, V> NodeSource<K, V> for Heap {
    type Link = SharedNode<K, V>;

    #[inline]
    fn resolve<'a>(&'a self, link: &'a SharedNode<K, V>) -> &'a Internal<K, V, SharedNode<K, V>> {
        &link.0
    }
}

type Root<K, V> = Slot<K, V, SharedNode<K, V>>;

/// An immutable ordered map over a crit-bit trie.
///
/// Every mutation returns a new tree that shares all untouched nodes with the
/// old one, so holding on to old trees is cheap and they never change.
///
/// ```
/// use critbit::CritBitTree;
///
/// let empty: CritBitTree<&str, u32> = CritBitTree::new();
/// let one = empty.insert("one", 1);
/// let (two, old) = one.put("two", 2);
/// assert_eq!(old, None);
/// assert_eq!(two.get("one"), Some(&1));
/// assert!(one.get("two").is_none());
/// ```
pub struct CritBitTree<K, V, A = ByteAnalyzer> {
    root: Option<Root<K, V>>,
    len: usize,
    analyzer: Arc<A>,
}

impl<K, V> CritBitTree<K, V> {
    pub fn new() -> Self {
        Self::with_analyzer(ByteAnalyzer)
    }
}

impl<K, V, A> CritBitTree<K, V, A> {
    pub fn with_analyzer(analyzer: A) -> Self {
        Self {
            root: None,
            len: 0,
            analyzer: Arc::new(analyzer),
        }
    }

    fn derive(&self, root: Option<Root<K, V>>, len: usize) -> Self {
        Self {
            root,
            len,
            analyzer: Arc::clone(&self.analyzer),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    /// Whether both trees are the same snapshot: same root node, or both empty.
    ///
    /// Trees holding a single entry are never considered the same.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(Slot::Node(a)), Some(Slot::Node(b))) => Arc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        let root = self.root.as_ref()?;
        search::find(&Heap, root, key, &*self.analyzer).map(|leaf| (&leaf.key, &leaf.value))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        self.get_key_value(key).is_some()
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let mut found = false;
        self.traverse(|_, v| {
            if v == value {
                found = true;
                Decision::Exit
            } else {
                Decision::Continue
            }
        });
        found
    }

    /// Entry with the smallest key.
    pub fn min(&self) -> Option<(&K, &V)> {
        let leaf = traverse::extreme(&Heap, self.root.as_ref()?, Side::Left);
        Some((&leaf.key, &leaf.value))
    }

    /// Entry with the largest key.
    pub fn max(&self) -> Option<(&K, &V)> {
        let leaf = traverse::extreme(&Heap, self.root.as_ref()?, Side::Right);
        Some((&leaf.key, &leaf.value))
    }

    /// In-order iterator over all entries.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            walk: Walk::new(&Heap, self.root.as_ref().map(Slot::as_child)),
        }
    }

    /// In-order iterator over the entries whose key starts with `prefix`.
    pub fn prefix_iter<Q>(&self, prefix: &Q) -> Iter<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        let top = self
            .root
            .as_ref()
            .and_then(|root| traverse::prefix_top(&Heap, root, prefix, &*self.analyzer));
        Iter {
            walk: Walk::new(&Heap, top),
        }
    }

    /// Visits entries in key order until the visitor returns
    /// [`Decision::Exit`].
    ///
    /// The tree cannot change during the walk: returning `Remove` or
    /// `RemoveAndExit` is a bug, caught by a debug assertion and otherwise
    /// treated as `Continue` or `Exit`.
    pub fn traverse(&self, visitor: impl FnMut(&K, &V) -> Decision) {
        traverse::drive(self.iter().walk, visitor);
    }

    /// Like [`traverse`](Self::traverse), restricted to keys starting with
    /// `prefix`.
    pub fn traverse_with_prefix<Q>(&self, prefix: &Q, visitor: impl FnMut(&K, &V) -> Decision)
    where
        K: Borrow<Q>,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        traverse::drive(self.prefix_iter(prefix).walk, visitor);
    }

    /// Returns `(new_tree, removed_value)`. An absent key yields a tree that
    /// shares its root with `self`.
    pub fn remove<Q>(&self, key: &Q) -> (Self, Option<V>)
    where
        K: Borrow<Q> + Clone,
        V: Clone,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        let Some(root) = self.root.as_ref() else {
            return (self.derive(None, 0), None);
        };
        let a = &*self.analyzer;
        let removed = match root {
            Slot::Leaf(leaf) => {
                let stored: &Q = leaf.key.borrow();
                a.first_differing_bit(stored, key)
                    .is_equal()
                    .then(|| (None, leaf.value.clone()))
            }
            Slot::Node(link) => remove_at(link, key, a).map(|(slot, value)| (Some(slot), value)),
        };
        match removed {
            Some((root, value)) => (self.derive(root, self.len - 1), Some(value)),
            None => (self.derive(self.root.clone(), self.len), None),
        }
    }

    /// [`remove`](Self::remove), keeping only the new tree.
    pub fn without<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q> + Clone,
        V: Clone,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        self.remove(key).0
    }
}

impl<K: Clone, V: Clone, A: KeyAnalyzer<K>> CritBitTree<K, V, A> {
    /// Returns `(new_tree, previous_value)`.
    ///
    /// When the key is already present its stored key and value are both
    /// replaced.
    pub fn put(&self, key: K, value: V) -> (Self, Option<V>) {
        let a = &*self.analyzer;
        let Some(root) = self.root.as_ref() else {
            return (self.derive(Some(Slot::Leaf(Leaf::new(key, value))), 1), None);
        };

        let nearest = search::closest_leaf(&Heap, root, &key, a);
        let diff = a
            .first_differing_bit(&nearest.key, &key)
            .bit()
            .map(|bit| (bit, a.is_bit_set(&key, bit)));

        let (root, old) = match root {
            Slot::Leaf(existing) => match diff {
                None => (Slot::Leaf(Leaf::new(key, value)), Some(existing.value.clone())),
                Some((bit, right)) => {
                    let node = Internal::short_both(bit, Leaf::new(key, value), existing.clone(), right);
                    (Slot::Node(SharedNode::new(node)), None)
                }
            },
            Slot::Node(link) => {
                let (link, old) = insert_at(link, diff, key, value, a);
                (Slot::Node(link), old)
            }
        };
        let len = if old.is_some() { self.len } else { self.len + 1 };
        (self.derive(Some(root), len), old)
    }

    /// [`put`](Self::put), keeping only the new tree.
    pub fn insert(&self, key: K, value: V) -> Self {
        self.put(key, value).0
    }

    /// Checks every structural invariant of the tree.
    pub fn validate(&self) -> Result<()> {
        validate::check_tree(&Heap, self.root.as_ref(), self.len, &*self.analyzer).map(|_| ())
    }
}

/// Rebuilds `link`'s node with `key` inserted below it.
///
/// `diff` is the first bit at which `key` differs from its closest leaf
/// together with `key`'s value at that bit, or `None` when the key is present.
fn insert_at<K, V, A>(
    link: &SharedNode<K, V>,
    diff: Option<(usize, bool)>,
    key: K,
    value: V,
    a: &A,
) -> (SharedNode<K, V>, Option<V>)
where
    K: Clone,
    V: Clone,
    A: KeyAnalyzer<K>,
{
    let node = &*link.0;
    let bit = node.bit();
    if let Some((at, right)) = diff {
        if at < bit {
            trace!(target: "critbit::persistent", diff = at, crit = bit, shape = node.shape(), "wrap subtree");
            let wrapped = Internal::above(at, link.clone(), Leaf::new(key, value), right);
            return (SharedNode::new(wrapped), None);
        }
    }

    let side = Side::of(a.is_bit_set(&key, bit));
    let (slot, old) = match node.child(side) {
        Child::Leaf(existing) => match diff {
            None => (Slot::Leaf(Leaf::new(key, value)), Some(existing.value.clone())),
            Some((at, right)) => {
                trace!(target: "critbit::persistent", diff = at, crit = bit, shape = node.shape(), "split leaf");
                let pair = Internal::short_both(at, Leaf::new(key, value), existing.clone(), right);
                (Slot::Node(SharedNode::new(pair)), None)
            }
        },
        Child::Node(sub) => {
            let (sub, old) = insert_at(sub, diff, key, value, a);
            (Slot::Node(sub), old)
        }
    };
    let other = node.child(side.flip()).to_slot();
    (SharedNode::new(Internal::join_sided(bit, side, slot, other)), old)
}

/// Removes `key` below `link`, returning what should take the node's place.
fn remove_at<K, V, Q, A>(link: &SharedNode<K, V>, key: &Q, a: &A) -> Option<(Root<K, V>, V)>
where
    K: Borrow<Q> + Clone,
    V: Clone,
    Q: ?Sized,
    A: KeyAnalyzer<Q>,
{
    let node = &*link.0;
    let bit = node.bit();
    let side = Side::of(a.is_bit_set(key, bit));
    let other = node.child(side.flip());
    match node.child(side) {
        Child::Leaf(leaf) => {
            let stored: &Q = leaf.key.borrow();
            if !a.first_differing_bit(stored, key).is_equal() {
                return None;
            }
            trace!(target: "critbit::persistent", crit = bit, shape = node.shape(), "collapse");
            Some((other.to_slot(), leaf.value.clone()))
        }
        Child::Node(sub) => {
            let (slot, value) = remove_at(sub, key, a)?;
            let rebuilt = Internal::join_sided(bit, side, slot, other.to_slot());
            Some((Slot::Node(SharedNode::new(rebuilt)), value))
        }
    }
}

impl<K, V> Default for CritBitTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Clones the root link only. A tree with a single entry keeps its leaf in the
/// root, so cloning it copies that one key and value.
impl<K: Clone, V: Clone, A> Clone for CritBitTree<K, V, A> {
    fn clone(&self) -> Self {
        self.derive(self.root.clone(), self.len)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, A> fmt::Debug for CritBitTree<K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone, V: Clone, A: KeyAnalyzer<K> + Default> FromIterator<(K, V)> for CritBitTree<K, V, A> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::with_analyzer(A::default()), |tree, (k, v)| tree.insert(k, v))
    }
}

impl<'a, K, V, A> IntoIterator for &'a CritBitTree<K, V, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order iterator over a [`CritBitTree`].
pub struct Iter<'a, K, V> {
    walk: Walk<'a, K, V, Heap>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.walk.next().map(|leaf| (&leaf.key, &leaf.value))
    }
}
