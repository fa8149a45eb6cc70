//! In-place crit-bit tree over a node arena.
//!
//! Internal nodes live in a [`NodeArena`] and refer to their subtrees by slot
//! id. There are no parent pointers: removal records the descent path in an
//! explicit stack and splices through it afterwards.
//!
//! A mutation rewrites at most one existing node. When a node's shape has to
//! change it is rebuilt under its own id, so its parent never needs to be
//! touched.

mod arena;

use std::borrow::Borrow;
use std::fmt;

use smallvec::SmallVec;
use tracing::trace;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::key::{ByteAnalyzer, KeyAnalyzer};
use crate::node::{Child, ChildMut, Internal, Leaf, Side, Slot};
use crate::search;
use crate::traverse::{self, Decision, Walk};
use crate::validate;

pub(crate) use arena::{NodeArena, NodeId};

/// Frames from the root down to the node holding the target leaf.
type Path = SmallVec<[(NodeId, Side); 32]>;

/// A mutable ordered map over a crit-bit trie.
///
/// ```
/// use critbit::MCritBitTree;
///
/// let mut tree: MCritBitTree<String, u32> = MCritBitTree::new();
/// tree.put("b".to_string(), 2);
/// tree.put("a".to_string(), 1);
/// assert_eq!(tree.min(), Some((&"a".to_string(), &1)));
/// assert_eq!(tree.remove("b"), Some(2));
/// assert_eq!(tree.len(), 1);
/// ```
#[derive(Clone)]
pub struct MCritBitTree<K, V, A = ByteAnalyzer> {
    nodes: NodeArena<K, V>,
    root: Option<Slot<K, V, NodeId>>,
    len: usize,
    analyzer: A,
    config: Config,
}

impl<K, V> MCritBitTree<K, V> {
    pub fn new() -> Self {
        Self::with_analyzer(ByteAnalyzer)
    }
}

impl<K, V, A> MCritBitTree<K, V, A> {
    pub fn with_analyzer(analyzer: A) -> Self {
        Self::with_config(analyzer, Config::default())
    }

    pub fn with_config(analyzer: A, config: Config) -> Self {
        Self {
            nodes: NodeArena::with_capacity(config.initial_capacity),
            root: None,
            len: 0,
            analyzer,
            config,
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

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Removes every entry. Arena capacity is kept.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.len = 0;
    }

    /// Bytes held by the tree and its node arena. Heap data owned by keys and
    /// values is not counted.
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.nodes.capacity_bytes()
    }

    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
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
        search::find(&self.nodes, root, key, &self.analyzer).map(|leaf| (&leaf.key, &leaf.value))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        let a = &self.analyzer;
        let (mut id, mut side) = match self.root.as_mut()? {
            Slot::Leaf(leaf) => return matching_value(leaf, key, a),
            Slot::Node(id) => {
                let id = *id;
                (id, Side::of(a.is_bit_set(key, self.nodes.get(id).bit())))
            }
        };
        while let Child::Node(next) = self.nodes.get(id).child(side) {
            id = *next;
            side = Side::of(a.is_bit_set(key, self.nodes.get(id).bit()));
        }
        match self.nodes.get_mut(id).leaf_mut(side) {
            Some(leaf) => matching_value(leaf, key, a),
            None => panic!("descent stopped short of a leaf"),
        }
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

    pub fn min(&self) -> Option<(&K, &V)> {
        let leaf = traverse::extreme(&self.nodes, self.root.as_ref()?, Side::Left);
        Some((&leaf.key, &leaf.value))
    }

    pub fn max(&self) -> Option<(&K, &V)> {
        let leaf = traverse::extreme(&self.nodes, self.root.as_ref()?, Side::Right);
        Some((&leaf.key, &leaf.value))
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            walk: Walk::new(&self.nodes, self.root.as_ref().map(Slot::as_child)),
        }
    }

    pub fn prefix_iter<Q>(&self, prefix: &Q) -> Iter<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        let top = self
            .root
            .as_ref()
            .and_then(|root| traverse::prefix_top(&self.nodes, root, prefix, &self.analyzer));
        Iter {
            walk: Walk::new(&self.nodes, top),
        }
    }

    /// Read-only in-order walk. Removal decisions are a bug here; use
    /// [`traverse_mut`](Self::traverse_mut) to remove while walking.
    pub fn traverse(&self, visitor: impl FnMut(&K, &V) -> Decision) {
        traverse::drive(self.iter().walk, visitor);
    }

    pub fn traverse_with_prefix<Q>(&self, prefix: &Q, visitor: impl FnMut(&K, &V) -> Decision)
    where
        K: Borrow<Q>,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        traverse::drive(self.prefix_iter(prefix).walk, visitor);
    }

    /// Removes `key` without touching `len` or running checks.
    fn remove_entry<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        let root = match self.root.as_ref()? {
            Slot::Node(id) => *id,
            Slot::Leaf(leaf) => {
                let stored: &Q = leaf.key.borrow();
                if !self.analyzer.first_differing_bit(stored, key).is_equal() {
                    return None;
                }
                return self.root.take().and_then(Slot::into_leaf).map(|leaf| leaf.value);
            }
        };
        let path = self.locate(root, key)?;
        Some(self.splice_out(&path))
    }

    /// Descends from `id` recording every frame, and compares against the
    /// reached leaf once. `None` when `key` is absent.
    fn locate<Q>(&self, mut id: NodeId, key: &Q) -> Option<Path>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        let mut path = Path::new();
        loop {
            let node = self.nodes.get(id);
            let side = Side::of(self.analyzer.is_bit_set(key, node.bit()));
            path.push((id, side));
            match node.child(side) {
                Child::Node(next) => id = *next,
                Child::Leaf(leaf) => {
                    let stored: &Q = leaf.key.borrow();
                    return self
                        .analyzer
                        .first_differing_bit(stored, key)
                        .is_equal()
                        .then_some(path);
                }
            }
        }
    }

    /// Unlinks the leaf at the end of a verified `path` without comparing keys.
    ///
    /// The last frame's node is freed and its other side takes its place. A
    /// surviving subtree is relinked into the parent; a surviving leaf is
    /// inlined into the parent, which is rebuilt under its own id.
    fn splice_out(&mut self, path: &[(NodeId, Side)]) -> V {
        let Some((&(id, side), ancestors)) = path.split_last() else {
            panic!("splice through an empty path");
        };
        let (bit, left, right) = self.nodes.free(id).into_parts();
        let (gone, survivor) = match side {
            Side::Left => (left, right),
            Side::Right => (right, left),
        };
        let Some(removed) = gone.into_leaf() else {
            panic!("path to crit bit {bit} does not end at a leaf");
        };
        trace!(target: "critbit::mutable", crit = bit, depth = path.len(), "collapse");

        match (ancestors.last(), survivor) {
            (None, survivor) => self.root = Some(survivor),
            (Some(&(parent, parent_side)), Slot::Node(child)) => {
                match self.nodes.get_mut(parent).link_mut(parent_side) {
                    Some(link) => *link = child,
                    None => panic!("parent frame does not link to crit bit {bit}"),
                }
            }
            (Some(&(parent, parent_side)), Slot::Leaf(leaf)) => {
                let (parent_bit, left, right) = self.nodes.take(parent).into_parts();
                let other = match parent_side {
                    Side::Left => right,
                    Side::Right => left,
                };
                let rebuilt = Internal::join_sided(parent_bit, parent_side, Slot::Leaf(leaf), other);
                trace!(target: "critbit::mutable", crit = parent_bit, shape = rebuilt.shape(), "inline sibling");
                self.nodes.put(parent, rebuilt);
            }
        }
        removed.value
    }
}

fn matching_value<'a, K, V, Q, A>(leaf: &'a mut Leaf<K, V>, key: &Q, a: &A) -> Option<&'a mut V>
where
    K: Borrow<Q>,
    Q: ?Sized,
    A: KeyAnalyzer<Q>,
{
    let stored: &Q = leaf.key.borrow();
    if a.first_differing_bit(stored, key).is_equal() {
        Some(&mut leaf.value)
    } else {
        None
    }
}

impl<K, V, A: KeyAnalyzer<K>> MCritBitTree<K, V, A> {
    /// Inserts `key`, returning the previous value if it was present.
    ///
    /// A present key has both its stored key and value replaced.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let old = self.insert_entry(key, value);
        if old.is_none() {
            self.len += 1;
        }
        self.after_mutation();
        old
    }

    /// Removes `key`, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        let value = self.remove_entry(key)?;
        self.len -= 1;
        self.after_mutation();
        Some(value)
    }

    /// Checks every structural invariant, including that the arena holds no
    /// unreachable nodes.
    pub fn validate(&self) -> Result<()> {
        let internals = validate::check_tree(&self.nodes, self.root.as_ref(), self.len, &self.analyzer)?;
        if internals != self.nodes.live() {
            return Err(Error::NodeCountMismatch {
                expected: internals,
                found: self.nodes.live(),
            });
        }
        Ok(())
    }

    fn after_mutation(&self) {
        if self.config.check_invariants {
            if let Err(err) = self.validate() {
                panic!("crit-bit invariant violated: {err}");
            }
        }
    }

    fn insert_entry(&mut self, key: K, value: V) -> Option<V> {
        let a = &self.analyzer;
        let Some(root) = self.root.as_ref() else {
            self.root = Some(Slot::Leaf(Leaf::new(key, value)));
            return None;
        };
        let nearest = search::closest_leaf(&self.nodes, root, &key, a);
        let diff = a
            .first_differing_bit(&nearest.key, &key)
            .bit()
            .map(|bit| (bit, a.is_bit_set(&key, bit)));

        let mut id = match self.root.take() {
            Some(Slot::Node(id)) => {
                self.root = Some(Slot::Node(id));
                id
            }
            Some(Slot::Leaf(mut existing)) => {
                let (root, old) = match diff {
                    None => {
                        let old = existing.replace(key, value);
                        (Slot::Leaf(existing), Some(old))
                    }
                    Some((bit, right)) => {
                        let node = Internal::short_both(bit, Leaf::new(key, value), existing, right);
                        (Slot::Node(self.nodes.alloc(node)), None)
                    }
                };
                self.root = Some(root);
                return old;
            }
            None => return None,
        };

        loop {
            let node = self.nodes.get(id);
            let bit = node.bit();
            if let Some((at, right)) = diff {
                if at < bit {
                    self.splice_above(id, at, Leaf::new(key, value), right);
                    return None;
                }
            }
            let side = Side::of(self.analyzer.is_bit_set(&key, bit));
            let next = match node.child(side) {
                Child::Node(next) => Some(*next),
                Child::Leaf(_) => None,
            };
            match (next, diff) {
                (Some(next), _) => id = next,
                (None, None) => {
                    let Some(leaf) = self.nodes.get_mut(id).leaf_mut(side) else {
                        panic!("crit bit {bit} has no inline leaf to replace");
                    };
                    return Some(leaf.replace(key, value));
                }
                (None, Some((at, right))) => {
                    self.split_inline(id, side, at, Leaf::new(key, value), right);
                    return None;
                }
            }
        }
    }

    /// Puts a new node branching on `at` where `id` was, with the old node
    /// moved to a fresh slot below it.
    fn splice_above(&mut self, id: NodeId, at: usize, leaf: Leaf<K, V>, right: bool) {
        let old = self.nodes.take(id);
        trace!(target: "critbit::mutable", diff = at, crit = old.bit(), shape = old.shape(), "wrap subtree");
        let moved = self.nodes.alloc(old);
        self.nodes.put(id, Internal::above(at, moved, leaf, right));
    }

    /// Replaces the inline leaf on `side` of `id` with a pair node holding it
    /// and `leaf`.
    fn split_inline(&mut self, id: NodeId, side: Side, at: usize, leaf: Leaf<K, V>, right: bool) {
        let (bit, left, right_slot) = self.nodes.take(id).into_parts();
        let (this, other) = match side {
            Side::Left => (left, right_slot),
            Side::Right => (right_slot, left),
        };
        let Some(existing) = this.into_leaf() else {
            panic!("crit bit {bit} has no inline leaf to split");
        };
        let pair = self.nodes.alloc(Internal::short_both(at, leaf, existing, right));
        let rebuilt = Internal::join_sided(bit, side, Slot::Node(pair), other);
        trace!(target: "critbit::mutable", diff = at, crit = bit, shape = rebuilt.shape(), "split leaf");
        self.nodes.put(id, rebuilt);
    }

    /// In-order walk with mutable values.
    ///
    /// Entries whose visitor returns `Remove` or `RemoveAndExit` are removed
    /// once the walk has finished.
    pub fn traverse_mut(&mut self, mut visitor: impl FnMut(&K, &mut V) -> Decision)
    where
        K: Clone,
    {
        let mut doomed: Vec<K> = Vec::new();
        let mut visit = |leaf: &mut Leaf<K, V>| {
            let decision = visitor(&leaf.key, &mut leaf.value);
            if decision.removes() {
                doomed.push(leaf.key.clone());
            }
            decision.exits()
        };

        match self.root.as_mut() {
            None => {}
            Some(Slot::Leaf(leaf)) => {
                visit(leaf);
            }
            Some(Slot::Node(root)) => {
                let mut stack: Path = SmallVec::new();
                stack.push((*root, Side::Right));
                stack.push((*root, Side::Left));
                while let Some((id, side)) = stack.pop() {
                    match self.nodes.get_mut(id).child_mut(side) {
                        ChildMut::Node(next) => {
                            let next = *next;
                            stack.push((next, Side::Right));
                            stack.push((next, Side::Left));
                        }
                        ChildMut::Leaf(leaf) => {
                            if visit(leaf) {
                                break;
                            }
                        }
                    }
                }
            }
        }

        for key in doomed {
            self.remove(&key);
        }
    }

    /// Keeps only the entries for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &mut V) -> bool)
    where
        K: Clone,
    {
        self.traverse_mut(|k, v| {
            if keep(k, v) {
                Decision::Continue
            } else {
                Decision::Remove
            }
        });
    }
}

impl<K, V> Default for MCritBitTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, A> fmt::Debug for MCritBitTree<K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, A: KeyAnalyzer<K>> Extend<(K, V)> for MCritBitTree<K, V, A> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.put(k, v);
        }
    }
}

impl<K, V, A: KeyAnalyzer<K> + Default> FromIterator<(K, V)> for MCritBitTree<K, V, A> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::with_analyzer(A::default());
        tree.extend(iter);
        tree
    }
}

impl<'a, K, V, A> IntoIterator for &'a MCritBitTree<K, V, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order iterator over an [`MCritBitTree`].
pub struct Iter<'a, K, V> {
    walk: Walk<'a, K, V, NodeArena<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.walk.next().map(|leaf| (&leaf.key, &leaf.value))
    }
}
