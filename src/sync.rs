//! Shared handles for single-writer use across threads.
//!
//! Neither tree is concurrent on its own. [`TreeCell`] publishes persistent
//! snapshots: readers grab the current one and keep using it while a writer
//! swaps in the next. [`SyncCritBitMap`] puts a mutable tree behind a lock and
//! hands out owned values.

use std::borrow::Borrow;

use parking_lot::RwLock;

use crate::key::{ByteAnalyzer, KeyAnalyzer};
use crate::mutable::MCritBitTree;
use crate::persistent::CritBitTree;

/// A swappable pointer to the latest [`CritBitTree`] snapshot.
pub struct TreeCell<K, V, A = ByteAnalyzer> {
    current: RwLock<CritBitTree<K, V, A>>,
}

impl<K: Clone, V: Clone, A> TreeCell<K, V, A> {
    /// A cell publishing `tree`.
    pub fn new(tree: CritBitTree<K, V, A>) -> Self {
        Self {
            current: RwLock::new(tree),
        }
    }

    /// The current snapshot. Later updates do not affect it.
    pub fn snapshot(&self) -> CritBitTree<K, V, A> {
        self.current.read().clone()
    }

    /// Replaces the published snapshot with the tree returned by `f`.
    ///
    /// `f` runs under the write lock, so concurrent updates are serialized
    /// and none is lost. Snapshots taken earlier stay valid.
    pub fn update<R>(&self, f: impl FnOnce(&CritBitTree<K, V, A>) -> (CritBitTree<K, V, A>, R)) -> R {
        let mut current = self.current.write();
        let (next, result) = f(&*current);
        *current = next;
        result
    }

    /// Publishes `tree`, returning the snapshot it replaces.
    pub fn store(&self, tree: CritBitTree<K, V, A>) -> CritBitTree<K, V, A> {
        std::mem::replace(&mut *self.current.write(), tree)
    }

    /// Number of entries in the current snapshot.
    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    /// Whether the current snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Clone, V: Clone> Default for TreeCell<K, V> {
    fn default() -> Self {
        Self::new(CritBitTree::new())
    }
}

/// A [`MCritBitTree`] behind a reader-writer lock.
pub struct SyncCritBitMap<K, V, A = ByteAnalyzer> {
    inner: RwLock<MCritBitTree<K, V, A>>,
}

impl<K, V> SyncCritBitMap<K, V> {
    /// An empty map with the default analyzer.
    pub fn new() -> Self {
        Self::from_tree(MCritBitTree::new())
    }
}

impl<K, V> Default for SyncCritBitMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, A> SyncCritBitMap<K, V, A> {
    /// Wraps an existing tree.
    pub fn from_tree(tree: MCritBitTree<K, V, A>) -> Self {
        Self {
            inner: RwLock::new(tree),
        }
    }

    /// A copy of the value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
        V: Clone,
    {
        self.inner.read().get(key).cloned()
    }

    /// Whether `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        self.inner.read().contains_key(key)
    }

    /// Copies out every entry whose key starts with `prefix`, in key order.
    pub fn prefix<Q>(&self, prefix: &Q) -> Vec<(K, V)>
    where
        K: Borrow<Q> + Clone,
        V: Clone,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        self.inner
            .read()
            .prefix_iter(prefix)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of entries in the map.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` against the tree under the read lock.
    pub fn with_read<R>(&self, f: impl FnOnce(&MCritBitTree<K, V, A>) -> R) -> R {
        f(&*self.inner.read())
    }

    /// Unwraps the tree.
    pub fn into_inner(self) -> MCritBitTree<K, V, A> {
        self.inner.into_inner()
    }
}

impl<K, V, A: KeyAnalyzer<K>> SyncCritBitMap<K, V, A> {
    /// Inserts `key`, returning the previous value if it was present.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        self.inner.write().put(key, value)
    }

    /// Removes `key`, returning its value.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        A: KeyAnalyzer<Q>,
    {
        self.inner.write().remove(key)
    }

    /// Runs `f` against the tree under the write lock.
    pub fn with_write<R>(&self, f: impl FnOnce(&mut MCritBitTree<K, V, A>) -> R) -> R {
        f(&mut *self.inner.write())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_snapshot_survives_updates() {
        let cell: TreeCell<String, u32> = TreeCell::default();
        cell.update(|t| t.put("a".to_string(), 1));
        let before = cell.snapshot();

        let old = cell.update(|t| t.put("a".to_string(), 2));
        assert_eq!(old, Some(1));
        cell.update(|t| (t.insert("b".to_string(), 3), ()));

        assert_eq!(before.get("a"), Some(&1));
        assert_eq!(before.len(), 1);
        let after = cell.snapshot();
        assert_eq!(after.get("a"), Some(&2));
        assert_eq!(after.get("b"), Some(&3));
        assert_eq!(cell.len(), 2);

        let replaced = cell.store(CritBitTree::new());
        assert_eq!(replaced.len(), 2);
        assert!(cell.is_empty());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let cell: Arc<TreeCell<String, usize>> = Arc::new(TreeCell::default());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    for i in 0..250 {
                        cell.update(|tree| tree.put(format!("{t}:{i}"), i));
                        let snap = cell.snapshot();
                        assert!(snap.get(format!("{t}:{i}").as_str()).is_some());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cell.len(), 1000);
        cell.snapshot().validate().unwrap();
    }

    #[test]
    fn test_sync_map() {
        let map: Arc<SyncCritBitMap<String, u64>> = Arc::new(SyncCritBitMap::new());
        let writers: Vec<_> = (0..4u64)
            .map(|t| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    for i in 0..100 {
                        map.put(format!("w{t}/{i:03}"), t * 1000 + i);
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        assert_eq!(map.len(), 400);
        assert_eq!(map.get("w2/007"), Some(2007));
        assert!(map.contains_key("w3/099"));
        assert_eq!(map.prefix("w1/").len(), 100);
        assert_eq!(map.remove("w0/000"), Some(0));
        assert_eq!(map.remove("w0/000"), None);
        assert_eq!(map.with_read(|t| t.min().map(|(k, _)| k.clone())), Some("w0/001".to_string()));
        map.with_write(|t| t.retain(|k, _| k.starts_with("w3")));

        let tree = Arc::try_unwrap(map).ok().unwrap().into_inner();
        assert_eq!(tree.len(), 100);
        tree.validate().unwrap();
    }
}
