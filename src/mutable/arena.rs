use crate::node::{Internal, NodeSource};

/// Index of an internal node slot in a [`NodeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

pub(crate) type Node<K, V> = Internal<K, V, NodeId>;

/// Slot storage for internal nodes, with a free list of vacated slots.
///
/// A node can also be taken out of its slot temporarily and put back under the
/// same id, which is how shape changes are written without touching parents.
#[derive(Clone)]
pub(crate) struct NodeArena<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<NodeId>,
}

#[cold]
#[inline(never)]
fn vacant(id: NodeId) -> ! {
    panic!("arena slot {} is vacant", id.0)
}

impl<K, V> NodeArena<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    pub(crate) fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(node);
            return id;
        }
        let id = NodeId(u32::try_from(self.slots.len()).unwrap_or_else(|_| panic!("node arena is full")));
        self.slots.push(Some(node));
        id
    }

    /// Releases the slot and returns its node.
    pub(crate) fn free(&mut self, id: NodeId) -> Node<K, V> {
        let node = self.take(id);
        self.free.push(id);
        node
    }

    /// Moves the node out, leaving the slot vacant but reserved for [`put`](Self::put).
    pub(crate) fn take(&mut self, id: NodeId) -> Node<K, V> {
        match self.slots.get_mut(id.index()).and_then(Option::take) {
            Some(node) => node,
            None => vacant(id),
        }
    }

    pub(crate) fn put(&mut self, id: NodeId, node: Node<K, V>) {
        let slot = &mut self.slots[id.index()];
        debug_assert!(slot.is_none(), "arena slot {} is occupied", id.0);
        *slot = Some(node);
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> &Node<K, V> {
        match self.slots.get(id.index()) {
            Some(Some(node)) => node,
            _ => vacant(id),
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        match self.slots.get_mut(id.index()) {
            Some(Some(node)) => node,
            _ => vacant(id),
        }
    }

    /// Number of occupied slots.
    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    /// Bytes reserved by the slot and free-list buffers.
    pub(crate) fn capacity_bytes(&self) -> usize {
        self.slots.capacity() * std::mem::size_of::<Option<Node<K, V>>>()
            + self.free.capacity() * std::mem::size_of::<NodeId>()
    }

    /// Drops trailing vacant slots and releases spare capacity.
    pub(crate) fn shrink_to_fit(&mut self) {
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        let len = self.slots.len();
        self.free.retain(|id| id.index() < len);
        self.slots.shrink_to_fit();
        self.free.shrink_to_fit();
    }
}

impl<K, V> NodeSource<K, V> for NodeArena<K, V> {
    type Link = NodeId;

    #[inline]
    fn resolve<'a>(&'a self, link: &'a NodeId) -> &'a Node<K, V> {
        self.get(*link)
    }
}
