//! Node model shared by both tree variants.
//!
//! An internal node branches on one bit and has one of four shapes depending on
//! which of its sides hold an inlined leaf:
//!
//! | shape        | left    | right   |
//! |--------------|---------|---------|
//! | `ShortBoth`  | leaf    | leaf    |
//! | `ShortLeft`  | leaf    | subtree |
//! | `ShortRight` | subtree | leaf    |
//! | `Tall`       | subtree | subtree |
//!
//! A subtree link always refers to another internal node: a lone leaf child is
//! always stored inline. Only the root of a one-entry tree is a bare leaf.
//!
//! The link type `L` is the only thing that differs between variants: the
//! persistent tree links through reference-counted nodes, the mutable tree
//! through arena slot ids. Read-only engines go through [`NodeSource`].

/// One key/value pair.
#[derive(Clone, Debug)]
pub(crate) struct Leaf<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K, V> Leaf<K, V> {
    #[inline]
    pub(crate) fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    /// Overwrites key and value, returning the previous value.
    #[inline]
    pub(crate) fn replace(&mut self, key: K, value: V) -> V {
        self.key = key;
        std::mem::replace(&mut self.value, value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    pub(crate) fn of(bit_set: bool) -> Self {
        if bit_set {
            Side::Right
        } else {
            Side::Left
        }
    }

    #[inline]
    pub(crate) fn flip(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Owned content of a child slot (or of the root).
#[derive(Clone, Debug)]
pub(crate) enum Slot<K, V, L> {
    Leaf(Leaf<K, V>),
    Node(L),
}

impl<K, V, L> Slot<K, V, L> {
    #[inline]
    pub(crate) fn as_child(&self) -> Child<'_, K, V, L> {
        match self {
            Slot::Leaf(leaf) => Child::Leaf(leaf),
            Slot::Node(link) => Child::Node(link),
        }
    }

    #[inline]
    pub(crate) fn into_leaf(self) -> Option<Leaf<K, V>> {
        match self {
            Slot::Leaf(leaf) => Some(leaf),
            Slot::Node(_) => None,
        }
    }
}

/// Borrowed view of a child slot.
pub(crate) enum Child<'a, K, V, L> {
    Leaf(&'a Leaf<K, V>),
    Node(&'a L),
}

impl<K, V, L> Clone for Child<'_, K, V, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, L> Copy for Child<'_, K, V, L> {}

impl<'a, K, V, L: Clone> Child<'a, K, V, L>
where
    K: Clone,
    V: Clone,
{
    /// Clones the slot: a subtree link is shared, an inline leaf is copied.
    #[inline]
    pub(crate) fn to_slot(self) -> Slot<K, V, L> {
        match self {
            Child::Leaf(leaf) => Slot::Leaf(leaf.clone()),
            Child::Node(link) => Slot::Node(link.clone()),
        }
    }
}

/// Mutable view of a child slot.
pub(crate) enum ChildMut<'a, K, V, L> {
    Leaf(&'a mut Leaf<K, V>),
    Node(&'a mut L),
}

#[derive(Clone, Debug)]
pub(crate) enum Internal<K, V, L> {
    ShortBoth {
        bit: usize,
        left: Leaf<K, V>,
        right: Leaf<K, V>,
    },
    ShortLeft {
        bit: usize,
        left: Leaf<K, V>,
        right: L,
    },
    ShortRight {
        bit: usize,
        left: L,
        right: Leaf<K, V>,
    },
    Tall {
        bit: usize,
        left: L,
        right: L,
    },
}

impl<K, V, L> Internal<K, V, L> {
    /// Builds the node whose shape matches the given children.
    pub(crate) fn join(bit: usize, left: Slot<K, V, L>, right: Slot<K, V, L>) -> Self {
        match (left, right) {
            (Slot::Leaf(left), Slot::Leaf(right)) => Internal::ShortBoth { bit, left, right },
            (Slot::Leaf(left), Slot::Node(right)) => Internal::ShortLeft { bit, left, right },
            (Slot::Node(left), Slot::Leaf(right)) => Internal::ShortRight { bit, left, right },
            (Slot::Node(left), Slot::Node(right)) => Internal::Tall { bit, left, right },
        }
    }

    /// Like [`join`](Self::join), with `this` placed on `side` and `other` opposite.
    #[inline]
    pub(crate) fn join_sided(
        bit: usize,
        side: Side,
        this: Slot<K, V, L>,
        other: Slot<K, V, L>,
    ) -> Self {
        match side {
            Side::Left => Self::join(bit, this, other),
            Side::Right => Self::join(bit, other, this),
        }
    }

    /// Pairs two leaves that first differ at `bit`.
    ///
    /// `incoming_right` is the value of `bit` in `incoming`'s key; the leaf
    /// with that bit clear goes left.
    pub(crate) fn short_both(
        bit: usize,
        incoming: Leaf<K, V>,
        existing: Leaf<K, V>,
        incoming_right: bool,
    ) -> Self {
        if incoming_right {
            Internal::ShortBoth {
                bit,
                left: existing,
                right: incoming,
            }
        } else {
            Internal::ShortBoth {
                bit,
                left: incoming,
                right: existing,
            }
        }
    }

    /// Wraps `subtree` together with a new leaf in a node branching on `bit`.
    pub(crate) fn above(bit: usize, subtree: L, incoming: Leaf<K, V>, incoming_right: bool) -> Self {
        if incoming_right {
            Internal::ShortRight {
                bit,
                left: subtree,
                right: incoming,
            }
        } else {
            Internal::ShortLeft {
                bit,
                left: incoming,
                right: subtree,
            }
        }
    }

    /// Splits the node into its crit bit and its owned children.
    pub(crate) fn into_parts(self) -> (usize, Slot<K, V, L>, Slot<K, V, L>) {
        match self {
            Internal::ShortBoth { bit, left, right } => (bit, Slot::Leaf(left), Slot::Leaf(right)),
            Internal::ShortLeft { bit, left, right } => (bit, Slot::Leaf(left), Slot::Node(right)),
            Internal::ShortRight { bit, left, right } => (bit, Slot::Node(left), Slot::Leaf(right)),
            Internal::Tall { bit, left, right } => (bit, Slot::Node(left), Slot::Node(right)),
        }
    }

    #[inline]
    pub(crate) fn bit(&self) -> usize {
        match self {
            Internal::ShortBoth { bit, .. }
            | Internal::ShortLeft { bit, .. }
            | Internal::ShortRight { bit, .. }
            | Internal::Tall { bit, .. } => *bit,
        }
    }

    #[inline]
    pub(crate) fn has_external(&self, side: Side) -> bool {
        match (self, side) {
            (Internal::ShortBoth { .. }, _) => true,
            (Internal::ShortLeft { .. }, Side::Left) => true,
            (Internal::ShortRight { .. }, Side::Right) => true,
            _ => false,
        }
    }

    #[inline]
    pub(crate) fn child(&self, side: Side) -> Child<'_, K, V, L> {
        match (self, side) {
            (Internal::ShortBoth { left, .. }, Side::Left)
            | (Internal::ShortLeft { left, .. }, Side::Left) => Child::Leaf(left),
            (Internal::ShortBoth { right, .. }, Side::Right)
            | (Internal::ShortRight { right, .. }, Side::Right) => Child::Leaf(right),
            (Internal::ShortRight { left, .. }, Side::Left)
            | (Internal::Tall { left, .. }, Side::Left) => Child::Node(left),
            (Internal::ShortLeft { right, .. }, Side::Right)
            | (Internal::Tall { right, .. }, Side::Right) => Child::Node(right),
        }
    }

    #[inline]
    pub(crate) fn child_mut(&mut self, side: Side) -> ChildMut<'_, K, V, L> {
        match (self, side) {
            (Internal::ShortBoth { left, .. }, Side::Left)
            | (Internal::ShortLeft { left, .. }, Side::Left) => ChildMut::Leaf(left),
            (Internal::ShortBoth { right, .. }, Side::Right)
            | (Internal::ShortRight { right, .. }, Side::Right) => ChildMut::Leaf(right),
            (Internal::ShortRight { left, .. }, Side::Left)
            | (Internal::Tall { left, .. }, Side::Left) => ChildMut::Node(left),
            (Internal::ShortLeft { right, .. }, Side::Right)
            | (Internal::Tall { right, .. }, Side::Right) => ChildMut::Node(right),
        }
    }

    /// The subtree link on `side`, if that side is not an inlined leaf.
    #[inline]
    pub(crate) fn link_mut(&mut self, side: Side) -> Option<&mut L> {
        match self.child_mut(side) {
            ChildMut::Node(link) => Some(link),
            ChildMut::Leaf(_) => None,
        }
    }

    /// The inlined leaf on `side`, if any.
    #[inline]
    pub(crate) fn leaf_mut(&mut self, side: Side) -> Option<&mut Leaf<K, V>> {
        match self.child_mut(side) {
            ChildMut::Leaf(leaf) => Some(leaf),
            ChildMut::Node(_) => None,
        }
    }

    pub(crate) fn shape(&self) -> &'static str {
        match self {
            Internal::ShortBoth { .. } => "short-both",
            Internal::ShortLeft { .. } => "short-left",
            Internal::ShortRight { .. } => "short-right",
            Internal::Tall { .. } => "tall",
        }
    }
}

/// Resolves subtree links to nodes.
pub(crate) trait NodeSource<K, V> {
    type Link;

    fn resolve<'a>(&'a self, link: &'a Self::Link) -> &'a Internal<K, V, Self::Link>;
}
