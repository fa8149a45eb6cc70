//! Structural invariant violations reported by `validate()`.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A child node does not branch on a strictly later bit than its parent.
    #[error("crit bit {child} sits below crit bit {parent}")]
    CritBitOrder { parent: usize, child: usize },

    /// A key lies on the wrong side of an ancestor's crit bit.
    #[error("key on the {side} side of crit bit {bit} has the wrong bit value")]
    MisplacedKey { bit: usize, side: &'static str },

    /// The two halves of a node do not first differ at its crit bit.
    #[error("halves of the node at crit bit {bit} first differ at {found:?}")]
    PrefixMismatch { bit: usize, found: Option<usize> },

    #[error("tree reports {expected} entries but {found} leaves are reachable")]
    SizeMismatch { expected: usize, found: usize },

    /// Internal nodes held by the arena but not reachable from the root, or
    /// the reverse.
    #[error("arena holds {found} live nodes, {expected} are reachable")]
    NodeCountMismatch { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
