//! # critbit
//!
//! Ordered maps over crit-bit (PATRICIA) tries.
//!
//! Keys are bit-strings. Each internal node branches on the first bit at which
//! the keys below it differ, so lookups, inserts and removals cost time
//! proportional to key length rather than to the number of entries, and no
//! rebalancing is ever needed. Entries come out in lexicographic order of their
//! big-endian bits, and every key sharing a prefix sits in one subtree.
//!
//! Two flavours share the same node model and read-only algorithms:
//!
//! - [`CritBitTree`]: persistent. Updates return a new tree and share every
//!   untouched node with the old one.
//! - [`MCritBitTree`]: mutable in place, with nodes kept in an arena.
//!
//! How a key type maps to bits is decided by a [`KeyAnalyzer`]. The default,
//! [`ByteAnalyzer`], handles anything that is `AsRef<[u8]>`; [`IntAnalyzer`]
//! orders unsigned integers numerically.
//!
//! ## Example
//!
//! ```rust
//! use critbit::{Decision, MCritBitTree};
//!
//! let mut tree: MCritBitTree<&str, u32> = MCritBitTree::new();
//! tree.put("romane", 1);
//! tree.put("romanus", 2);
//! tree.put("rubens", 3);
//!
//! assert_eq!(tree.get("romanus"), Some(&2));
//! assert_eq!(tree.max(), Some((&"rubens", &3)));
//!
//! let mut hits = Vec::new();
//! tree.traverse_with_prefix("roman", |k, _| {
//!     hits.push(*k);
//!     Decision::Continue
//! });
//! assert_eq!(hits, ["romane", "romanus"]);
//! ```

mod config;
mod error;
mod key;
mod mutable;
mod node;
mod persistent;
mod search;
mod sync;
mod traverse;
mod validate;

pub use config::Config;
pub use error::{Error, Result};
pub use key::{BitDiff, ByteAnalyzer, FixedWidth, IntAnalyzer, KeyAnalyzer};
pub use mutable::MCritBitTree;
pub use persistent::CritBitTree;
pub use sync::{SyncCritBitMap, TreeCell};
pub use traverse::Decision;

/// Iterator types.
pub mod iter {
    pub use crate::mutable::Iter as MutableIter;
    pub use crate::persistent::Iter as PersistentIter;
}

#[cfg(test)]
mod proptests;
