//! Structural checks behind `validate()`.

use crate::error::{Error, Result};
use crate::key::{BitDiff, KeyAnalyzer};
use crate::node::{Child, Leaf, NodeSource, Side, Slot};

struct Summary<'a, K, V> {
    /// Leftmost leaf; every key below agrees with it above the subtree's crit bit.
    first: &'a Leaf<K, V>,
    leaves: usize,
    internals: usize,
}

/// Checks every node reachable from `root` and returns the number of internal
/// nodes visited.
pub(crate) fn check_tree<K, V, S, A>(
    source: &S,
    root: Option<&Slot<K, V, S::Link>>,
    len: usize,
    analyzer: &A,
) -> Result<usize>
where
    S: NodeSource<K, V>,
    A: KeyAnalyzer<K>,
{
    let (leaves, internals) = match root {
        None => (0, 0),
        Some(Slot::Leaf(_)) => (1, 0),
        Some(Slot::Node(link)) => {
            let summary = check_subtree(source, link, None, analyzer)?;
            (summary.leaves, summary.internals)
        }
    };
    if leaves != len {
        return Err(Error::SizeMismatch {
            expected: len,
            found: leaves,
        });
    }
    Ok(internals)
}

fn check_subtree<'a, K, V, S, A>(
    source: &'a S,
    link: &'a S::Link,
    parent: Option<usize>,
    analyzer: &A,
) -> Result<Summary<'a, K, V>>
where
    S: NodeSource<K, V>,
    A: KeyAnalyzer<K>,
{
    let node = source.resolve(link);
    let bit = node.bit();
    if let Some(parent) = parent {
        if bit <= parent {
            return Err(Error::CritBitOrder { parent, child: bit });
        }
    }

    let left = check_child(source, node.child(Side::Left), bit, analyzer)?;
    let right = check_child(source, node.child(Side::Right), bit, analyzer)?;

    if analyzer.is_bit_set(&left.first.key, bit) {
        return Err(Error::MisplacedKey { bit, side: "left" });
    }
    if !analyzer.is_bit_set(&right.first.key, bit) {
        return Err(Error::MisplacedKey { bit, side: "right" });
    }
    let diff = analyzer.first_differing_bit(&left.first.key, &right.first.key);
    if diff != BitDiff::At(bit) {
        return Err(Error::PrefixMismatch {
            bit,
            found: diff.bit(),
        });
    }

    Ok(Summary {
        first: left.first,
        leaves: left.leaves + right.leaves,
        internals: left.internals + right.internals + 1,
    })
}

fn check_child<'a, K, V, S, A>(
    source: &'a S,
    child: Child<'a, K, V, S::Link>,
    parent: usize,
    analyzer: &A,
) -> Result<Summary<'a, K, V>>
where
    S: NodeSource<K, V>,
    A: KeyAnalyzer<K>,
{
    match child {
        Child::Leaf(leaf) => Ok(Summary {
            first: leaf,
            leaves: 1,
            internals: 0,
        }),
        Child::Node(link) => check_subtree(source, link, Some(parent), analyzer),
    }
}
