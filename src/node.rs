//! CHAMP trie node types and bitmap helpers.

use std::fmt;
use std::hash::Hash;

use archery::{SharedPointer, SharedPointerKind};

use crate::adhash::{entry_adhash, hash_one};

/// Bits per trie level (5 → 32-way branching).
pub const BITS_PER_LEVEL: u32 = 5;

/// Maximum bit-shift value (depth 12, last level uses 4 bits).
pub const MAX_SHIFT: u32 = 60;

/// Inline entry storing a key-value pair with its precomputed mixed hash.
pub struct Entry<K, V> {
    /// Precomputed, mixed 64-bit hash of the key.
    pub hash: u64,
    /// The key.
    pub key: K,
    /// The value.
    pub value: V,
}

impl<K: Clone, V: Clone> Clone for Entry<K, V> {
    fn clone(&self) -> Self {
        Self {
            hash: self.hash,
            key: self.key.clone(),
            value: self.value.clone(),
        }
    }
}

impl<K, V> Entry<K, V> {
    /// This entry's `AdHash` contribution.
    #[must_use]
    pub fn contribution(&self) -> u64
    where
        V: Hash,
    {
        entry_adhash(self.hash, hash_one(&self.value))
    }
}

/// CHAMP trie node.
///
/// Two variants maintain the canonical form invariant:
/// - [`Inner`](Self::Inner) — bitmap-compressed node at depth `d < D`
/// - [`Collision`](Self::Collision) — linear node for full 64-bit hash collisions
///
/// `P` selects the reference-counted pointer kind backing `children`
/// ([`archery::RcK`] for single-threaded use, [`archery::ArcK`] for `Send + Sync`).
pub enum Node<K, V, P: SharedPointerKind> {
    /// Bitmap-compressed inner node.
    ///
    /// Invariant: `data_map & node_map == 0` (disjoint positions).
    Inner {
        /// Bitmap of positions occupied by inline entries.
        data_map: u32,
        /// Bitmap of positions occupied by child subtrees.
        node_map: u32,
        /// Inline entries, ordered by the rank of their bit in `data_map`.
        entries: Vec<Entry<K, V>>,
        /// Child subtrees, ordered by the rank of their bit in `node_map`.
        children: Vec<SharedPointer<Node<K, V, P>, P>>,
        /// Total number of entries in this subtree.
        size: usize,
        /// `AdHash` of this subtree.
        adhash: u64,
    },
    /// Collision node for keys sharing the same mixed 64-bit hash.
    ///
    /// Invariant: `entries.len() >= 2`.
    Collision {
        /// The shared mixed hash value.
        hash: u64,
        /// The colliding entries, in no particular order.
        entries: Vec<Entry<K, V>>,
        /// `AdHash` of this subtree.
        adhash: u64,
    },
}

// Manual Clone impl: derive would add a spurious `P: Clone` bound. A
// `SharedPointer<T, P>` clones by bumping a refcount and needs neither
// `T: Clone` nor `P: Clone` for that — only `make_mut` needs `T: Clone`.
impl<K: Clone, V: Clone, P: SharedPointerKind> Clone for Node<K, V, P> {
    fn clone(&self) -> Self {
        match self {
            Self::Inner {
                data_map,
                node_map,
                entries,
                children,
                size,
                adhash,
            } => Self::Inner {
                data_map: *data_map,
                node_map: *node_map,
                entries: entries.clone(),
                children: children.clone(),
                size: *size,
                adhash: *adhash,
            },
            Self::Collision {
                hash,
                entries,
                adhash,
            } => Self::Collision {
                hash: *hash,
                entries: entries.clone(),
                adhash: *adhash,
            },
        }
    }
}

impl<K, V, P: SharedPointerKind> fmt::Debug for Node<K, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner {
                data_map,
                node_map,
                size,
                adhash,
                ..
            } => f
                .debug_struct("Inner")
                .field("data_map", &format_args!("{data_map:#034b}"))
                .field("node_map", &format_args!("{node_map:#034b}"))
                .field("size", size)
                .field("adhash", &format_args!("{adhash:#018x}"))
                .finish(),
            Self::Collision {
                hash,
                entries,
                adhash,
            } => f
                .debug_struct("Collision")
                .field("hash", hash)
                .field("entries_len", &entries.len())
                .field("adhash", &format_args!("{adhash:#018x}"))
                .finish(),
        }
    }
}

impl<K, V, P: SharedPointerKind> Node<K, V, P> {
    /// Builds a single-entry `Inner` node housing `entry` at depth `shift`.
    #[must_use]
    pub fn singleton(entry: Entry<K, V>, shift: u32) -> Self
    where
        V: Hash,
    {
        let adhash = entry.contribution();
        let frag = fragment(entry.hash, shift);
        Self::Inner {
            data_map: mask(frag),
            node_map: 0,
            entries: vec![entry],
            children: vec![],
            size: 1,
            adhash,
        }
    }

    /// Returns the `AdHash` of this node's subtree.
    #[must_use]
    pub const fn adhash(&self) -> u64 {
        match self {
            Self::Inner { adhash, .. } | Self::Collision { adhash, .. } => *adhash,
        }
    }

    /// Returns the total number of entries in this node's subtree.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Inner { size, .. } => *size,
            Self::Collision { entries, .. } => entries.len(),
        }
    }

    /// A non-root node must never carry fewer than two occupied slots
    /// unless it is a [`Collision`](Self::Collision) node. A node
    /// satisfying this is a candidate to be inlined back into its parent
    /// as a single entry.
    #[must_use]
    pub fn should_inline(&self) -> bool {
        match self {
            Self::Inner {
                data_map, node_map, ..
            } => data_map.count_ones() == 1 && *node_map == 0,
            Self::Collision { .. } => false,
        }
    }

    /// Depth-first collects every entry of this subtree into `out`.
    pub fn collect_entries(&self, out: &mut Vec<Entry<K, V>>)
    where
        K: Clone,
        V: Clone,
    {
        match self {
            Self::Inner {
                entries, children, ..
            } => {
                out.extend(entries.iter().cloned());
                for child in children {
                    child.collect_entries(out);
                }
            }
            Self::Collision { entries, .. } => out.extend(entries.iter().cloned()),
        }
    }

    /// Recursively checks that every descendant upholds the contraction
    /// invariant: at least two slots occupied (inline or child), unless
    /// it is a [`Collision`](Self::Collision) node.
    #[cfg(test)]
    pub fn check_contraction(&self) -> bool {
        match self {
            Self::Inner {
                data_map,
                node_map,
                children,
                ..
            } => {
                let occupied = data_map.count_ones() + node_map.count_ones();
                occupied >= 2 && children.iter().all(|c| c.check_contraction())
            }
            Self::Collision { .. } => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Bitmap helpers
// ---------------------------------------------------------------------------

/// Extracts the 5-bit hash fragment at the given bit-shift depth.
#[inline]
#[must_use]
pub const fn fragment(hash: u64, shift: u32) -> u32 {
    ((hash >> shift) & 0x1F) as u32
}

/// Returns the single-bit mask for the given fragment (0..31).
#[inline]
#[must_use]
pub const fn mask(frag: u32) -> u32 {
    1 << frag
}

/// Returns the compact index of `bit` within `bitmap`.
///
/// Counts the number of set bits below `bit`.
#[inline]
#[must_use]
pub const fn index(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}
