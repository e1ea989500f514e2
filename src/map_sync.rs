//! Multi-threaded CHAMP map.
//!
//! [`ChampMapSync`] and [`TransientChampMapSync`] are the
//! [`ChampMap`](crate::ChampMap)/[`TransientChampMap`](crate::TransientChampMap)
//! pair backed by [`archery::ArcK`] instead of [`archery::RcK`]: the same
//! node algorithms apply unchanged, since both are generic over the
//! backing pointer kind, but an atomically-refcounted pointer makes the
//! resulting type `Send + Sync` at the cost of atomic refcount traffic on
//! every clone-only-if-shared path copy.

use archery::ArcK;

use crate::map::{ChampMap, TransientChampMap};

/// [`ChampMap`] backed by [`ArcK`], safe to share across threads once
/// published.
pub type ChampMapSync<K, V> = ChampMap<K, V, ArcK>;

/// [`TransientChampMap`] backed by [`ArcK`].
///
/// Still single-owner and not itself `Sync` — only the persistent maps
/// produced by [`forked`](TransientChampMap::forked) are safely shareable.
pub type TransientChampMapSync<K, V> = TransientChampMap<K, V, ArcK>;
