//! Key hashing and the fragment-extraction mixer.
//!
//! Rust's default hasher already has decent avalanche behavior, but a
//! caller-supplied low-quality one (e.g. a fast non-cryptographic hasher
//! tuned for integer keys) can leave entropy concentrated in the high
//! bits, which `fragment` never looks at beyond the top few levels.
//! Mixing once, up front, makes every trie level equally well spread
//! regardless of what produced the raw digest.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Spreads entropy from the high bits down into the low bits before
/// fragment extraction.
///
/// 64-bit generalization of the classic 32-bit finalizing mix (shift
/// amounts scaled proportionally: 20→40, 12→24, 7→14, 4→8).
#[inline]
#[must_use]
pub const fn mix(mut h: u64) -> u64 {
    h ^= (h >> 40) ^ (h >> 24);
    h ^= (h >> 14) ^ (h >> 8);
    h
}

/// Computes the mixed 64-bit hash used for trie-index extraction.
#[inline]
#[must_use]
pub fn hash_key<K: Hash>(key: &K) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    mix(hasher.finish())
}
