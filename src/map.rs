//! Persistent and transient CHAMP maps, backed by a non-atomic refcounted pointer.

use std::fmt;
use std::hash::Hash;
use std::ops;

use archery::{RcK, SharedPointer, SharedPointerKind};

use crate::hash::hash_key;
use crate::iter::Iter;
use crate::node::{Entry, Node};
use crate::ops::bulk::{self, Op};
use crate::ops::get::get_recursive;
use crate::ops::insert::insert_recursive;
use crate::ops::remove::remove_recursive;

/// Persistent hash map based on a CHAMP trie, single-threaded.
///
/// Same set of key-value pairs always produces the same trie structure
/// (canonical form), enabling O(1) structural equality via [`adhash`](Self::adhash).
/// Every `insert`/`remove` returns a new map sharing unchanged substructure
/// with the old one; for imperative batch building, obtain a
/// [`TransientChampMap`] via [`linear`](Self::linear) instead.
pub struct ChampMap<K, V, P: SharedPointerKind = RcK> {
    root: Option<SharedPointer<Node<K, V, P>, P>>,
    size: usize,
    adhash: u64,
}

impl<K, V, P: SharedPointerKind> ChampMap<K, V, P> {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self { root: None, size: 0, adhash: 0 }
    }

    /// Returns the number of key-value pairs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the map contains no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the current `AdHash` value.
    ///
    /// Two maps with the same `AdHash` and the same length contain the same
    /// entries with overwhelming probability (2⁻⁶⁴ collision chance).
    #[must_use]
    pub const fn adhash(&self) -> u64 {
        self.adhash
    }

    /// Returns a transient map that owns a (possibly shared, copy-on-write)
    /// reference to this map's root, suitable for efficient imperative
    /// batch building.
    #[must_use]
    pub fn linear(&self) -> TransientChampMap<K, V, P> {
        TransientChampMap { root: self.root.clone(), size: self.size, adhash: self.adhash }
    }

    /// Returns an iterator over `(&K, &V)` pairs.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V, P> {
        Iter::new(self.root.as_ref(), self.size)
    }

    /// Exposes the root node for whitebox invariant checks.
    #[cfg(test)]
    pub(crate) fn root(&self) -> Option<&SharedPointer<Node<K, V, P>, P>> {
        self.root.as_ref()
    }
}

impl<K, V, P: SharedPointerKind> Default for ChampMap<K, V, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V, P: SharedPointerKind> ChampMap<K, V, P> {
    /// Returns a reference to the value associated with `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        let root = self.root.as_ref()?;
        get_recursive(root, hash_key(key), key, 0)
    }

    /// Returns `true` if the map contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone, P: SharedPointerKind> ChampMap<K, V, P> {
    /// Returns a new map with `key` mapped to `value`.
    ///
    /// Equivalent to `self.insert_with(key, value, |_old, new| new)`.
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        self.insert_with(key, value, |_old, new| new)
    }

    /// Returns a new map with `key` mapped to `value`, resolving a prior
    /// value for the same key via `merge(old, new)`.
    #[must_use]
    pub fn insert_with<F>(&self, key: K, value: V, merge: F) -> Self
    where
        F: FnOnce(&V, V) -> V,
    {
        let hash = hash_key(&key);
        let entry = Entry { hash, key, value };

        // Cloning the root pointer before mutating forces the very first
        // `make_mut` on the write path to take the copy-on-write branch,
        // leaving `self` untouched.
        let mut root = self.root.clone();
        match &mut root {
            Some(r) => {
                let outcome = insert_recursive(r, entry, merge, 0);
                let size = if outcome.old_value.is_none() { self.size + 1 } else { self.size };
                Self { root, size, adhash: self.adhash.wrapping_add(outcome.adhash_delta) }
            }
            None => {
                let contribution = entry.contribution();
                let new_root = SharedPointer::new(Node::singleton(entry, 0));
                Self { root: Some(new_root), size: 1, adhash: contribution }
            }
        }
    }

    /// Returns a new map with `key` removed, or an equal map if `key` was
    /// not present.
    #[must_use]
    pub fn remove(&self, key: &K) -> Self {
        if self.root.is_none() {
            return Self { root: None, size: 0, adhash: 0 };
        }
        let hash = hash_key(key);
        let mut new_root = self.root.clone();
        let outcome = remove_recursive(new_root.as_mut().expect("checked above"), hash, key, 0);
        match outcome {
            None => Self { root: self.root.clone(), size: self.size, adhash: self.adhash },
            Some(outcome) => {
                let root = if outcome.now_empty { None } else { new_root };
                Self {
                    root,
                    size: self.size - 1,
                    adhash: self.adhash.wrapping_sub(outcome.adhash_delta),
                }
            }
        }
    }

    /// Returns the union of `self` and `other`, resolving keys present in
    /// both via `merge(self_value, other_value)`.
    #[must_use]
    pub fn merge<F>(&self, other: &Self, merge: F) -> Self
    where
        F: Fn(&V, &V) -> V,
    {
        let root = bulk::combine(self.root.as_ref(), other.root.as_ref(), Op::Merge, 0, &merge);
        Self::from_root(root)
    }

    /// Returns the keys present in both `self` and `other`, with values
    /// taken from `self`.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let keep = |a: &V, _b: &V| a.clone();
        let root = bulk::combine(self.root.as_ref(), other.root.as_ref(), Op::Intersect, 0, &keep);
        Self::from_root(root)
    }

    /// Returns the keys present in `self` but not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        let keep = |a: &V, _b: &V| a.clone();
        let root = bulk::combine(self.root.as_ref(), other.root.as_ref(), Op::Diff, 0, &keep);
        Self::from_root(root)
    }

    /// Returns the union of `self` and an arbitrary `(K, V)` source,
    /// resolving keys present in both via `merge(self_value, other_value)`.
    #[must_use]
    pub fn merge_entries<F, I>(&self, other: I, merge: F) -> Self
    where
        F: Fn(&V, V) -> V,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut result = self.linear();
        for (k, v) in other {
            if let Some(old) = result.get(&k) {
                let merged = merge(old, v);
                result.insert(k, merged);
            } else {
                result.insert(k, v);
            }
        }
        result.forked()
    }

    fn from_root(root: Option<SharedPointer<Node<K, V, P>, P>>) -> Self {
        match &root {
            Some(r) => Self { size: r.size(), adhash: r.adhash(), root },
            None => Self { root: None, size: 0, adhash: 0 },
        }
    }
}

impl<K, V, P: SharedPointerKind> fmt::Debug for ChampMap<K, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChampMap")
            .field("len", &self.size)
            .field("adhash", &format_args!("{:#018x}", self.adhash))
            .finish_non_exhaustive()
    }
}

impl<K: Hash + Eq, V: PartialEq, P: SharedPointerKind> PartialEq for ChampMap<K, V, P> {
    fn eq(&self, other: &Self) -> bool {
        if self.size != other.size {
            return false;
        }
        if self.adhash != other.adhash {
            return false;
        }
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => SharedPointer::ptr_eq(a, b) || nodes_equal(a, b),
            _ => false,
        }
    }
}

fn nodes_equal<K: Hash + Eq, V: PartialEq, P: SharedPointerKind>(
    a: &SharedPointer<Node<K, V, P>, P>,
    b: &SharedPointer<Node<K, V, P>, P>,
) -> bool {
    if SharedPointer::ptr_eq(a, b) {
        return true;
    }
    match (&**a, &**b) {
        (
            Node::Inner { data_map: da, node_map: na, entries: ea, children: ca, size: sa, .. },
            Node::Inner { data_map: db, node_map: nb, entries: eb, children: cb, size: sb, .. },
        ) => {
            da == db
                && na == nb
                && sa == sb
                && ea.len() == eb.len()
                && ea.iter().zip(eb.iter()).all(|(x, y)| x.key == y.key && x.value == y.value)
                && ca.len() == cb.len()
                && ca.iter().zip(cb.iter()).all(|(x, y)| nodes_equal(x, y))
        }
        (Node::Collision { hash: ha, entries: ea, .. }, Node::Collision { hash: hb, entries: eb, .. }) => {
            ha == hb
                && ea.len() == eb.len()
                && ea.iter().all(|x| eb.iter().any(|y| x.key == y.key && x.value == y.value))
        }
        _ => false,
    }
}

impl<K: Hash + Eq, V: PartialEq, P: SharedPointerKind> Eq for ChampMap<K, V, P> {}

impl<K: Hash + Eq + Clone, V: Hash + Clone, P: SharedPointerKind> Extend<(K, V)> for ChampMap<K, V, P> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let mut transient = self.linear();
        for (k, v) in iter {
            transient.insert(k, v);
        }
        *self = transient.forked();
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone, P: SharedPointerKind> FromIterator<(K, V)> for ChampMap<K, V, P> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Hash + Eq, V, P: SharedPointerKind> ops::Index<&K> for ChampMap<K, V, P> {
    type Output = V;

    fn index(&self, key: &K) -> &V {
        self.get(key).expect("key not found")
    }
}

impl<'a, K, V, P: SharedPointerKind> IntoIterator for &'a ChampMap<K, V, P> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, P>;

    fn into_iter(self) -> Iter<'a, K, V, P> {
        self.iter()
    }
}

/// Transient (single-owner, in-place-mutable) view over a CHAMP trie.
///
/// Obtained from [`ChampMap::linear`]; mutates its owned root in place
/// while it can prove unique ownership (falling back to copy-on-write for
/// any node still shared with a forked persistent map), and is published
/// back to a persistent map via [`forked`](Self::forked).
pub struct TransientChampMap<K, V, P: SharedPointerKind = RcK> {
    root: Option<SharedPointer<Node<K, V, P>, P>>,
    size: usize,
    adhash: u64,
}

impl<K, V, P: SharedPointerKind> TransientChampMap<K, V, P> {
    /// Returns the number of key-value pairs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the map contains no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the current `AdHash` value.
    #[must_use]
    pub const fn adhash(&self) -> u64 {
        self.adhash
    }

    /// Publishes the current root as a persistent map. The transient
    /// remains usable afterward; further writes through it fall back to
    /// copy-on-write for any node the fork still references.
    #[must_use]
    pub fn forked(&self) -> ChampMap<K, V, P> {
        ChampMap { root: self.root.clone(), size: self.size, adhash: self.adhash }
    }

    /// Returns an iterator over `(&K, &V)` pairs.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V, P> {
        Iter::new(self.root.as_ref(), self.size)
    }
}

impl<K: Hash + Eq, V, P: SharedPointerKind> TransientChampMap<K, V, P> {
    /// Returns a reference to the value associated with `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        let root = self.root.as_ref()?;
        get_recursive(root, hash_key(key), key, 0)
    }

    /// Returns `true` if the map contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone, P: SharedPointerKind> TransientChampMap<K, V, P> {
    /// Inserts `key`, mutating the root in place. Returns the previous
    /// value for that key, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.insert_with(key, value, |_old, new| new)
    }

    /// Inserts `key`, resolving a prior value via `merge(old, new)`.
    /// Returns the previous value for that key, if any.
    pub fn insert_with<F>(&mut self, key: K, value: V, merge: F) -> Option<V>
    where
        F: FnOnce(&V, V) -> V,
    {
        let hash = hash_key(&key);
        let entry = Entry { hash, key, value };

        match &mut self.root {
            Some(r) => {
                let outcome = insert_recursive(r, entry, merge, 0);
                if outcome.old_value.is_none() {
                    self.size += 1;
                }
                self.adhash = self.adhash.wrapping_add(outcome.adhash_delta);
                outcome.old_value
            }
            None => {
                let contribution = entry.contribution();
                self.root = Some(SharedPointer::new(Node::singleton(entry, 0)));
                self.size = 1;
                self.adhash = contribution;
                None
            }
        }
    }

    /// Removes `key` from the map in place. Returns the removed value, or
    /// `None` if the key was not present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let r = self.root.as_mut()?;
        let hash = hash_key(key);
        let outcome = remove_recursive(r, hash, key, 0)?;
        self.size -= 1;
        self.adhash = self.adhash.wrapping_sub(outcome.adhash_delta);
        if outcome.now_empty {
            self.root = None;
        }
        Some(outcome.old_value)
    }
}

impl<K, V, P: SharedPointerKind> fmt::Debug for TransientChampMap<K, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransientChampMap")
            .field("len", &self.size)
            .field("adhash", &format_args!("{:#018x}", self.adhash))
            .finish_non_exhaustive()
    }
}

impl<'a, K, V, P: SharedPointerKind> IntoIterator for &'a TransientChampMap<K, V, P> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, P>;

    fn into_iter(self) -> Iter<'a, K, V, P> {
        self.iter()
    }
}
