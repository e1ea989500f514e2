//! Insertion operation — clone-only-if-shared path-copy with `AdHash` maintenance.

use std::hash::Hash;

use archery::{SharedPointer, SharedPointerKind};

use crate::node::{self, Entry, Node};

/// Outcome of a recursive insert.
pub struct InsertOutcome<V> {
    /// `Some(old_value)` if an existing value was replaced, `None` if the
    /// key was new.
    pub old_value: Option<V>,
    /// Wrapping `AdHash` delta to add to the parent's adhash.
    pub adhash_delta: u64,
    /// `1` if a new key was inserted, `0` if an existing value was updated.
    pub size_delta: usize,
}

/// Inserts `entry` into the subtree rooted at `node`, mutating it in place
/// via [`SharedPointer::make_mut`] — which clones the pointee only if it is
/// currently shared with another façade.
///
/// `merge(old, new)` resolves the value when `entry`'s key is already
/// present; it runs at most once, along the single path the key's hash
/// selects.
pub fn insert_recursive<K, V, P, F>(
    node: &mut SharedPointer<Node<K, V, P>, P>,
    entry: Entry<K, V>,
    merge: F,
    shift: u32,
) -> InsertOutcome<V>
where
    K: Hash + Eq + Clone,
    V: Hash + Clone,
    P: SharedPointerKind,
    F: FnOnce(&V, V) -> V,
{
    match SharedPointer::make_mut(node) {
        Node::Inner {
            data_map,
            node_map,
            entries,
            children,
            size,
            adhash,
        } => {
            let frag = node::fragment(entry.hash, shift);
            let bit = node::mask(frag);

            if *data_map & bit != 0 {
                let pos = node::index(*data_map, bit);
                if entries[pos].hash == entry.hash && entries[pos].key == entry.key {
                    let old_contrib = entries[pos].contribution();
                    let old_value = std::mem::replace(&mut entries[pos].value, entry.value);
                    let merged = merge(&old_value, entries[pos].value.clone());
                    entries[pos].value = merged;
                    let new_contrib = entries[pos].contribution();
                    let delta = new_contrib.wrapping_sub(old_contrib);
                    *adhash = adhash.wrapping_add(delta);
                    InsertOutcome {
                        old_value: Some(old_value),
                        adhash_delta: delta,
                        size_delta: 0,
                    }
                } else {
                    let existing = entries.remove(pos);
                    *data_map &= !bit;
                    let subtree = create_subtree(existing, entry, shift + node::BITS_PER_LEVEL);
                    let contrib = subtree.adhash();
                    *node_map |= bit;
                    let child_pos = node::index(*node_map, bit);
                    children.insert(child_pos, subtree);
                    *size += 1;
                    *adhash = adhash.wrapping_add(contrib);
                    InsertOutcome {
                        old_value: None,
                        adhash_delta: contrib,
                        size_delta: 1,
                    }
                }
            } else if *node_map & bit != 0 {
                let pos = node::index(*node_map, bit);
                let outcome =
                    insert_recursive(&mut children[pos], entry, merge, shift + node::BITS_PER_LEVEL);
                *size += outcome.size_delta;
                *adhash = adhash.wrapping_add(outcome.adhash_delta);
                InsertOutcome {
                    old_value: outcome.old_value,
                    adhash_delta: outcome.adhash_delta,
                    size_delta: outcome.size_delta,
                }
            } else {
                *data_map |= bit;
                let pos = node::index(*data_map, bit);
                let contrib = entry.contribution();
                entries.insert(pos, entry);
                *size += 1;
                *adhash = adhash.wrapping_add(contrib);
                InsertOutcome {
                    old_value: None,
                    adhash_delta: contrib,
                    size_delta: 1,
                }
            }
        }
        Node::Collision {
            hash: node_hash,
            entries,
            adhash,
        } => {
            debug_assert_eq!(*node_hash, entry.hash, "collision node hash mismatch");
            if let Some(pos) = entries.iter().position(|e| e.key == entry.key) {
                let old_contrib = entries[pos].contribution();
                let old_value = std::mem::replace(&mut entries[pos].value, entry.value);
                let merged = merge(&old_value, entries[pos].value.clone());
                entries[pos].value = merged;
                let new_contrib = entries[pos].contribution();
                let delta = new_contrib.wrapping_sub(old_contrib);
                *adhash = adhash.wrapping_add(delta);
                InsertOutcome {
                    old_value: Some(old_value),
                    adhash_delta: delta,
                    size_delta: 0,
                }
            } else {
                let contrib = entry.contribution();
                entries.push(entry);
                *adhash = adhash.wrapping_add(contrib);
                InsertOutcome {
                    old_value: None,
                    adhash_delta: contrib,
                    size_delta: 1,
                }
            }
        }
    }
}

/// Creates a subtree housing two entries that collide at the current depth.
///
/// Recursively descends until their hash fragments differ, or builds a
/// collision node once the mixed hash is exhausted (`shift > MAX_SHIFT`).
pub fn create_subtree<K, V, P>(e1: Entry<K, V>, e2: Entry<K, V>, shift: u32) -> SharedPointer<Node<K, V, P>, P>
where
    K: Hash + Clone,
    V: Hash + Clone,
    P: SharedPointerKind,
{
    if shift > node::MAX_SHIFT {
        let hash = e1.hash;
        let c1 = e1.contribution();
        let c2 = e2.contribution();
        return SharedPointer::new(Node::Collision {
            hash,
            entries: vec![e1, e2],
            adhash: c1.wrapping_add(c2),
        });
    }

    let f1 = node::fragment(e1.hash, shift);
    let f2 = node::fragment(e2.hash, shift);

    if f1 == f2 {
        let child = create_subtree(e1, e2, shift + node::BITS_PER_LEVEL);
        let child_adhash = child.adhash();
        let child_size = child.size();
        SharedPointer::new(Node::Inner {
            data_map: 0,
            node_map: node::mask(f1),
            entries: vec![],
            children: vec![child],
            size: child_size,
            adhash: child_adhash,
        })
    } else {
        let c1 = e1.contribution();
        let c2 = e2.contribution();
        let entries = if f1 < f2 { vec![e1, e2] } else { vec![e2, e1] };
        SharedPointer::new(Node::Inner {
            data_map: node::mask(f1) | node::mask(f2),
            node_map: 0,
            entries,
            children: vec![],
            size: 2,
            adhash: c1.wrapping_add(c2),
        })
    }
}
