//! Removal operation — clone-only-if-shared path-copy with contraction.

use std::hash::Hash;

use archery::{SharedPointer, SharedPointerKind};

use crate::node::{self, Node};

/// Outcome of a recursive remove.
pub struct RemoveOutcome<V> {
    /// The value that was removed.
    pub old_value: V,
    /// Wrapping `AdHash` delta to subtract from the parent's adhash.
    pub adhash_delta: u64,
    /// Whether the subtree at `node` is now empty and should be evicted
    /// entirely by the caller.
    pub now_empty: bool,
}

/// Removes `key` from the subtree rooted at `node`, if present, via
/// [`SharedPointer::make_mut`] clone-only-if-shared path copy.
///
/// Returns `None` if the key was not found, leaving `node` untouched.
pub fn remove_recursive<K, V, P>(
    node: &mut SharedPointer<Node<K, V, P>, P>,
    hash: u64,
    key: &K,
    shift: u32,
) -> Option<RemoveOutcome<V>>
where
    K: Hash + Eq + Clone,
    V: Hash + Clone,
    P: SharedPointerKind,
{
    match &**node {
        Node::Inner {
            data_map, node_map, ..
        } => {
            let frag = node::fragment(hash, shift);
            let bit = node::mask(frag);

            if data_map & bit != 0 {
                remove_inline_entry(node, bit, hash, key)
            } else if node_map & bit != 0 {
                remove_via_child(node, bit, hash, key, shift)
            } else {
                None
            }
        }
        Node::Collision { hash: node_hash, entries, .. } => {
            if hash != *node_hash {
                return None;
            }
            entries.iter().position(|e| e.key == *key)?;
            remove_from_collision(node, key)
        }
    }
}

fn remove_inline_entry<K, V, P>(
    node: &mut SharedPointer<Node<K, V, P>, P>,
    bit: u32,
    hash: u64,
    key: &K,
) -> Option<RemoveOutcome<V>>
where
    K: Hash + Eq + Clone,
    V: Hash + Clone,
    P: SharedPointerKind,
{
    let Node::Inner { data_map, entries, .. } = &**node else {
        unreachable!("caller matched Inner")
    };
    let pos = node::index(*data_map, bit);
    if entries[pos].hash != hash || entries[pos].key != *key {
        return None;
    }

    let Node::Inner { data_map, entries, size, adhash, .. } = SharedPointer::make_mut(node) else {
        unreachable!("shape confirmed above")
    };
    let removed = entries.remove(pos);
    let delta = removed.contribution();
    *data_map &= !bit;
    *size -= 1;
    *adhash = adhash.wrapping_sub(delta);
    let now_empty = *size == 0;
    Some(RemoveOutcome { old_value: removed.value, adhash_delta: delta, now_empty })
}

fn remove_via_child<K, V, P>(
    node: &mut SharedPointer<Node<K, V, P>, P>,
    bit: u32,
    hash: u64,
    key: &K,
    shift: u32,
) -> Option<RemoveOutcome<V>>
where
    K: Hash + Eq + Clone,
    V: Hash + Clone,
    P: SharedPointerKind,
{
    let Node::Inner { data_map, node_map, entries, children, size, adhash } =
        SharedPointer::make_mut(node)
    else {
        unreachable!("caller matched Inner")
    };
    let pos = node::index(*node_map, bit);
    let outcome = remove_recursive(&mut children[pos], hash, key, shift + node::BITS_PER_LEVEL)?;
    *size -= 1;
    *adhash = adhash.wrapping_sub(outcome.adhash_delta);

    if outcome.now_empty {
        children.remove(pos);
        *node_map &= !bit;
    } else if children[pos].should_inline() {
        let sole = {
            let Node::Inner { entries: child_entries, .. } = SharedPointer::make_mut(&mut children[pos])
            else {
                unreachable!("should_inline confirmed an Inner child")
            };
            child_entries.remove(0)
        };
        children.remove(pos);
        *node_map &= !bit;
        *data_map |= bit;
        let insert_pos = node::index(*data_map, bit);
        entries.insert(insert_pos, sole);
    }

    let now_empty = *size == 0;
    Some(RemoveOutcome {
        old_value: outcome.old_value,
        adhash_delta: outcome.adhash_delta,
        now_empty,
    })
}

/// Removes `key` from a [`Node::Collision`] subtree.
///
/// A collision node shrinking to a single entry is promoted back into an
/// ordinary `Inner` node at this depth — the caller's generic inline logic
/// (in [`remove_via_child`]) reads the promoted node's sole entry directly,
/// so the bit position recorded on the promoted node itself is never
/// consulted.
fn remove_from_collision<K, V, P>(
    node: &mut SharedPointer<Node<K, V, P>, P>,
    key: &K,
) -> Option<RemoveOutcome<V>>
where
    K: Eq + Clone,
    V: Hash + Clone,
    P: SharedPointerKind,
{
    let owned = SharedPointer::make_mut(node);
    let Node::Collision { entries, adhash, .. } = owned else {
        unreachable!("caller matched Collision")
    };
    let pos = entries.iter().position(|e| e.key == *key)?;
    let removed = entries.remove(pos);
    let delta = removed.contribution();
    *adhash = adhash.wrapping_sub(delta);

    if entries.len() == 1 {
        let remaining = entries.remove(0);
        *owned = Node::singleton(remaining, 0);
    }

    Some(RemoveOutcome { old_value: removed.value, adhash_delta: delta, now_empty: false })
}
