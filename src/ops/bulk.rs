//! Bulk set algebra over two subtrees: merge (union), intersection, difference.
//!
//! All three share one recursive driver parameterized by [`Op`], since the
//! structural recursion — walk both bitmaps position by position — is
//! identical; only what happens when both sides occupy the same position
//! differs.

use std::hash::Hash;

use archery::{SharedPointer, SharedPointerKind};

use crate::node::{self, Entry, Node};

/// Which bulk operation [`combine`] performs.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Keep every entry from both sides; where both have a key, combine via
    /// the caller-supplied `merge` callback.
    Merge,
    /// Keep only entries whose keys exist on both sides (value taken from `a`).
    Intersect,
    /// Keep only entries from `a` whose keys do not exist in `b`.
    Diff,
}

/// Combines subtrees `a` and `b` under `op`, returning the resulting
/// subtree (or `None` if the result is empty).
///
/// `merge(old, new)` resolves colliding values for [`Op::Merge`]; it is
/// ignored by [`Op::Intersect`] and [`Op::Diff`].
pub fn combine<K, V, P, F>(
    a: Option<&SharedPointer<Node<K, V, P>, P>>,
    b: Option<&SharedPointer<Node<K, V, P>, P>>,
    op: Op,
    shift: u32,
    merge: &F,
) -> Option<SharedPointer<Node<K, V, P>, P>>
where
    K: Hash + Eq + Clone,
    V: Hash + Clone,
    P: SharedPointerKind,
    F: Fn(&V, &V) -> V,
{
    match (a, b) {
        (None, None) => None,
        (Some(a), None) => match op {
            Op::Merge | Op::Diff => Some(SharedPointer::clone(a)),
            Op::Intersect => None,
        },
        (None, Some(b)) => match op {
            Op::Merge => Some(SharedPointer::clone(b)),
            Op::Intersect | Op::Diff => None,
        },
        (Some(a), Some(b)) => {
            if SharedPointer::ptr_eq(a, b) {
                return match op {
                    Op::Merge | Op::Intersect => Some(SharedPointer::clone(a)),
                    Op::Diff => None,
                };
            }
            match (&**a, &**b) {
                (Node::Inner { .. }, Node::Inner { .. }) => {
                    let result = combine_inner_inner(a, b, op, shift, merge);
                    if result.size() == 0 { None } else { Some(result) }
                }
                _ => combine_via_flatten(a, b, op, shift, merge),
            }
        }
    }
}

fn combine_inner_inner<K, V, P, F>(
    a: &SharedPointer<Node<K, V, P>, P>,
    b: &SharedPointer<Node<K, V, P>, P>,
    op: Op,
    shift: u32,
    merge: &F,
) -> SharedPointer<Node<K, V, P>, P>
where
    K: Hash + Eq + Clone,
    V: Hash + Clone,
    P: SharedPointerKind,
    F: Fn(&V, &V) -> V,
{
    let Node::Inner { data_map: a_data, node_map: a_node, entries: a_entries, children: a_children, .. } =
        &**a
    else {
        unreachable!("caller matched Inner")
    };
    let Node::Inner { data_map: b_data, node_map: b_node, entries: b_entries, children: b_children, .. } =
        &**b
    else {
        unreachable!("caller matched Inner")
    };

    let all_bits = a_data | a_node | b_data | b_node;
    let mut out_data = 0u32;
    let mut out_node = 0u32;
    let mut out_entries: Vec<Entry<K, V>> = Vec::new();
    let mut out_children: Vec<SharedPointer<Node<K, V, P>, P>> = Vec::new();

    for frag in 0..32u32 {
        let bit = node::mask(frag);
        if all_bits & bit == 0 {
            continue;
        }

        let a_has_entry = a_data & bit != 0;
        let a_has_child = a_node & bit != 0;
        let b_has_entry = b_data & bit != 0;
        let b_has_child = b_node & bit != 0;

        match (a_has_entry, a_has_child, b_has_entry, b_has_child) {
            // a: inline, b: absent
            (true, false, false, false) => {
                if let Some(e) = keep_a_entry(op, &a_entries[node::index(*a_data, bit)]) {
                    out_data |= bit;
                    out_entries.push(e);
                }
            }
            // a: absent, b: inline
            (false, false, true, false) => {
                if let Some(e) = keep_b_entry(op, &b_entries[node::index(*b_data, bit)]) {
                    out_data |= bit;
                    out_entries.push(e);
                }
            }
            // a: child, b: absent
            (false, true, false, false) => {
                if let Some(c) = keep_a_child(op, &a_children[node::index(*a_node, bit)]) {
                    out_node |= bit;
                    out_children.push(c);
                }
            }
            // a: absent, b: child
            (false, false, false, true) => {
                if let Some(c) = keep_b_child(op, &b_children[node::index(*b_node, bit)]) {
                    out_node |= bit;
                    out_children.push(c);
                }
            }
            // both inline
            (true, false, true, false) => {
                let ea = &a_entries[node::index(*a_data, bit)];
                let eb = &b_entries[node::index(*b_data, bit)];
                if ea.key == eb.key {
                    if let Some(e) = combine_same_key(op, ea, eb, merge) {
                        out_data |= bit;
                        out_entries.push(e);
                    }
                } else {
                    match op {
                        Op::Merge => {
                            let next = shift + node::BITS_PER_LEVEL;
                            let sub = super::insert::create_subtree(ea.clone(), eb.clone(), next);
                            out_node |= bit;
                            out_children.push(sub);
                        }
                        Op::Intersect => {}
                        Op::Diff => {
                            out_data |= bit;
                            out_entries.push(ea.clone());
                        }
                    }
                }
            }
            // a inline, b child
            (true, false, false, true) => {
                let ea = &a_entries[node::index(*a_data, bit)];
                let child_b = &b_children[node::index(*b_node, bit)];
                match op {
                    Op::Merge => {
                        let singleton = SharedPointer::new(Node::singleton(ea.clone(), shift + node::BITS_PER_LEVEL));
                        let combined = combine(
                            Some(&singleton),
                            Some(child_b),
                            Op::Merge,
                            shift + node::BITS_PER_LEVEL,
                            merge,
                        );
                        place(combined, bit, &mut out_data, &mut out_node, &mut out_entries, &mut out_children);
                    }
                    Op::Intersect => {
                        if super::get::get_recursive(child_b, ea.hash, &ea.key, shift + node::BITS_PER_LEVEL)
                            .is_some()
                        {
                            out_data |= bit;
                            out_entries.push(ea.clone());
                        }
                    }
                    Op::Diff => {
                        if super::get::get_recursive(child_b, ea.hash, &ea.key, shift + node::BITS_PER_LEVEL)
                            .is_none()
                        {
                            out_data |= bit;
                            out_entries.push(ea.clone());
                        }
                    }
                }
            }
            // a child, b inline
            (false, true, true, false) => {
                let child_a = &a_children[node::index(*a_node, bit)];
                let eb = &b_entries[node::index(*b_data, bit)];
                match op {
                    Op::Merge => {
                        let singleton = SharedPointer::new(Node::singleton(eb.clone(), shift + node::BITS_PER_LEVEL));
                        let combined = combine(
                            Some(child_a),
                            Some(&singleton),
                            Op::Merge,
                            shift + node::BITS_PER_LEVEL,
                            merge,
                        );
                        place(combined, bit, &mut out_data, &mut out_node, &mut out_entries, &mut out_children);
                    }
                    Op::Intersect => {
                        if let Some(v) = super::get::get_recursive(
                            child_a,
                            eb.hash,
                            &eb.key,
                            shift + node::BITS_PER_LEVEL,
                        ) {
                            out_data |= bit;
                            out_entries.push(Entry { hash: eb.hash, key: eb.key.clone(), value: v.clone() });
                        }
                    }
                    Op::Diff => {
                        let singleton = SharedPointer::new(Node::singleton(eb.clone(), shift + node::BITS_PER_LEVEL));
                        let combined = combine(
                            Some(child_a),
                            Some(&singleton),
                            Op::Diff,
                            shift + node::BITS_PER_LEVEL,
                            merge,
                        );
                        place(combined, bit, &mut out_data, &mut out_node, &mut out_entries, &mut out_children);
                    }
                }
            }
            // both children
            (false, true, false, true) => {
                let child_a = &a_children[node::index(*a_node, bit)];
                let child_b = &b_children[node::index(*b_node, bit)];
                let combined = combine(Some(child_a), Some(child_b), op, shift + node::BITS_PER_LEVEL, merge);
                place(combined, bit, &mut out_data, &mut out_node, &mut out_entries, &mut out_children);
            }
            _ => unreachable!("data_map and node_map are disjoint within one node"),
        }
    }

    let entries_adhash = out_entries.iter().map(Entry::contribution).fold(0u64, u64::wrapping_add);
    let children_adhash = out_children.iter().map(|c| c.adhash()).fold(0u64, u64::wrapping_add);
    let adhash = entries_adhash.wrapping_add(children_adhash);
    let size = out_entries.len() + out_children.iter().map(|c| c.size()).sum::<usize>();

    SharedPointer::new(Node::Inner {
        data_map: out_data,
        node_map: out_node,
        entries: out_entries,
        children: out_children,
        size,
        adhash,
    })
}

fn place<K, V, P>(
    combined: Option<SharedPointer<Node<K, V, P>, P>>,
    bit: u32,
    out_data: &mut u32,
    out_node: &mut u32,
    out_entries: &mut Vec<Entry<K, V>>,
    out_children: &mut Vec<SharedPointer<Node<K, V, P>, P>>,
) where
    K: Clone,
    V: Clone,
    P: SharedPointerKind,
{
    let Some(combined) = combined else { return };
    if combined.should_inline() {
        let mut entries = Vec::new();
        combined.collect_entries(&mut entries);
        *out_data |= bit;
        out_entries.extend(entries);
    } else {
        *out_node |= bit;
        out_children.push(combined);
    }
}

fn keep_a_entry<K: Clone, V: Clone>(op: Op, e: &Entry<K, V>) -> Option<Entry<K, V>> {
    match op {
        Op::Merge | Op::Diff => Some(e.clone()),
        Op::Intersect => None,
    }
}

fn keep_b_entry<K: Clone, V: Clone>(op: Op, e: &Entry<K, V>) -> Option<Entry<K, V>> {
    match op {
        Op::Merge => Some(e.clone()),
        Op::Intersect | Op::Diff => None,
    }
}

fn keep_a_child<K, V, P: SharedPointerKind>(
    op: Op,
    c: &SharedPointer<Node<K, V, P>, P>,
) -> Option<SharedPointer<Node<K, V, P>, P>> {
    match op {
        Op::Merge | Op::Diff => Some(SharedPointer::clone(c)),
        Op::Intersect => None,
    }
}

fn keep_b_child<K, V, P: SharedPointerKind>(
    op: Op,
    c: &SharedPointer<Node<K, V, P>, P>,
) -> Option<SharedPointer<Node<K, V, P>, P>> {
    match op {
        Op::Merge => Some(SharedPointer::clone(c)),
        Op::Intersect | Op::Diff => None,
    }
}

fn combine_same_key<K: Clone, V: Clone, F: Fn(&V, &V) -> V>(
    op: Op,
    a: &Entry<K, V>,
    b: &Entry<K, V>,
    merge: &F,
) -> Option<Entry<K, V>> {
    match op {
        Op::Merge => Some(Entry { hash: a.hash, key: a.key.clone(), value: merge(&a.value, &b.value) }),
        Op::Intersect => Some(a.clone()),
        Op::Diff => None,
    }
}

/// Falls back to flattening both subtrees and combining entrywise.
///
/// Taken whenever either side of a position is a [`Node::Collision`] node —
/// such subtrees are rare (they only occur on genuine 64-bit hash
/// collisions) and always small, so an O(n·m) comparison is cheap in
/// practice and far simpler than extending the bitmap matrix to cover
/// collision nodes directly.
fn combine_via_flatten<K, V, P, F>(
    a: &SharedPointer<Node<K, V, P>, P>,
    b: &SharedPointer<Node<K, V, P>, P>,
    op: Op,
    shift: u32,
    merge: &F,
) -> Option<SharedPointer<Node<K, V, P>, P>>
where
    K: Hash + Eq + Clone,
    V: Hash + Clone,
    P: SharedPointerKind,
    F: Fn(&V, &V) -> V,
{
    let mut a_entries = Vec::new();
    a.collect_entries(&mut a_entries);
    let mut b_entries = Vec::new();
    b.collect_entries(&mut b_entries);

    let mut result: Vec<Entry<K, V>> = Vec::new();

    match op {
        Op::Merge => {
            result.extend(a_entries.iter().cloned());
            for eb in b_entries {
                if let Some(slot) = result.iter_mut().find(|ea| ea.key == eb.key) {
                    slot.value = merge(&slot.value, &eb.value);
                } else {
                    result.push(eb);
                }
            }
        }
        Op::Intersect => {
            for ea in &a_entries {
                if b_entries.iter().any(|eb| eb.key == ea.key) {
                    result.push(ea.clone());
                }
            }
        }
        Op::Diff => {
            for ea in &a_entries {
                if !b_entries.iter().any(|eb| eb.key == ea.key) {
                    result.push(ea.clone());
                }
            }
        }
    }

    if result.is_empty() {
        return None;
    }

    let mut out: Option<SharedPointer<Node<K, V, P>, P>> = None;
    for entry in result {
        match out {
            None => out = Some(SharedPointer::new(Node::singleton(entry, shift))),
            Some(existing) => {
                let mut root = existing;
                let _ = super::insert::insert_recursive(&mut root, entry, |_old, new| new, shift);
                out = Some(root);
            }
        }
    }
    out
}
