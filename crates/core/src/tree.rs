//! Generic forest assembly from flat parent-linked rows.
//!
//! Nothing in here knows what a menu or a department is; callers hand in
//! anything implementing [`TreeNode`].

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::{NodeId, TreeNode};

/// Assemble a flat list into a forest.
///
/// - Nodes whose parent is `root` (or blank) become roots.
/// - Nodes whose parent is absent from `nodes` are orphans: they are promoted
///   to roots and logged, never dropped.
/// - Nodes only reachable through a cycle are promoted to roots as well.
/// - Sibling order follows input order.
///
/// When an id occurs more than once, children attach to its first occurrence.
pub fn assemble<N: TreeNode>(nodes: Vec<N>, root: &NodeId) -> Vec<N> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let len = nodes.len();
    let mut index: HashMap<&NodeId, usize> = HashMap::with_capacity(len);
    for (pos, node) in nodes.iter().enumerate() {
        match index.entry(node.id()) {
            Entry::Occupied(_) => warn!(id = %node.id(), "duplicate node id; keeping the first occurrence as parent"),
            Entry::Vacant(slot) => {
                slot.insert(pos);
            }
        }
    }

    let mut child_slots: Vec<Vec<usize>> = vec![Vec::new(); len];
    let mut parent_slot: Vec<Option<usize>> = vec![None; len];
    let mut roots: Vec<usize> = Vec::new();
    let mut orphans = 0usize;

    for (pos, node) in nodes.iter().enumerate() {
        let parent = node.parent_id();
        if parent == root || parent.as_str().trim().is_empty() {
            roots.push(pos);
            continue;
        }
        match index.get(parent) {
            Some(&ppos) if ppos != pos => {
                child_slots[ppos].push(pos);
                parent_slot[pos] = Some(ppos);
            }
            Some(_) => {
                warn!(id = %node.id(), "node lists itself as parent; promoting to root");
                roots.push(pos);
            }
            None => {
                orphans += 1;
                warn!(id = %node.id(), parent_id = %parent, "orphan node: parent not found; promoting to root");
                roots.push(pos);
            }
        }
    }
    drop(index);

    if orphans > 0 {
        warn!(count = orphans, "promoted orphan nodes to roots while assembling tree");
    }

    // Anything not reachable from a root sits on a cycle; cut it loose at the
    // first unreachable node so no row disappears.
    let mut reachable = vec![false; len];
    mark_reachable(&roots, &child_slots, &mut reachable);
    for pos in 0..len {
        if reachable[pos] {
            continue;
        }
        if let Some(ppos) = parent_slot[pos] {
            child_slots[ppos].retain(|&c| c != pos);
        }
        warn!(id = %nodes[pos].id(), "node is part of a parent cycle; promoting to root");
        roots.push(pos);
        mark_reachable(&[pos], &child_slots, &mut reachable);
    }

    let mut slots: Vec<Option<N>> = nodes.into_iter().map(Some).collect();
    roots
        .into_iter()
        .filter_map(|pos| build(pos, &child_slots, &mut slots))
        .collect()
}

fn mark_reachable(start: &[usize], child_slots: &[Vec<usize>], reachable: &mut [bool]) {
    let mut stack: Vec<usize> = start.to_vec();
    while let Some(pos) = stack.pop() {
        if reachable[pos] {
            continue;
        }
        reachable[pos] = true;
        stack.extend(child_slots[pos].iter().copied());
    }
}

fn build<N: TreeNode>(pos: usize, child_slots: &[Vec<usize>], slots: &mut [Option<N>]) -> Option<N> {
    let mut node = slots[pos].take()?;
    let children: Vec<N> = child_slots[pos]
        .iter()
        .filter_map(|&child| build(child, child_slots, slots))
        .collect();
    let list = node.children_mut();
    list.clear();
    list.extend(children);
    Some(node)
}

/// Flatten a forest back into a pre-order list with children detached.
pub fn flatten<N: TreeNode>(forest: Vec<N>) -> Vec<N> {
    let mut out = Vec::new();
    let mut stack: Vec<N> = forest.into_iter().rev().collect();
    while let Some(mut node) = stack.pop() {
        let children = core::mem::take(node.children_mut());
        stack.extend(children.into_iter().rev());
        out.push(node);
    }
    out
}

/// Stable-sort every level of a forest by `key`.
pub fn sort_forest<N, K, F>(forest: &mut [N], key: &F)
where
    N: TreeNode,
    K: Ord,
    F: Fn(&N) -> K,
{
    forest.sort_by_key(|n| key(n));
    for node in forest.iter_mut() {
        sort_forest(node.children_mut(), key);
    }
}

/// Would re-parenting `node` under `new_parent` close a loop?
///
/// `parents` maps each known id to its current parent. The walk starts at
/// `new_parent` and climbs; it stops at `root`, at an unknown id, or when it
/// revisits an id (an existing loop elsewhere is not this change's fault).
pub fn would_create_cycle(
    parents: &HashMap<NodeId, NodeId>,
    node: &NodeId,
    new_parent: &NodeId,
    root: &NodeId,
) -> bool {
    let mut seen: HashSet<&NodeId> = HashSet::new();
    let mut cursor = new_parent;
    loop {
        if cursor == node {
            return true;
        }
        if cursor == root || !seen.insert(cursor) {
            return false;
        }
        match parents.get(cursor) {
            Some(parent) => cursor = parent,
            None => return false,
        }
    }
}
