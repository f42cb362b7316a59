//! Role-scoped menu visibility.
//!
//! A user sees the menus their roles grant plus every ancestor needed to
//! reach them from the top of the tree. Buttons are permission codes, not
//! navigation, and never show up in the result.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use consolekit_core::{Node, NodeId, assemble, sort_forest};

use crate::model::{MenuKind, MenuNode};

/// Close `assigned` over parent links.
///
/// The climb from each assigned id stops at ROOT, at an id already in the
/// set, or at an ancestor that is missing, soft-deleted or disabled. A
/// disabled ancestor is left out while the assigned node stays, so the node
/// later surfaces as an orphan root.
pub fn ancestor_closure(assigned: &HashSet<NodeId>, all: &[MenuNode]) -> HashSet<NodeId> {
    let live: HashMap<&NodeId, &MenuNode> = all
        .iter()
        .filter(|n| !n.is_deleted())
        .map(|n| (&n.id, n))
        .collect();

    let mut visible: HashSet<NodeId> = HashSet::with_capacity(assigned.len() * 2);
    for id in assigned {
        let Some(node) = live.get(id) else {
            continue;
        };
        if !visible.insert(id.clone()) {
            continue;
        }
        let mut cursor = node.parent_id.clone();
        loop {
            if cursor.is_root() || visible.contains(&cursor) {
                break;
            }
            match live.get(&cursor) {
                Some(parent) if parent.status.is_enabled() => {
                    visible.insert(cursor.clone());
                    cursor = parent.parent_id.clone();
                }
                _ => break,
            }
        }
    }
    visible
}

/// The navigable tree for a user holding `assigned` menu ids.
pub fn visible_menu_tree(assigned: &HashSet<NodeId>, all: Vec<MenuNode>) -> Vec<MenuNode> {
    if assigned.is_empty() {
        return Vec::new();
    }
    let closure = ancestor_closure(assigned, &all);
    debug!(assigned = assigned.len(), visible = closure.len(), "resolved menu closure");

    let rows: Vec<MenuNode> = all
        .into_iter()
        .filter(|n| !n.is_deleted() && n.kind != MenuKind::Button && closure.contains(&n.id))
        .collect();
    let mut forest = assemble(rows, &NodeId::root());
    sort_forest(&mut forest, &MenuNode::display_order);
    forest
}
