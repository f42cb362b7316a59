//! Atomic drag-and-drop reordering of menu entries.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use consolekit_core::{
    DomainError, DomainResult, ListFilter, NodeId, NodeStore, ValidationRule, would_create_cycle,
};

use crate::model::{MenuMeta, MenuNode, checked_order};

/// One entry of a reorder batch: where the node goes and its new `meta`
/// (which must carry `order`). Only `order` is taken from `meta`; every other
/// key of the stored entry is kept as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderOp {
    pub id: NodeId,
    #[serde(default, rename = "pid")]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub meta: Option<MenuMeta>,
}

impl ReorderOp {
    pub fn new(id: impl Into<NodeId>, parent_id: impl Into<NodeId>, order: u32) -> Self {
        let mut meta = MenuMeta::new();
        meta.insert(crate::model::META_ORDER.to_string(), order.into());
        Self {
            id: id.into(),
            parent_id: Some(parent_id.into()),
            meta: Some(meta),
        }
    }
}

/// Check a whole batch against the live rows in `current` and return the
/// rows as they will be written. Nothing is written here.
pub fn plan_reorder(ops: &[ReorderOp], current: &[MenuNode]) -> DomainResult<Vec<MenuNode>> {
    if ops.is_empty() {
        return Err(DomainError::validation(
            "ops",
            ValidationRule::Empty,
            "reorder batch is empty",
        ));
    }

    let by_id: HashMap<&NodeId, &MenuNode> = current.iter().map(|n| (&n.id, n)).collect();
    let mut seen: HashSet<&NodeId> = HashSet::with_capacity(ops.len());
    let mut moves: Vec<(&MenuNode, NodeId, u32)> = Vec::with_capacity(ops.len());

    for op in ops {
        if op.id.as_str().trim().is_empty() {
            return Err(DomainError::validation("id", ValidationRule::Required, "menu id is required"));
        }
        if !seen.insert(&op.id) {
            return Err(DomainError::validation(
                "id",
                ValidationRule::Duplicate,
                format!("menu '{}' appears more than once", op.id),
            ));
        }
        let Some(&node) = by_id.get(&op.id) else {
            return Err(DomainError::validation(
                "id",
                ValidationRule::UnknownNode,
                format!("menu '{}' does not exist", op.id),
            ));
        };
        let parent = NodeId::parent_or_root(op.parent_id.as_ref());
        if parent == op.id {
            return Err(DomainError::validation(
                "pid",
                ValidationRule::SelfParent,
                format!("menu '{}' cannot be its own parent", op.id),
            ));
        }
        if !parent.is_root() && !by_id.contains_key(&parent) {
            return Err(DomainError::validation(
                "pid",
                ValidationRule::MissingParent,
                format!("parent menu '{parent}' does not exist"),
            ));
        }
        let order = checked_order(op.meta.as_ref(), true)?.unwrap_or_default();
        moves.push((node, parent, order));
    }

    // Simulate the batch: every move applied at once must still leave a tree.
    let mut parents: HashMap<NodeId, NodeId> = current
        .iter()
        .map(|n| (n.id.clone(), n.parent_id.clone()))
        .collect();
    for (node, parent, _) in &moves {
        parents.insert(node.id.clone(), parent.clone());
    }
    let root = NodeId::root();
    for (node, parent, _) in &moves {
        if would_create_cycle(&parents, &node.id, parent, &root) {
            return Err(DomainError::validation(
                "pid",
                ValidationRule::Cycle,
                format!("moving menu '{}' under '{parent}' creates a cycle", node.id),
            ));
        }
    }

    Ok(moves
        .into_iter()
        .map(|(node, parent, order)| {
            let mut next = node.clone();
            next.parent_id = parent;
            next.children.clear();
            next.set_order(order);
            next
        })
        .collect())
}

/// Applies reorder batches against a menu store.
pub struct ReorderCoordinator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> ReorderCoordinator<'a, S>
where
    S: NodeStore<MenuNode> + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Validate the whole batch, then write it with one `update_many`.
    /// Returns the number of rows written.
    #[instrument(skip_all, fields(ops = ops.len()))]
    pub fn apply_reorder(&self, ops: &[ReorderOp]) -> DomainResult<usize> {
        let current = self.store.list(&ListFilter::live())?;
        let planned = plan_reorder(ops, &current)?;
        let count = planned.len();
        self.store.update_many(planned)?;
        info!(count, "menus reordered");
        Ok(count)
    }
}
