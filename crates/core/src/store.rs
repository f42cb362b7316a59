//! Contracts the core consumes from its storage collaborators.

use std::collections::HashSet;
use std::sync::Arc;

use crate::{NodeId, NodeStatus, StoreError, UserId};

/// Listing filter. Soft-deleted rows are excluded unless asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub status: Option<NodeStatus>,
    pub include_deleted: bool,
}

impl ListFilter {
    /// Every live row, enabled or not.
    pub fn live() -> Self {
        Self::default()
    }

    /// Live rows that are enabled.
    pub fn enabled() -> Self {
        Self {
            status: Some(NodeStatus::Enabled),
            include_deleted: false,
        }
    }
}

/// Keyed record store for one node kind.
///
/// `get` returns soft-deleted rows too (callers decide how to treat them);
/// every predicate and `list` ignore them. Name and path predicates take an
/// optional id to exclude so that an update never collides with itself.
pub trait NodeStore<N>: Send + Sync {
    fn get(&self, id: &NodeId) -> Result<Option<N>, StoreError>;

    /// Rows in insertion order.
    fn list(&self, filter: &ListFilter) -> Result<Vec<N>, StoreError>;

    fn insert(&self, node: N) -> Result<(), StoreError>;

    fn update(&self, node: N) -> Result<(), StoreError>;

    /// Replace several rows as one unit: either every row is written or none.
    fn update_many(&self, nodes: Vec<N>) -> Result<(), StoreError>;

    fn soft_delete(&self, id: &NodeId) -> Result<(), StoreError>;

    /// Number of live rows whose parent is `parent`.
    fn count_children(&self, parent: &NodeId) -> Result<usize, StoreError>;

    fn exists_by_name(&self, name: &str, exclude: Option<&NodeId>) -> Result<bool, StoreError>;

    fn exists_by_path(&self, _path: &str, _exclude: Option<&NodeId>) -> Result<bool, StoreError> {
        Ok(false)
    }
}

impl<N, S> NodeStore<N> for Arc<S>
where
    S: NodeStore<N> + ?Sized,
{
    fn get(&self, id: &NodeId) -> Result<Option<N>, StoreError> {
        (**self).get(id)
    }

    fn list(&self, filter: &ListFilter) -> Result<Vec<N>, StoreError> {
        (**self).list(filter)
    }

    fn insert(&self, node: N) -> Result<(), StoreError> {
        (**self).insert(node)
    }

    fn update(&self, node: N) -> Result<(), StoreError> {
        (**self).update(node)
    }

    fn update_many(&self, nodes: Vec<N>) -> Result<(), StoreError> {
        (**self).update_many(nodes)
    }

    fn soft_delete(&self, id: &NodeId) -> Result<(), StoreError> {
        (**self).soft_delete(id)
    }

    fn count_children(&self, parent: &NodeId) -> Result<usize, StoreError> {
        (**self).count_children(parent)
    }

    fn exists_by_name(&self, name: &str, exclude: Option<&NodeId>) -> Result<bool, StoreError> {
        (**self).exists_by_name(name, exclude)
    }

    fn exists_by_path(&self, path: &str, exclude: Option<&NodeId>) -> Result<bool, StoreError> {
        (**self).exists_by_path(path, exclude)
    }
}

/// Role-assignment lookup: which menu ids a user reaches through their roles.
///
/// The User→Role→Menu join lives outside the core.
pub trait AssignmentLookup: Send + Sync {
    fn assigned_menu_ids(&self, user: &UserId) -> Result<HashSet<NodeId>, StoreError>;
}

impl<S> AssignmentLookup for Arc<S>
where
    S: AssignmentLookup + ?Sized,
{
    fn assigned_menu_ids(&self, user: &UserId) -> Result<HashSet<NodeId>, StoreError> {
        (**self).assigned_menu_ids(user)
    }
}
