use std::collections::HashMap;
use std::sync::RwLock;

use consolekit_core::{ListFilter, Node, NodeId, NodeStore, StoreError};
use tracing::debug;

/// In-memory node store for tests/dev.
///
/// Rows keep insertion order. Name and path uniqueness among live rows is
/// re-checked under the write lock, so a create racing another create with
/// the same name fails with [`StoreError::UniqueViolation`] instead of
/// silently writing a duplicate.
#[derive(Debug)]
pub struct InMemoryNodeStore<N> {
    inner: RwLock<Rows<N>>,
}

#[derive(Debug)]
struct Rows<N> {
    order: Vec<NodeId>,
    by_id: HashMap<NodeId, N>,
}

impl<N> Default for Rows<N> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<N: Node> Rows<N> {
    fn live(&self) -> impl Iterator<Item = &N> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .filter(|n| !n.is_deleted())
    }

    fn name_taken(&self, name: &str, exclude: Option<&NodeId>) -> bool {
        self.live()
            .any(|n| n.name() == name && Some(n.id()) != exclude)
    }

    fn path_taken(&self, path: &str, exclude: Option<&NodeId>) -> bool {
        self.live()
            .any(|n| n.path() == Some(path) && Some(n.id()) != exclude)
    }

    fn check_unique(&self, node: &N) -> Result<(), StoreError> {
        if node.is_deleted() {
            return Ok(());
        }
        if self.name_taken(node.name(), Some(node.id())) {
            return Err(StoreError::UniqueViolation {
                field: "name",
                value: node.name().to_string(),
            });
        }
        if let Some(path) = node.path() {
            if self.path_taken(path, Some(node.id())) {
                return Err(StoreError::UniqueViolation {
                    field: "path",
                    value: path.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl<N> InMemoryNodeStore<N> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Rows::default()),
        }
    }
}

impl<N> Default for InMemoryNodeStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Node> InMemoryNodeStore<N> {
    /// Build a store pre-populated with `nodes`, bypassing uniqueness checks.
    pub fn seeded(nodes: impl IntoIterator<Item = N>) -> Self {
        let mut rows = Rows::default();
        for node in nodes {
            let id = node.id().clone();
            if rows.by_id.insert(id.clone(), node).is_none() {
                rows.order.push(id);
            }
        }
        Self {
            inner: RwLock::new(rows),
        }
    }
}

impl<N: Node> NodeStore<N> for InMemoryNodeStore<N> {
    fn get(&self, id: &NodeId) -> Result<Option<N>, StoreError> {
        let rows = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.by_id.get(id).cloned())
    }

    fn list(&self, filter: &ListFilter) -> Result<Vec<N>, StoreError> {
        let rows = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rows
            .order
            .iter()
            .filter_map(|id| rows.by_id.get(id))
            .filter(|n| filter.include_deleted || !n.is_deleted())
            .filter(|n| filter.status.is_none_or(|s| n.status() == s))
            .cloned()
            .collect())
    }

    fn insert(&self, node: N) -> Result<(), StoreError> {
        let mut rows = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if rows.by_id.contains_key(node.id()) {
            return Err(StoreError::DuplicateId(node.id().to_string()));
        }
        rows.check_unique(&node)?;
        let id = node.id().clone();
        rows.order.push(id.clone());
        rows.by_id.insert(id, node);
        Ok(())
    }

    fn update(&self, node: N) -> Result<(), StoreError> {
        let mut rows = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if !rows.by_id.contains_key(node.id()) {
            return Err(StoreError::Missing(node.id().to_string()));
        }
        rows.check_unique(&node)?;
        rows.by_id.insert(node.id().clone(), node);
        Ok(())
    }

    fn update_many(&self, nodes: Vec<N>) -> Result<(), StoreError> {
        let mut rows = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if let Some(missing) = nodes.iter().find(|n| !rows.by_id.contains_key(n.id())) {
            return Err(StoreError::Missing(missing.id().to_string()));
        }

        // Stage the whole batch, check it, then commit by swapping rows in.
        let mut staged: HashMap<NodeId, N> = rows.by_id.clone();
        for node in &nodes {
            staged.insert(node.id().clone(), node.clone());
        }
        let candidate = Rows {
            order: rows.order.clone(),
            by_id: staged,
        };
        for node in &nodes {
            candidate.check_unique(node)?;
        }

        debug!(count = nodes.len(), "committing batch update");
        rows.by_id = candidate.by_id;
        Ok(())
    }

    fn soft_delete(&self, id: &NodeId) -> Result<(), StoreError> {
        let mut rows = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        match rows.by_id.get_mut(id) {
            Some(node) => {
                node.mark_deleted();
                Ok(())
            }
            None => Err(StoreError::Missing(id.to_string())),
        }
    }

    fn count_children(&self, parent: &NodeId) -> Result<usize, StoreError> {
        let rows = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.live().filter(|n| n.parent_id() == parent).count())
    }

    fn exists_by_name(&self, name: &str, exclude: Option<&NodeId>) -> Result<bool, StoreError> {
        let rows = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.name_taken(name, exclude))
    }

    fn exists_by_path(&self, path: &str, exclude: Option<&NodeId>) -> Result<bool, StoreError> {
        let rows = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.path_taken(path, exclude))
    }
}
