//! Department use-cases.

use chrono::Utc;
use tracing::{info, instrument};

use consolekit_core::{
    DomainError, DomainResult, ListFilter, Node, NodeId, NodeStore, UserId, assemble,
};

use crate::config::DeptRules;
use crate::model::{DeptChanges, DeptDraft, Department};
use crate::validate::DeptValidator;

pub struct DeptService<S> {
    store: S,
    rules: DeptRules,
}

impl<S> DeptService<S>
where
    S: NodeStore<Department>,
{
    pub fn new(store: S) -> Self {
        Self::with_rules(store, DeptRules::default())
    }

    pub fn with_rules(store: S, rules: DeptRules) -> Self {
        Self { store, rules }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Every live department as a forest; siblings keep creation order.
    pub fn list_tree(&self) -> DomainResult<Vec<Department>> {
        let rows = self.store.list(&ListFilter::live())?;
        Ok(assemble(rows, &NodeId::root()))
    }

    pub fn department(&self, id: &NodeId) -> DomainResult<Department> {
        match self.store.get(id)? {
            Some(dept) if !dept.is_deleted() => Ok(dept),
            _ => Err(DomainError::not_found(Department::KIND, id)),
        }
    }

    #[instrument(skip_all, fields(name = %draft.name))]
    pub fn create(&self, draft: DeptDraft, actor: Option<&UserId>) -> DomainResult<NodeId> {
        DeptValidator::new(&self.store, &self.rules).validate_for_create(&draft)?;

        let now = Utc::now();
        let id = NodeId::new();
        let mut dept = Department::new(
            id.clone(),
            NodeId::parent_or_root(draft.parent_id.as_ref()),
            draft.name.trim(),
            now,
        );
        dept.status = draft.status.unwrap_or_default();
        dept.remark = draft.remark.filter(|r| !r.trim().is_empty());
        dept.created_by = actor.cloned();
        dept.updated_by = actor.cloned();

        self.store.insert(dept)?;
        info!(dept_id = %id, "department created");
        Ok(id)
    }

    #[instrument(skip_all, fields(dept_id = %id))]
    pub fn update(&self, id: &NodeId, changes: DeptChanges, actor: Option<&UserId>) -> DomainResult<()> {
        let existing = self.department(id)?;
        DeptValidator::new(&self.store, &self.rules).validate_for_update(&existing, &changes)?;
        self.store.update(changes.apply_to(&existing, actor, Utc::now()))?;
        info!(dept_id = %id, "department updated");
        Ok(())
    }

    /// Soft-delete a department without live sub-departments.
    #[instrument(skip_all, fields(dept_id = %id))]
    pub fn delete(&self, id: &NodeId) -> DomainResult<()> {
        self.department(id)?;
        if self.store.count_children(id)? > 0 {
            return Err(DomainError::conflict(format!(
                "department '{id}' has sub-departments and cannot be deleted"
            )));
        }
        self.store.soft_delete(id)?;
        info!(dept_id = %id, "department deleted");
        Ok(())
    }

    pub fn name_exists(&self, name: &str, exclude: Option<&NodeId>) -> DomainResult<bool> {
        Ok(self.store.exists_by_name(name.trim(), exclude)?)
    }
}
