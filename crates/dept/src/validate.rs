//! Pre-write checks for department mutations.

use std::collections::HashMap;

use consolekit_core::{
    DomainError, DomainResult, ListFilter, Node, NodeId, NodeStore, ValidationRule,
    would_create_cycle,
};

use crate::config::DeptRules;
use crate::model::{DeptChanges, DeptDraft, Department};

pub struct DeptValidator<'a, S: ?Sized> {
    store: &'a S,
    rules: &'a DeptRules,
}

impl<'a, S> DeptValidator<'a, S>
where
    S: NodeStore<Department> + ?Sized,
{
    pub fn new(store: &'a S, rules: &'a DeptRules) -> Self {
        Self { store, rules }
    }

    pub fn validate_for_create(&self, draft: &DeptDraft) -> DomainResult<()> {
        self.check_name(&draft.name, None)?;
        let parent = NodeId::parent_or_root(draft.parent_id.as_ref());
        self.check_parent(None, &parent)
    }

    /// Name uniqueness is only re-checked when the name changes; parent
    /// rules only when the parent moves.
    pub fn validate_for_update(&self, existing: &Department, changes: &DeptChanges) -> DomainResult<()> {
        if let Some(name) = &changes.name {
            if name.trim() != existing.name {
                self.check_name(name, Some(&existing.id))?;
            }
        }
        if let Some(parent) = &changes.parent_id {
            let parent = NodeId::parent_or_root(Some(parent));
            if parent != existing.parent_id {
                self.check_parent(Some(&existing.id), &parent)?;
            }
        }
        Ok(())
    }

    fn check_name(&self, raw: &str, id: Option<&NodeId>) -> DomainResult<()> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(DomainError::validation(
                "name",
                ValidationRule::Required,
                "department name is required",
            ));
        }
        let len = name.chars().count();
        if len < self.rules.name_min || len > self.rules.name_max {
            return Err(DomainError::validation(
                "name",
                ValidationRule::Length,
                format!(
                    "department name must be {}-{} characters",
                    self.rules.name_min, self.rules.name_max
                ),
            ));
        }
        if self.store.exists_by_name(name, id)? {
            return Err(DomainError::validation(
                "name",
                ValidationRule::Unique,
                format!("department '{name}' already exists"),
            ));
        }
        Ok(())
    }

    fn check_parent(&self, id: Option<&NodeId>, parent: &NodeId) -> DomainResult<()> {
        if parent.is_root() {
            return Ok(());
        }
        if id == Some(parent) {
            return Err(DomainError::validation(
                "pid",
                ValidationRule::SelfParent,
                "a department cannot be its own parent",
            ));
        }
        if !self.store.get(parent)?.is_some_and(|p| !p.is_deleted()) {
            return Err(DomainError::validation(
                "pid",
                ValidationRule::MissingParent,
                format!("parent department '{parent}' does not exist"),
            ));
        }
        let Some(id) = id else {
            return Ok(());
        };
        let parents: HashMap<NodeId, NodeId> = self
            .store
            .list(&ListFilter::live())?
            .into_iter()
            .map(|d| (d.id, d.parent_id))
            .collect();
        if would_create_cycle(&parents, id, parent, &NodeId::root()) {
            return Err(DomainError::validation(
                "pid",
                ValidationRule::Cycle,
                format!("department '{parent}' sits below '{id}'"),
            ));
        }
        Ok(())
    }
}
