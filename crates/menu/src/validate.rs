//! Pre-write checks for menu mutations.
//!
//! Validation only reads from the store; the first failing rule is returned.

use std::collections::HashMap;

use consolekit_core::{
    DomainError, DomainResult, ListFilter, Node, NodeId, NodeStore, ValidationRule,
    would_create_cycle,
};

use crate::config::MenuRules;
use crate::model::{MenuChanges, MenuDraft, MenuKind, MenuNode, checked_order};

pub struct MenuValidator<'a, S: ?Sized> {
    store: &'a S,
    rules: &'a MenuRules,
}

impl<'a, S> MenuValidator<'a, S>
where
    S: NodeStore<MenuNode> + ?Sized,
{
    pub fn new(store: &'a S, rules: &'a MenuRules) -> Self {
        Self { store, rules }
    }

    /// Check a new entry. Returns the parsed kind on success.
    pub fn validate_for_create(&self, draft: &MenuDraft) -> DomainResult<MenuKind> {
        // an explicit non-root parent is checked; an absent one means ROOT
        let parent = draft.parent_id.as_ref().map(|p| NodeId::parent_or_root(Some(p)));
        self.check(draft, None, parent.as_ref())
    }

    /// Check `changes` applied on top of `existing`. The parent rules only run
    /// when the parent actually moves.
    pub fn validate_for_update(
        &self,
        existing: &MenuNode,
        changes: &MenuChanges,
    ) -> DomainResult<MenuKind> {
        let candidate = MenuDraft::merged(existing, changes);
        let new_parent = NodeId::parent_or_root(candidate.parent_id.as_ref());
        let moved = (new_parent != existing.parent_id).then_some(&new_parent);
        self.check(&candidate, Some(&existing.id), moved)
    }

    fn check(
        &self,
        draft: &MenuDraft,
        id: Option<&NodeId>,
        parent: Option<&NodeId>,
    ) -> DomainResult<MenuKind> {
        self.check_name(&draft.name, id)?;
        let kind: MenuKind = draft.kind.parse()?;
        self.check_kind_fields(kind, draft, id)?;
        if let Some(parent) = parent {
            self.check_parent(id, parent)?;
        }
        checked_order(draft.meta.as_ref(), false)?;
        Ok(kind)
    }

    fn check_name(&self, raw: &str, id: Option<&NodeId>) -> DomainResult<()> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(DomainError::validation(
                "name",
                ValidationRule::Required,
                "menu name is required",
            ));
        }
        let len = name.chars().count();
        if len < self.rules.name_min || len > self.rules.name_max {
            return Err(DomainError::validation(
                "name",
                ValidationRule::Length,
                format!(
                    "menu name must be {}-{} characters",
                    self.rules.name_min, self.rules.name_max
                ),
            ));
        }
        if self.store.exists_by_name(name, id)? {
            return Err(DomainError::validation(
                "name",
                ValidationRule::Unique,
                format!("menu name '{name}' already exists"),
            ));
        }
        Ok(())
    }

    fn check_kind_fields(&self, kind: MenuKind, draft: &MenuDraft, id: Option<&NodeId>) -> DomainResult<()> {
        if kind.requires_path() {
            self.check_path(draft.path.as_deref(), id)?;
        }
        if kind == MenuKind::Menu && is_blank(draft.component.as_deref()) {
            return Err(DomainError::validation(
                "component",
                ValidationRule::Required,
                "component is required for menu entries",
            ));
        }
        if kind == MenuKind::Button && is_blank(draft.auth_code.as_deref()) {
            return Err(DomainError::validation(
                "authCode",
                ValidationRule::Required,
                "auth code is required for buttons",
            ));
        }
        if let Some((key, field)) = kind.url_key() {
            let url = draft
                .meta
                .as_ref()
                .and_then(|m| m.get(key))
                .and_then(|v| v.as_str())
                .map(str::trim)
                .unwrap_or_default();
            if url.is_empty() {
                return Err(DomainError::validation(
                    field,
                    ValidationRule::Required,
                    format!("{kind} entries need a target URL"),
                ));
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(DomainError::validation(
                    field,
                    ValidationRule::Format,
                    "URL must start with http:// or https://",
                ));
            }
        }
        Ok(())
    }

    fn check_path(&self, raw: Option<&str>, id: Option<&NodeId>) -> DomainResult<()> {
        let path = raw.map(str::trim).unwrap_or_default();
        if path.is_empty() {
            return Err(DomainError::validation(
                "path",
                ValidationRule::Required,
                "route path is required",
            ));
        }
        let len = path.chars().count();
        if len < self.rules.path_min || len > self.rules.path_max {
            return Err(DomainError::validation(
                "path",
                ValidationRule::Length,
                format!(
                    "route path must be {}-{} characters",
                    self.rules.path_min, self.rules.path_max
                ),
            ));
        }
        if !path.starts_with('/') {
            return Err(DomainError::validation(
                "path",
                ValidationRule::Format,
                "route path must start with '/'",
            ));
        }
        if self.store.exists_by_path(path, id)? {
            return Err(DomainError::validation(
                "path",
                ValidationRule::Unique,
                format!("route path '{path}' already exists"),
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
                "a menu cannot be its own parent",
            ));
        }
        match self.store.get(parent)? {
            Some(p) if !p.is_deleted() => {}
            _ => {
                return Err(DomainError::validation(
                    "pid",
                    ValidationRule::MissingParent,
                    format!("parent menu '{parent}' does not exist"),
                ));
            }
        }
        if let Some(id) = id {
            let parents: HashMap<NodeId, NodeId> = self
                .store
                .list(&ListFilter::live())?
                .into_iter()
                .map(|n| (n.id, n.parent_id))
                .collect();
            if would_create_cycle(&parents, id, parent, &NodeId::root()) {
                return Err(DomainError::validation(
                    "pid",
                    ValidationRule::Cycle,
                    format!("menu '{parent}' is a descendant of '{id}'"),
                ));
            }
        }
        Ok(())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
