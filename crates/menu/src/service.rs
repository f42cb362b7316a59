//! Menu use-cases: the surface the API layer calls.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use consolekit_auth::{SessionClaims, Signer, validate_claims};
use consolekit_core::{
    AssignmentLookup, DomainError, DomainResult, ListFilter, Node, NodeId, NodeStore, assemble,
    sort_forest,
};

use crate::config::MenuRules;
use crate::model::{MenuChanges, MenuDraft, MenuKind, MenuNode};
use crate::module_label::ModuleLabelCache;
use crate::reorder::{ReorderCoordinator, ReorderOp};
use crate::validate::MenuValidator;
use crate::visible::visible_menu_tree;

/// Separator between ancestor titles in a breadcrumb.
pub const NAME_CHAIN_SEPARATOR: &str = " - ";

pub struct MenuService<S> {
    store: S,
    rules: MenuRules,
}

impl<S> MenuService<S>
where
    S: NodeStore<MenuNode>,
{
    pub fn new(store: S) -> Self {
        Self::with_rules(store, MenuRules::default())
    }

    pub fn with_rules(store: S, rules: MenuRules) -> Self {
        Self { store, rules }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn rules(&self) -> &MenuRules {
        &self.rules
    }

    /// Every live menu as a forest, siblings ordered by `meta.order`.
    pub fn list_tree(&self) -> DomainResult<Vec<MenuNode>> {
        self.sorted_tree(&ListFilter::live())
    }

    /// Enabled menus only; what a role editor may grant.
    pub fn assignable_tree(&self) -> DomainResult<Vec<MenuNode>> {
        self.sorted_tree(&ListFilter::enabled())
    }

    fn sorted_tree(&self, filter: &ListFilter) -> DomainResult<Vec<MenuNode>> {
        let rows = self.store.list(filter)?;
        let mut forest = assemble(rows, &NodeId::root());
        sort_forest(&mut forest, &MenuNode::display_order);
        Ok(forest)
    }

    /// Navigable tree for a user holding `assigned` menu ids.
    #[instrument(skip_all, fields(assigned = assigned.len()))]
    pub fn visible_menus(&self, assigned: &HashSet<NodeId>) -> DomainResult<Vec<MenuNode>> {
        if assigned.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.store.list(&ListFilter::live())?;
        Ok(visible_menu_tree(assigned, rows))
    }

    /// Navigable tree for the bearer of `claims`. Missing or stale claims see
    /// nothing.
    pub fn visible_menus_for<L>(
        &self,
        claims: Option<&SessionClaims>,
        lookup: &L,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<MenuNode>>
    where
        L: AssignmentLookup + ?Sized,
    {
        let Some(claims) = claims else {
            return Ok(Vec::new());
        };
        if let Err(err) = validate_claims(claims, now) {
            debug!(user_id = %claims.sub, %err, "rejecting session claims");
            return Ok(Vec::new());
        }
        let assigned = lookup.assigned_menu_ids(&claims.sub)?;
        self.visible_menus(&assigned)
    }

    /// Navigable tree for the bearer of `token`. A token the signer rejects
    /// sees nothing.
    pub fn visible_menus_for_token<G, L>(
        &self,
        token: &str,
        signer: &G,
        lookup: &L,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<MenuNode>>
    where
        G: Signer + ?Sized,
        L: AssignmentLookup + ?Sized,
    {
        match signer.verify(token) {
            Ok(claims) => self.visible_menus_for(Some(&claims), lookup, now),
            Err(err) => {
                debug!(%err, "bearer token rejected");
                Ok(Vec::new())
            }
        }
    }

    /// Auth codes of the enabled buttons among `assigned`, in store order.
    pub fn access_codes(&self, assigned: &HashSet<NodeId>) -> DomainResult<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(self
            .store
            .list(&ListFilter::enabled())?
            .into_iter()
            .filter(|n| n.kind == MenuKind::Button && assigned.contains(&n.id))
            .filter_map(|n| n.auth_code)
            .filter(|code| !code.trim().is_empty() && seen.insert(code.clone()))
            .collect())
    }

    /// A live menu by id.
    pub fn menu(&self, id: &NodeId) -> DomainResult<MenuNode> {
        match self.store.get(id)? {
            Some(node) if !node.is_deleted() => Ok(node),
            _ => Err(DomainError::not_found(MenuNode::KIND, id)),
        }
    }

    #[instrument(skip_all, fields(name = %draft.name))]
    pub fn create(&self, draft: MenuDraft) -> DomainResult<NodeId> {
        let kind = MenuValidator::new(&self.store, &self.rules).validate_for_create(&draft)?;
        let id = NodeId::new();
        let node = MenuNode::from_draft(id.clone(), draft, kind)?;
        self.store.insert(node)?;
        info!(menu_id = %id, %kind, "menu created");
        Ok(id)
    }

    #[instrument(skip_all, fields(menu_id = %id))]
    pub fn update(&self, id: &NodeId, changes: MenuChanges) -> DomainResult<()> {
        let existing = self.menu(id)?;
        let kind = MenuValidator::new(&self.store, &self.rules).validate_for_update(&existing, &changes)?;
        let updated = existing.apply(&changes, kind)?;
        self.store.update(updated)?;
        info!(menu_id = %id, "menu updated");
        Ok(())
    }

    /// Soft-delete a leaf menu. Menus with live children are refused.
    #[instrument(skip_all, fields(menu_id = %id))]
    pub fn delete(&self, id: &NodeId) -> DomainResult<()> {
        self.menu(id)?;
        let children = self.store.count_children(id)?;
        if children > 0 {
            return Err(DomainError::conflict(format!(
                "menu '{id}' still has {children} child entries"
            )));
        }
        self.store.soft_delete(id)?;
        info!(menu_id = %id, "menu deleted");
        Ok(())
    }

    pub fn reorder(&self, ops: &[ReorderOp]) -> DomainResult<()> {
        ReorderCoordinator::new(&self.store).apply_reorder(ops)?;
        Ok(())
    }

    pub fn name_exists(&self, name: &str, exclude: Option<&NodeId>) -> DomainResult<bool> {
        Ok(self.store.exists_by_name(name.trim(), exclude)?)
    }

    pub fn path_exists(&self, path: &str, exclude: Option<&NodeId>) -> DomainResult<bool> {
        Ok(self.store.exists_by_path(path.trim(), exclude)?)
    }

    /// Breadcrumb for the menu routed at `path`: ancestor titles joined with
    /// `" - "`, outermost first. The climb stops at ROOT or at a missing,
    /// deleted or disabled ancestor.
    pub fn name_chain_by_path(&self, path: &str) -> DomainResult<Option<String>> {
        let path = path.trim();
        if path.is_empty() {
            return Ok(None);
        }
        let rows = self.store.list(&ListFilter::live())?;
        let Some(start) = rows.iter().find(|n| n.path.as_deref() == Some(path)) else {
            return Ok(None);
        };
        let by_id: HashMap<&NodeId, &MenuNode> = rows.iter().map(|n| (&n.id, n)).collect();

        let mut names = vec![start.display_name()];
        let mut seen: HashSet<&NodeId> = HashSet::from([&start.id]);
        let mut cursor = &start.parent_id;
        while !cursor.is_root() && seen.insert(cursor) {
            match by_id.get(cursor) {
                Some(&parent) if parent.status.is_enabled() => {
                    names.push(parent.display_name());
                    cursor = &parent.parent_id;
                }
                _ => break,
            }
        }
        names.reverse();
        Ok(Some(names.join(NAME_CHAIN_SEPARATOR)))
    }

    /// Audit label for a page, backed by the caller's cache.
    ///
    /// Never fails: when the menu store cannot be read, the error is logged at
    /// `warn` and the lookup runs against an empty tree, so the caller gets
    /// the fallback label derived from the path instead of an error.
    pub fn module_label(
        &self,
        cache: &mut ModuleLabelCache,
        page_path: &str,
        module_path: Option<&str>,
        now: DateTime<Utc>,
    ) -> String {
        cache.label_for_page(page_path, module_path, now, || {
            self.assignable_tree().unwrap_or_else(|err| {
                warn!(%err, "menu tree unavailable for module labels");
                Vec::new()
            })
        })
    }
}
