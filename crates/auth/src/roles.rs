//! Roles and the User→Role→Menu assignment graph.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use consolekit_core::{
    AssignmentLookup, DomainError, DomainResult, NodeId, NodeStatus, Page, PageRequest, RoleId,
    StoreError, TimeRange, UserId, ValidationRule, contains_keyword,
};

/// A role and the menu entries it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub status: NodeStatus,
    pub remark: Option<String>,
    /// Menu ids this role may reach (the role→menu edges).
    pub permissions: Vec<NodeId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDraft {
    pub name: String,
    pub status: Option<NodeStatus>,
    pub remark: Option<String>,
    #[serde(default)]
    pub permissions: Vec<NodeId>,
}

/// Partial role update.
///
/// `remark: Some("")` clears the remark. `permissions: Some(vec![])` clears
/// every menu grant; `None` leaves grants untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChanges {
    pub name: Option<String>,
    pub status: Option<NodeStatus>,
    pub remark: Option<String>,
    pub permissions: Option<Vec<NodeId>>,
}

/// Filter for role listings.
///
/// A non-blank `search` matches a role whose name contains it or whose id
/// equals it, and takes precedence over `id` and `name`. Without it, `id`
/// must match exactly and `name` is a substring match. `remark` is a
/// substring match; text matches ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleQuery {
    pub search: Option<String>,
    pub id: Option<RoleId>,
    pub name: Option<String>,
    pub remark: Option<String>,
    pub status: Option<NodeStatus>,
    pub created: TimeRange,
}

impl RoleQuery {
    pub fn matches(&self, role: &Role) -> bool {
        let search = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let identity = match search {
            Some(term) => contains_keyword(&role.name, term) || role.id.as_str() == term,
            None => {
                self.id.as_ref().is_none_or(|id| id.as_str().trim().is_empty() || &role.id == id)
                    && self.name.as_deref().is_none_or(|n| contains_keyword(&role.name, n))
            }
        };
        identity
            && self
                .remark
                .as_deref()
                .is_none_or(|r| contains_keyword(role.remark.as_deref().unwrap_or_default(), r))
            && self.status.is_none_or(|s| role.status == s)
            && self.created.contains(role.created_at)
    }
}

#[derive(Debug, Default)]
struct Directory {
    roles: Vec<Role>,
    user_roles: HashMap<UserId, Vec<RoleId>>,
}

impl Directory {
    fn position(&self, id: &RoleId) -> Option<usize> {
        self.roles.iter().position(|r| &r.id == id)
    }
}

/// In-memory role directory.
///
/// Every mutation runs under one write lock, so re-linking a role's menu set
/// is atomic with the role update that carries it. The built-in super-admin
/// role cannot be renamed, disabled or deleted.
#[derive(Debug, Default)]
pub struct RoleDirectory {
    inner: RwLock<Directory>,
}

impl RoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory holding the super-admin role with the given grants.
    pub fn with_admin(name: impl Into<String>, permissions: Vec<NodeId>) -> Self {
        let admin = Role {
            id: RoleId::admin(),
            name: name.into(),
            status: NodeStatus::Enabled,
            remark: None,
            permissions,
            created_at: Utc::now(),
        };
        Self {
            inner: RwLock::new(Directory {
                roles: vec![admin],
                user_roles: HashMap::new(),
            }),
        }
    }

    pub fn role(&self, id: &RoleId) -> DomainResult<Role> {
        let dir = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        dir.roles
            .iter()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("role", id))
    }

    pub fn roles(&self) -> DomainResult<Vec<Role>> {
        let dir = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(dir.roles.clone())
    }

    /// Matching roles, newest first, one page at a time.
    pub fn list_roles(&self, query: &RoleQuery, page: PageRequest) -> DomainResult<Page<Role>> {
        let mut found = self.matching(query)?;
        // latest insert first among equal timestamps
        found.reverse();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let page = page.slice(found);
        debug!(total = page.total, returned = page.list.len(), "listed roles");
        Ok(page)
    }

    /// Matching roles for pickers, ordered by name. Paged when `page` is
    /// given, otherwise capped by `limit` (see [`consolekit_core::effective_limit`]).
    pub fn role_options(
        &self,
        query: &RoleQuery,
        page: Option<PageRequest>,
        limit: Option<i64>,
    ) -> DomainResult<Page<Role>> {
        let mut found = self.matching(query)?;
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(match page {
            Some(page) => page.slice(found),
            None => Page::limited(found, limit),
        })
    }

    fn matching(&self, query: &RoleQuery) -> DomainResult<Vec<Role>> {
        let dir = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(dir.roles.iter().filter(|r| query.matches(r)).cloned().collect())
    }

    pub fn create_role(&self, draft: RoleDraft) -> DomainResult<RoleId> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation(
                "name",
                ValidationRule::Required,
                "role name is required",
            ));
        }

        let role = Role {
            id: RoleId::new(),
            name: name.to_string(),
            status: draft.status.unwrap_or_default(),
            remark: draft.remark.filter(|r| !r.trim().is_empty()),
            permissions: dedup(draft.permissions),
            created_at: Utc::now(),
        };
        let id = role.id.clone();

        let mut dir = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        dir.roles.push(role);
        info!(role_id = %id, "role created");
        Ok(id)
    }

    pub fn update_role(&self, id: &RoleId, changes: RoleChanges) -> DomainResult<()> {
        let mut dir = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let pos = dir
            .position(id)
            .ok_or_else(|| DomainError::not_found("role", id))?;
        let role = &mut dir.roles[pos];

        let name = changes
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        if role.id.is_admin() {
            if name.is_some_and(|n| n != role.name) {
                return Err(DomainError::conflict("the super-admin role cannot be renamed"));
            }
            if changes.status == Some(NodeStatus::Disabled) {
                return Err(DomainError::conflict("the super-admin role cannot be disabled"));
            }
        }

        if let Some(name) = name {
            role.name = name.to_string();
        }
        if let Some(status) = changes.status {
            role.status = status;
        }
        if let Some(remark) = changes.remark {
            role.remark = Some(remark).filter(|r| !r.trim().is_empty());
        }
        if let Some(permissions) = changes.permissions {
            role.permissions = dedup(permissions);
        }

        info!(role_id = %id, "role updated");
        Ok(())
    }

    /// Remove a role and its menu grants. Blocked while any user holds it.
    pub fn delete_role(&self, id: &RoleId) -> DomainResult<()> {
        let mut dir = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let pos = dir
            .position(id)
            .ok_or_else(|| DomainError::not_found("role", id))?;
        if id.is_admin() {
            return Err(DomainError::conflict("the super-admin role cannot be deleted"));
        }
        if dir.user_roles.values().any(|roles| roles.contains(id)) {
            return Err(DomainError::conflict("role is assigned to users and cannot be deleted"));
        }
        dir.roles.remove(pos);
        info!(role_id = %id, "role deleted");
        Ok(())
    }

    /// Replace the role set held by `user`.
    pub fn assign_roles(&self, user: &UserId, roles: Vec<RoleId>) -> DomainResult<()> {
        let mut dir = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if let Some(unknown) = roles.iter().find(|r| dir.position(r).is_none()) {
            return Err(DomainError::not_found("role", unknown));
        }
        dir.user_roles.insert(user.clone(), dedup(roles));
        Ok(())
    }

    pub fn roles_of(&self, user: &UserId) -> DomainResult<Vec<RoleId>> {
        let dir = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(dir.user_roles.get(user).cloned().unwrap_or_default())
    }
}

impl AssignmentLookup for RoleDirectory {
    /// Union of the menu grants of every enabled role the user holds.
    fn assigned_menu_ids(&self, user: &UserId) -> Result<HashSet<NodeId>, StoreError> {
        let dir = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let Some(held) = dir.user_roles.get(user) else {
            return Ok(HashSet::new());
        };
        Ok(dir
            .roles
            .iter()
            .filter(|r| r.status.is_enabled() && held.contains(&r.id))
            .flat_map(|r| r.permissions.iter().cloned())
            .collect())
    }
}

fn dedup<T: Clone + Eq + core::hash::Hash>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<NodeId> {
        raw.iter().map(|s| NodeId::from(*s)).collect()
    }

    #[test]
    fn assigned_menu_ids_unions_enabled_roles() {
        let dir = RoleDirectory::with_admin("Super Admin", ids(&["1", "2"]));
        let editor = dir
            .create_role(RoleDraft {
                name: "Editor".to_string(),
                permissions: ids(&["2", "3"]),
                ..Default::default()
            })
            .unwrap();
        let auditor = dir
            .create_role(RoleDraft {
                name: "Auditor".to_string(),
                status: Some(NodeStatus::Disabled),
                permissions: ids(&["9"]),
                ..Default::default()
            })
            .unwrap();

        let user = UserId::from("u-1");
        dir.assign_roles(&user, vec![editor, auditor]).unwrap();

        let assigned = dir.assigned_menu_ids(&user).unwrap();
        assert_eq!(assigned, ids(&["2", "3"]).into_iter().collect());
        assert!(dir.assigned_menu_ids(&UserId::from("nobody")).unwrap().is_empty());
    }

    #[test]
    fn update_relinks_menu_grants() {
        let dir = RoleDirectory::new();
        let role = dir
            .create_role(RoleDraft {
                name: "Ops".to_string(),
                permissions: ids(&["1"]),
                ..Default::default()
            })
            .unwrap();

        dir.update_role(&role, RoleChanges { permissions: Some(ids(&["4", "4", "5"])), ..Default::default() })
            .unwrap();
        assert_eq!(dir.role(&role).unwrap().permissions, ids(&["4", "5"]));

        // omitted permissions leave grants alone
        dir.update_role(&role, RoleChanges { name: Some("Operations".to_string()), ..Default::default() })
            .unwrap();
        assert_eq!(dir.role(&role).unwrap().permissions, ids(&["4", "5"]));

        dir.update_role(&role, RoleChanges { permissions: Some(vec![]), ..Default::default() })
            .unwrap();
        assert!(dir.role(&role).unwrap().permissions.is_empty());
    }

    #[test]
    fn admin_role_is_protected() {
        let dir = RoleDirectory::with_admin("Super Admin", vec![]);
        let admin = RoleId::admin();

        let rename = dir.update_role(&admin, RoleChanges { name: Some("Root".to_string()), ..Default::default() });
        assert!(matches!(rename, Err(DomainError::Conflict(_))));

        let disable = dir.update_role(
            &admin,
            RoleChanges { status: Some(NodeStatus::Disabled), ..Default::default() },
        );
        assert!(matches!(disable, Err(DomainError::Conflict(_))));

        assert!(matches!(dir.delete_role(&admin), Err(DomainError::Conflict(_))));
        assert_eq!(dir.role(&admin).unwrap().name, "Super Admin");
    }

    #[test]
    fn role_held_by_user_cannot_be_deleted() {
        let dir = RoleDirectory::new();
        let role = dir
            .create_role(RoleDraft { name: "Ops".to_string(), ..Default::default() })
            .unwrap();
        let user = UserId::from("u-1");
        dir.assign_roles(&user, vec![role.clone()]).unwrap();

        assert!(matches!(dir.delete_role(&role), Err(DomainError::Conflict(_))));

        dir.assign_roles(&user, vec![]).unwrap();
        dir.delete_role(&role).unwrap();
        assert!(matches!(dir.role(&role), Err(DomainError::NotFound { .. })));
    }

    fn directory_with(names: &[&str]) -> (RoleDirectory, Vec<RoleId>) {
        let dir = RoleDirectory::new();
        let ids = names
            .iter()
            .map(|name| {
                dir.create_role(RoleDraft {
                    name: name.to_string(),
                    remark: Some(format!("{name} team")),
                    ..Default::default()
                })
                .unwrap()
            })
            .collect();
        (dir, ids)
    }

    #[test]
    fn list_roles_pages_newest_first() {
        let (dir, ids) = directory_with(&["Ops", "Editor", "Auditor"]);

        let first = dir.list_roles(&RoleQuery::default(), PageRequest::new(1, 2)).unwrap();
        assert_eq!(first.total, 3);
        let got: Vec<&RoleId> = first.list.iter().map(|r| &r.id).collect();
        assert_eq!(got, vec![&ids[2], &ids[1]]);

        let second = dir.list_roles(&RoleQuery::default(), PageRequest::new(2, 2)).unwrap();
        assert_eq!(second.list.len(), 1);
        assert_eq!(second.list[0].id, ids[0]);
    }

    #[test]
    fn search_matches_name_or_exact_id() {
        let (dir, ids) = directory_with(&["Ops", "Editor", "Auditor"]);
        let names = |q: RoleQuery| -> Vec<String> {
            dir.role_options(&q, None, None)
                .unwrap()
                .list
                .into_iter()
                .map(|r| r.name)
                .collect()
        };

        assert_eq!(names(RoleQuery { search: Some("tor".to_string()), ..Default::default() }), vec!["Auditor", "Editor"]);
        assert_eq!(names(RoleQuery { search: Some(ids[0].to_string()), ..Default::default() }), vec!["Ops"]);
        // search wins over the field filters
        assert_eq!(
            names(RoleQuery {
                search: Some("ops".to_string()),
                name: Some("Editor".to_string()),
                ..Default::default()
            }),
            vec!["Ops"]
        );
        assert_eq!(names(RoleQuery { id: Some(ids[1].clone()), ..Default::default() }), vec!["Editor"]);
        assert_eq!(names(RoleQuery { remark: Some("AUDITOR".to_string()), ..Default::default() }), vec!["Auditor"]);
    }

    #[test]
    fn options_are_limited_or_paged() {
        let (dir, _) = directory_with(&["c", "a", "b"]);
        let capped = dir.role_options(&RoleQuery::default(), None, Some(2)).unwrap();
        assert_eq!(capped.total, 2);
        assert_eq!(capped.list[0].name, "a");

        let paged = dir.role_options(&RoleQuery::default(), Some(PageRequest::new(2, 2)), None).unwrap();
        assert_eq!(paged.total, 3);
        assert_eq!(paged.list[0].name, "c");
    }

    #[test]
    fn status_and_creation_window_filter() {
        let (dir, ids) = directory_with(&["Ops", "Editor"]);
        dir.update_role(&ids[0], RoleChanges { status: Some(NodeStatus::Disabled), ..Default::default() })
            .unwrap();

        let disabled = RoleQuery { status: Some(NodeStatus::Disabled), ..Default::default() };
        assert_eq!(dir.role_options(&disabled, None, None).unwrap().list[0].id, ids[0]);

        let future = RoleQuery { created: TimeRange::from_dates(Some("2999-01-01"), None), ..Default::default() };
        assert_eq!(dir.list_roles(&future, PageRequest::default()).unwrap().total, 0);
    }

    #[test]
    fn assigning_unknown_role_fails() {
        let dir = RoleDirectory::new();
        let err = dir
            .assign_roles(&UserId::from("u-1"), vec![RoleId::from("ghost")])
            .unwrap_err();
        assert_eq!(err, DomainError::not_found("role", "ghost"));
    }
}
