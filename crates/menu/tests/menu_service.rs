use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use consolekit_auth::{RoleDirectory, RoleDraft, SessionClaims, Signer, TokenValidationError};
use consolekit_core::{
    DomainError, ListFilter, NodeId, NodeStatus, NodeStore, StoreError, UserId, ValidationRule,
    flatten,
};
use consolekit_infra::InMemoryNodeStore;
use consolekit_menu::{
    MenuChanges, MenuDraft, MenuKind, MenuMeta, MenuNode, MenuService, ModuleLabelCache, ReorderOp,
};

type Store = Arc<InMemoryNodeStore<MenuNode>>;

fn service(rows: Vec<MenuNode>) -> MenuService<Store> {
    consolekit_observability::init();
    MenuService::new(Arc::new(InMemoryNodeStore::seeded(rows)))
}

fn catalog(id: &str, parent: &str, name: &str) -> MenuNode {
    MenuNode::new(id, parent, name, MenuKind::Catalog).with_path(format!("/{}", name.to_lowercase()))
}

fn button(id: &str, parent: &str, name: &str, code: &str) -> MenuNode {
    MenuNode::new(id, parent, name, MenuKind::Button).with_auth_code(code)
}

fn ids(raw: &[&str]) -> HashSet<NodeId> {
    raw.iter().map(|s| NodeId::from(*s)).collect()
}

fn shape(forest: &[MenuNode]) -> String {
    forest
        .iter()
        .map(|n| format!("{}[{}]", n.id, shape(&n.children)))
        .collect::<Vec<_>>()
        .join(",")
}

fn rule_of(err: DomainError) -> ValidationRule {
    err.as_validation().expect("validation failure").rule
}

fn snapshot(svc: &MenuService<Store>) -> Vec<MenuNode> {
    svc.store()
        .list(&ListFilter { status: None, include_deleted: true })
        .unwrap()
}

#[test]
fn assigned_button_pulls_in_its_ancestors_but_is_not_shown() {
    let svc = service(vec![
        catalog("1", "0", "System"),
        catalog("2", "1", "Users"),
        button("3", "2", "Delete", "User:Delete"),
    ]);
    let forest = svc.visible_menus(&ids(&["3"])).unwrap();
    assert_eq!(shape(&forest), "1[2[]]");
}

#[test]
fn list_tree_keeps_orphans_and_every_row() {
    let svc = service(vec![
        catalog("1", "0", "System"),
        catalog("2", "1", "Users"),
        catalog("5", "99", "Stray"),
    ]);
    let forest = svc.list_tree().unwrap();
    assert_eq!(shape(&forest), "1[2[]],5[]");
    assert_eq!(flatten(forest).len(), 3);
}

#[test]
fn assignable_tree_hides_disabled_menus() {
    let svc = service(vec![
        catalog("1", "0", "System"),
        catalog("2", "0", "Legacy").with_status(NodeStatus::Disabled),
    ]);
    assert_eq!(shape(&svc.assignable_tree().unwrap()), "1[]");
}

#[test]
fn create_applies_defaults_and_reads_back() {
    let svc = service(vec![]);
    let id = svc
        .create(MenuDraft {
            name: "Dashboard".to_string(),
            kind: "catalog".to_string(),
            path: Some("/dashboard".to_string()),
            meta: json!({ "title": "Home" }).as_object().cloned(),
            ..Default::default()
        })
        .unwrap();

    let menu = svc.menu(&id).unwrap();
    assert!(menu.parent_id.is_root());
    assert_eq!(menu.status, NodeStatus::Enabled);
    assert_eq!(menu.sort_order, 0);
    assert_eq!(menu.display_name(), "Home");
    assert!(svc.name_exists("Dashboard", None).unwrap());
    assert!(!svc.name_exists("Dashboard", Some(&id)).unwrap());
}

#[test]
fn path_uniqueness_without_false_positive_on_self() {
    let svc = service(vec![catalog("1", "0", "System"), catalog("2", "0", "Reports")]);

    let clash = MenuChanges { path: Some("/system".to_string()), ..Default::default() };
    let err = svc.update(&NodeId::from("2"), clash).unwrap_err();
    assert_eq!(rule_of(err), ValidationRule::Unique);

    let same = MenuChanges { path: Some("/reports".to_string()), ..Default::default() };
    svc.update(&NodeId::from("2"), same).unwrap();

    assert!(svc.path_exists("/system", None).unwrap());
    assert!(!svc.path_exists("/system", Some(&NodeId::from("1"))).unwrap());
}

#[test]
fn self_parenting_is_rejected_and_nothing_changes() {
    let svc = service(vec![catalog("1", "0", "System"), catalog("2", "1", "Users")]);
    let before = snapshot(&svc);

    let err = svc
        .update(&NodeId::from("2"), MenuChanges { parent_id: Some(NodeId::from("2")), ..Default::default() })
        .unwrap_err();
    assert_eq!(rule_of(err), ValidationRule::SelfParent);

    let err = svc
        .update(&NodeId::from("1"), MenuChanges { parent_id: Some(NodeId::from("2")), ..Default::default() })
        .unwrap_err();
    assert_eq!(rule_of(err), ValidationRule::Cycle);

    assert_eq!(snapshot(&svc), before);
}

#[test]
fn delete_is_blocked_by_live_children() {
    let svc = service(vec![catalog("1", "0", "System"), catalog("2", "1", "Users")]);

    let err = svc.delete(&NodeId::from("1")).unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    svc.delete(&NodeId::from("2")).unwrap();
    svc.delete(&NodeId::from("1")).unwrap();
    assert!(svc.list_tree().unwrap().is_empty());
    assert!(matches!(svc.menu(&NodeId::from("1")), Err(DomainError::NotFound { .. })));
    // the row is kept, only marked
    assert_eq!(snapshot(&svc).len(), 2);
}

#[test]
fn reorder_batch_is_all_or_nothing() {
    let svc = service(vec![
        catalog("1", "0", "System"),
        catalog("2", "0", "Reports"),
        catalog("3", "0", "Audit"),
    ]);
    let before = snapshot(&svc);

    let ops = [
        ReorderOp::new("2", "1", 0),
        ReorderOp::new("3", "1", 1),
        ReorderOp::new("2", "0", 2),
    ];
    let err = svc.reorder(&ops).unwrap_err();
    assert_eq!(rule_of(err), ValidationRule::Duplicate);
    assert_eq!(snapshot(&svc), before);

    svc.reorder(&ops[..2]).unwrap();
    assert_eq!(shape(&svc.list_tree().unwrap()), "1[2[],3[]]");
    assert_eq!(svc.menu(&NodeId::from("3")).unwrap().sort_order, 1);
}

#[test]
fn reorder_changes_sibling_order() {
    let svc = service(vec![
        catalog("1", "0", "System"),
        catalog("2", "0", "Reports"),
    ]);
    svc.reorder(&[ReorderOp::new("1", "0", 5), ReorderOp::new("2", "0", 1)])
        .unwrap();
    assert_eq!(shape(&svc.list_tree().unwrap()), "2[],1[]");
}

#[test]
fn claims_gate_visibility() {
    let svc = service(vec![catalog("1", "0", "System"), catalog("2", "1", "Users")]);
    let roles = RoleDirectory::new();
    let role = roles
        .create_role(RoleDraft {
            name: "Ops".to_string(),
            permissions: vec![NodeId::from("2")],
            ..Default::default()
        })
        .unwrap();
    let user = UserId::from("u-1");
    roles.assign_roles(&user, vec![role.clone()]).unwrap();

    let now = Utc::now();
    let claims = SessionClaims {
        sub: user,
        username: "ops".to_string(),
        roles: vec![role],
        issued_at: now - Duration::minutes(1),
        expires_at: now + Duration::minutes(10),
    };

    let forest = svc.visible_menus_for(Some(&claims), &roles, now).unwrap();
    assert_eq!(shape(&forest), "1[2[]]");

    assert!(svc.visible_menus_for(None, &roles, now).unwrap().is_empty());
    let later = now + Duration::hours(1);
    assert!(svc.visible_menus_for(Some(&claims), &roles, later).unwrap().is_empty());
}

/// Test signer: the token is the claims as JSON.
struct PlainSigner;

impl Signer for PlainSigner {
    fn sign(&self, claims: &SessionClaims) -> String {
        serde_json::to_string(claims).unwrap()
    }

    fn verify(&self, token: &str) -> Result<SessionClaims, TokenValidationError> {
        serde_json::from_str(token).map_err(|e| TokenValidationError::Malformed(e.to_string()))
    }
}

#[test]
fn bearer_tokens_go_through_the_signer() {
    let svc = service(vec![catalog("1", "0", "System")]);
    let roles = RoleDirectory::with_admin("Super Admin", vec![NodeId::from("1")]);
    let admin = UserId::from("root");
    roles.assign_roles(&admin, vec![consolekit_core::RoleId::admin()]).unwrap();

    let now = Utc::now();
    let token = PlainSigner.sign(&SessionClaims {
        sub: admin,
        username: "root".to_string(),
        roles: vec![consolekit_core::RoleId::admin()],
        issued_at: now,
        expires_at: now + Duration::minutes(30),
    });

    let forest = svc.visible_menus_for_token(&token, &PlainSigner, &roles, now).unwrap();
    assert_eq!(shape(&forest), "1[]");
    assert!(svc.visible_menus_for_token("garbage", &PlainSigner, &roles, now).unwrap().is_empty());
}

#[test]
fn access_codes_come_from_assigned_enabled_buttons() {
    let svc = service(vec![
        catalog("1", "0", "Users"),
        button("2", "1", "Create", "User:Create"),
        button("3", "1", "Delete", "User:Delete"),
        button("4", "1", "Export", "User:Export").with_status(NodeStatus::Disabled),
    ]);
    let codes = svc.access_codes(&ids(&["1", "2", "4"])).unwrap();
    assert_eq!(codes, vec!["User:Create".to_string()]);
}

#[test]
fn name_chain_climbs_to_the_first_disabled_ancestor() {
    let svc = service(vec![
        catalog("1", "0", "System").with_title("System Settings"),
        catalog("2", "1", "Users"),
        catalog("3", "0", "Legacy").with_status(NodeStatus::Disabled),
        catalog("4", "3", "Archive"),
    ]);
    assert_eq!(
        svc.name_chain_by_path("/users").unwrap().as_deref(),
        Some("System Settings - Users")
    );
    assert_eq!(svc.name_chain_by_path("/archive").unwrap().as_deref(), Some("Archive"));
    assert_eq!(svc.name_chain_by_path("/missing").unwrap(), None);
}

#[test]
fn module_labels_come_from_the_enabled_tree() {
    let svc = service(vec![
        catalog("1", "0", "System"),
        MenuNode::new("2", "1", "OperationLog", MenuKind::Menu)
            .with_path("/system/operation-log")
            .with_title("Operation Log"),
    ]);
    let mut cache = ModuleLabelCache::default();
    let now = Utc::now();
    assert_eq!(svc.module_label(&mut cache, "/system/operation-log", None, now), "Operation Log");
    assert_eq!(svc.module_label(&mut cache, "", Some("operation_log"), now), "Operation Log");
    assert_eq!(svc.module_label(&mut cache, "/elsewhere", None, now), "elsewhere");
}

#[test]
fn reorder_cannot_rewrite_link_targets_or_titles() {
    let mut docs = MenuNode::new("1", "0", "Docs", MenuKind::Link).with_title("Docs");
    docs.meta.insert("link".to_string(), json!("https://docs.example.com"));
    let svc = service(vec![docs]);

    let mut op = ReorderOp::new("1", "0", 1);
    let meta = op.meta.get_or_insert_with(MenuMeta::new);
    meta.insert("link".to_string(), json!("ftp://evil"));
    meta.insert("iframeSrc".to_string(), json!("ftp://evil"));
    meta.insert("title".to_string(), json!(5));
    svc.reorder(&[op]).unwrap();

    let stored = svc.menu(&NodeId::from("1")).unwrap();
    assert_eq!(stored.meta.get("link"), Some(&json!("https://docs.example.com")));
    assert_eq!(stored.meta.get("title"), Some(&json!("Docs")));
    assert_eq!(stored.meta.get("iframeSrc"), None);
    assert_eq!(stored.sort_order, 1);
}

#[test]
fn fractional_orders_are_rejected_everywhere() {
    let svc = service(vec![catalog("1", "0", "System")]);
    let before = snapshot(&svc);

    for order in [json!(-0.5), json!(2.7)] {
        let err = svc
            .create(MenuDraft {
                name: "Reports".to_string(),
                kind: "catalog".to_string(),
                path: Some("/reports".to_string()),
                meta: json!({ "order": order }).as_object().cloned(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(rule_of(err), ValidationRule::InvalidOrder);
    }

    let mut op = ReorderOp::new("1", "0", 0);
    op.meta.get_or_insert_with(MenuMeta::new).insert("order".to_string(), json!(-0.9));
    assert_eq!(rule_of(svc.reorder(&[op]).unwrap_err()), ValidationRule::InvalidOrder);
    assert_eq!(snapshot(&svc), before);
}

#[test]
fn padded_parent_ids_are_trimmed() {
    let svc = service(vec![catalog("1", "0", "System")]);
    let id = svc
        .create(MenuDraft {
            name: "Users".to_string(),
            parent_id: Some(NodeId::from(" 1 ")),
            kind: "catalog".to_string(),
            path: Some("/users".to_string()),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(svc.menu(&id).unwrap().parent_id, NodeId::from("1"));
    assert_eq!(shape(&svc.list_tree().unwrap()), format!("1[{id}[]]"));

    svc.reorder(&[ReorderOp::new(id.clone(), " 0 ", 0)]).unwrap();
    assert!(svc.menu(&id).unwrap().parent_id.is_root());
}

/// Store whose reads always fail.
struct BrokenStore;

impl NodeStore<MenuNode> for BrokenStore {
    fn get(&self, _id: &NodeId) -> Result<Option<MenuNode>, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn list(&self, _filter: &ListFilter) -> Result<Vec<MenuNode>, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn insert(&self, _node: MenuNode) -> Result<(), StoreError> {
        Err(StoreError::Poisoned)
    }

    fn update(&self, _node: MenuNode) -> Result<(), StoreError> {
        Err(StoreError::Poisoned)
    }

    fn update_many(&self, _nodes: Vec<MenuNode>) -> Result<(), StoreError> {
        Err(StoreError::Poisoned)
    }

    fn soft_delete(&self, _id: &NodeId) -> Result<(), StoreError> {
        Err(StoreError::Poisoned)
    }

    fn count_children(&self, _parent: &NodeId) -> Result<usize, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn exists_by_name(&self, _name: &str, _exclude: Option<&NodeId>) -> Result<bool, StoreError> {
        Err(StoreError::Poisoned)
    }
}

#[test]
fn module_label_falls_back_to_the_path_when_the_store_fails() {
    let svc = MenuService::new(BrokenStore);
    let mut cache = ModuleLabelCache::default();
    let now = Utc::now();

    assert!(svc.list_tree().is_err());
    assert_eq!(svc.module_label(&mut cache, "/system/users", None, now), "system/users");
    assert_eq!(svc.module_label(&mut cache, "", Some("dept"), now), "dept");
    assert!(cache.is_empty());
}
