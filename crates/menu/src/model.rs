//! Menu node model, create/update payloads, and `meta` helpers.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use consolekit_core::{DomainError, DomainResult, Node, NodeId, NodeStatus, TreeNode, ValidationRule};

/// Ordered key→value metadata attached to a menu entry (`title`, `order`,
/// `icon`, link targets, ...).
pub type MenuMeta = serde_json::Map<String, Value>;

pub const META_TITLE: &str = "title";
pub const META_ORDER: &str = "order";
pub const META_LINK: &str = "link";
pub const META_IFRAME_SRC: &str = "iframeSrc";

/// Menu entry kind. Drives which fields are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuKind {
    Catalog,
    Menu,
    Embedded,
    Link,
    Button,
}

impl MenuKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MenuKind::Catalog => "catalog",
            MenuKind::Menu => "menu",
            MenuKind::Embedded => "embedded",
            MenuKind::Link => "link",
            MenuKind::Button => "button",
        }
    }

    /// Kinds that are routed and therefore need a unique path.
    pub fn requires_path(self) -> bool {
        matches!(self, MenuKind::Catalog | MenuKind::Menu | MenuKind::Embedded)
    }

    /// Meta key holding the external URL, with the field name used in errors.
    pub fn url_key(self) -> Option<(&'static str, &'static str)> {
        match self {
            MenuKind::Link => Some((META_LINK, "meta.link")),
            MenuKind::Embedded => Some((META_IFRAME_SRC, "meta.iframeSrc")),
            _ => None,
        }
    }
}

impl core::fmt::Display for MenuKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MenuKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "catalog" => Ok(MenuKind::Catalog),
            "menu" => Ok(MenuKind::Menu),
            "embedded" => Ok(MenuKind::Embedded),
            "link" => Ok(MenuKind::Link),
            "button" => Ok(MenuKind::Button),
            "" => Err(DomainError::validation(
                "type",
                ValidationRule::Required,
                "menu type is required",
            )),
            other => Err(DomainError::validation(
                "type",
                ValidationRule::UnsupportedKind,
                format!("unsupported menu type: {other}"),
            )),
        }
    }
}

/// A persisted menu entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuNode {
    pub id: NodeId,
    #[serde(rename = "pid")]
    pub parent_id: NodeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "type")]
    pub kind: MenuKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,
    #[serde(default)]
    pub meta: MenuMeta,
    /// Persisted sort key, mirrored into `meta.order`.
    #[serde(default)]
    pub sort_order: u32,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default, skip_serializing)]
    pub deleted: bool,
    /// Filled only by tree assembly.
    #[serde(skip_deserializing, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    pub fn new(
        id: impl Into<NodeId>,
        parent_id: impl Into<NodeId>,
        name: impl Into<String>,
        kind: MenuKind,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            name: name.into(),
            path: None,
            kind,
            component: None,
            redirect: None,
            auth_code: None,
            meta: MenuMeta::new(),
            sort_order: 0,
            status: NodeStatus::Enabled,
            deleted: false,
            children: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.meta.insert(META_TITLE.to_string(), Value::String(title.into()));
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.set_order(order);
        self
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_auth_code(mut self, code: impl Into<String>) -> Self {
        self.auth_code = Some(code.into());
        self
    }

    /// Set the sort key and mirror it into `meta.order`.
    pub fn set_order(&mut self, order: u32) {
        self.sort_order = order;
        self.meta.insert(META_ORDER.to_string(), Value::from(order));
    }

    /// Sibling sort key: `meta.order`, with missing or non-numeric values as 0.
    pub fn display_order(&self) -> i64 {
        self.meta.get(META_ORDER).and_then(parse_order).unwrap_or(0)
    }

    /// `meta.title` when present, otherwise the route name.
    pub fn display_name(&self) -> String {
        match self.meta.get(META_TITLE) {
            Some(Value::String(title)) => title.clone(),
            Some(Value::Null) | None => self.name.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Build a fresh node from a validated draft.
    pub(crate) fn from_draft(id: NodeId, draft: MenuDraft, kind: MenuKind) -> DomainResult<Self> {
        Self::build(id, draft, kind, 0)
    }

    /// Apply a validated partial update.
    ///
    /// Keeps the current sort key when the change carries no `meta.order`.
    pub(crate) fn apply(&self, changes: &MenuChanges, kind: MenuKind) -> DomainResult<Self> {
        let draft = MenuDraft::merged(self, changes);
        Self::build(self.id.clone(), draft, kind, self.sort_order)
    }

    fn build(id: NodeId, draft: MenuDraft, kind: MenuKind, fallback_order: u32) -> DomainResult<Self> {
        let order = checked_order(draft.meta.as_ref(), false)?.unwrap_or(fallback_order);
        let mut node = Self {
            id,
            parent_id: NodeId::parent_or_root(draft.parent_id.as_ref()),
            name: draft.name.trim().to_string(),
            // button/link entries are not routed; a stale path would only
            // occupy the unique path space
            path: if kind.requires_path() {
                draft.path.map(|p| p.trim().to_string())
            } else {
                None
            },
            kind,
            component: draft.component,
            redirect: draft.redirect,
            auth_code: draft.auth_code,
            meta: draft.meta.unwrap_or_default(),
            sort_order: 0,
            status: draft.status.unwrap_or_default(),
            deleted: false,
            children: Vec::new(),
        };
        node.set_order(order);
        Ok(node)
    }
}

impl TreeNode for MenuNode {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn parent_id(&self) -> &NodeId {
        &self.parent_id
    }

    fn children(&self) -> &[Self] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }
}

impl Node for MenuNode {
    const KIND: &'static str = "menu";

    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> NodeStatus {
        self.status
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

/// Create payload. `kind` stays a raw string so unsupported kinds surface as
/// a validation failure instead of a decode error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuDraft {
    pub name: String,
    #[serde(default, rename = "pid")]
    pub parent_id: Option<NodeId>,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: Option<String>,
    pub component: Option<String>,
    pub redirect: Option<String>,
    pub auth_code: Option<String>,
    pub meta: Option<MenuMeta>,
    pub status: Option<NodeStatus>,
}

impl MenuDraft {
    /// The full candidate an update would produce: `changes` layered over
    /// `existing`, field by field.
    pub fn merged(existing: &MenuNode, changes: &MenuChanges) -> Self {
        Self {
            name: changes.name.clone().unwrap_or_else(|| existing.name.clone()),
            parent_id: Some(
                changes
                    .parent_id
                    .clone()
                    .unwrap_or_else(|| existing.parent_id.clone()),
            ),
            kind: changes
                .kind
                .clone()
                .unwrap_or_else(|| existing.kind.as_str().to_string()),
            path: changes.path.clone().or_else(|| existing.path.clone()),
            component: changes.component.clone().or_else(|| existing.component.clone()),
            redirect: changes.redirect.clone().or_else(|| existing.redirect.clone()),
            auth_code: changes.auth_code.clone().or_else(|| existing.auth_code.clone()),
            meta: Some(changes.meta.clone().unwrap_or_else(|| existing.meta.clone())),
            status: Some(changes.status.unwrap_or(existing.status)),
        }
    }
}

/// Partial update payload; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuChanges {
    pub name: Option<String>,
    #[serde(default, rename = "pid")]
    pub parent_id: Option<NodeId>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    pub path: Option<String>,
    pub component: Option<String>,
    pub redirect: Option<String>,
    pub auth_code: Option<String>,
    pub meta: Option<MenuMeta>,
    pub status: Option<NodeStatus>,
}

/// Read an `order` value: integral numbers (`3`, `3.0`) or integer strings.
/// Fractions are not orders.
pub fn parse_order(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Validate `meta.order`.
///
/// Returns `Ok(None)` when absent and not `required`; otherwise the order must
/// be numeric and fit a non-negative `u32`.
pub fn checked_order(meta: Option<&MenuMeta>, required: bool) -> DomainResult<Option<u32>> {
    let raw = match meta.and_then(|m| m.get(META_ORDER)) {
        Some(Value::Null) | None if required => {
            return Err(DomainError::validation(
                "meta.order",
                ValidationRule::InvalidOrder,
                "order is required",
            ));
        }
        Some(Value::Null) | None => return Ok(None),
        Some(raw) => raw,
    };

    let order = parse_order(raw).ok_or_else(|| {
        DomainError::validation(
            "meta.order",
            ValidationRule::InvalidOrder,
            format!("order must be an integer, got {raw}"),
        )
    })?;
    u32::try_from(order).map(Some).map_err(|_| {
        DomainError::validation(
            "meta.order",
            ValidationRule::InvalidOrder,
            format!("order must be a non-negative integer, got {order}"),
        )
    })
}
