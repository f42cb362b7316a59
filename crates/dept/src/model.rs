use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use consolekit_core::{Node, NodeId, NodeStatus, TreeNode, UserId};

/// An organisational unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: NodeId,
    #[serde(rename = "pid")]
    pub parent_id: NodeId,
    pub name: String,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub deleted: bool,
    #[serde(skip_deserializing, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Department>,
}

impl Department {
    pub fn new(
        id: impl Into<NodeId>,
        parent_id: impl Into<NodeId>,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            name: name.into(),
            status: NodeStatus::Enabled,
            remark: None,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
            deleted: false,
            children: Vec::new(),
        }
    }
}

impl TreeNode for Department {
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

impl Node for Department {
    const KIND: &'static str = "department";

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
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeptDraft {
    pub name: String,
    #[serde(default, rename = "pid")]
    pub parent_id: Option<NodeId>,
    pub remark: Option<String>,
    pub status: Option<NodeStatus>,
}

/// Partial update. `remark: Some("")` clears the remark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeptChanges {
    pub name: Option<String>,
    #[serde(default, rename = "pid")]
    pub parent_id: Option<NodeId>,
    pub remark: Option<String>,
    pub status: Option<NodeStatus>,
}

impl DeptChanges {
    /// `existing` with these changes applied, stamped by `actor` at `now`.
    pub(crate) fn apply_to(
        &self,
        existing: &Department,
        actor: Option<&UserId>,
        now: DateTime<Utc>,
    ) -> Department {
        let mut next = existing.clone();
        if let Some(name) = &self.name {
            next.name = name.trim().to_string();
        }
        if let Some(parent) = &self.parent_id {
            next.parent_id = NodeId::parent_or_root(Some(parent));
        }
        if let Some(remark) = &self.remark {
            next.remark = Some(remark.clone()).filter(|r| !r.trim().is_empty());
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        next.updated_by = actor.cloned();
        next.updated_at = now;
        next.children.clear();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_only_touches_given_fields() {
        let now = Utc::now();
        let mut existing = Department::new("d1", "0", "Engineering", now);
        existing.remark = Some("builds things".to_string());

        let changes = DeptChanges {
            remark: Some(String::new()),
            parent_id: Some(NodeId::from("null")),
            ..Default::default()
        };
        let later = now + chrono::Duration::minutes(1);
        let actor = UserId::from("u-7");
        let next = changes.apply_to(&existing, Some(&actor), later);

        assert_eq!(next.name, "Engineering");
        assert_eq!(next.remark, None);
        assert!(next.parent_id.is_root());
        assert_eq!(next.updated_by, Some(actor));
        assert_eq!(next.updated_at, later);
        assert_eq!(next.created_at, now);
    }

    #[test]
    fn serializes_with_wire_names() {
        let dept = Department::new("d1", "0", "Engineering", Utc::now());
        let json = serde_json::to_value(&dept).unwrap();
        assert_eq!(json["pid"], serde_json::json!("0"));
        assert!(json.get("createdAt").is_some());
        assert!(json.get("deleted").is_none());
    }
}
