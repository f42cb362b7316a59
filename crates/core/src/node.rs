//! Capabilities every hierarchy node kind exposes to the generic algorithms.

use serde::{Deserialize, Serialize};

use crate::NodeId;

/// Enabled/disabled flag shared by menus, departments and roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Enabled,
    Disabled,
}

impl NodeStatus {
    pub fn is_enabled(self) -> bool {
        self == NodeStatus::Enabled
    }
}

impl core::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NodeStatus::Enabled => write!(f, "enabled"),
            NodeStatus::Disabled => write!(f, "disabled"),
        }
    }
}

/// The id / parent-id / children accessors the tree assembler works through.
///
/// Implementors know nothing about trees beyond these four operations; the
/// children list is transient and only ever filled by [`crate::assemble`].
pub trait TreeNode: Sized {
    fn id(&self) -> &NodeId;

    fn parent_id(&self) -> &NodeId;

    fn children(&self) -> &[Self];

    fn children_mut(&mut self) -> &mut Vec<Self>;
}

/// A persisted node kind (menu entry, department).
pub trait Node: TreeNode + Clone + Send + Sync + 'static {
    /// Human-readable kind label used in errors and logs.
    const KIND: &'static str;

    fn name(&self) -> &str;

    fn status(&self) -> NodeStatus;

    fn is_deleted(&self) -> bool;

    fn mark_deleted(&mut self);

    /// Route path, for kinds that have one.
    fn path(&self) -> Option<&str> {
        None
    }
}
