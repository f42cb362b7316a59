//! `consolekit-core` — hierarchy building blocks shared by every node kind.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the error taxonomy, the tree assembler, the node store
//! contract consumed by the menu and department services, and the paging
//! helpers shared by list queries.

pub mod config;
pub mod error;
pub mod id;
pub mod node;
pub mod query;
pub mod store;
pub mod tree;

pub use error::{DomainError, DomainResult, StoreError, ValidationFailure, ValidationRule};
pub use id::{NodeId, RoleId, UserId};
pub use node::{Node, NodeStatus, TreeNode};
pub use query::{Page, PageRequest, TimeRange, contains_keyword, effective_limit};
pub use store::{AssignmentLookup, ListFilter, NodeStore};
pub use tree::{assemble, flatten, sort_forest, would_create_cycle};
