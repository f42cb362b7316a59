//! `consolekit-menu` — the navigation menu tree.
//!
//! Validation of menu mutations, role-scoped visibility (ancestor closure),
//! atomic batch reordering, and the service facade the API layer calls.

pub mod config;
pub mod model;
pub mod module_label;
pub mod reorder;
pub mod service;
pub mod validate;
pub mod visible;

pub use config::MenuRules;
pub use model::{MenuChanges, MenuDraft, MenuKind, MenuMeta, MenuNode};
pub use module_label::{ModuleLabelCache, normalize_module_path};
pub use reorder::{ReorderCoordinator, ReorderOp, plan_reorder};
pub use service::MenuService;
pub use validate::MenuValidator;
pub use visible::{ancestor_closure, visible_menu_tree};
