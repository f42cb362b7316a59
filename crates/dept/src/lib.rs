//! `consolekit-dept` — the organisational department tree.

pub mod config;
pub mod model;
pub mod service;
pub mod validate;

pub use config::DeptRules;
pub use model::{DeptChanges, DeptDraft, Department};
pub use service::DeptService;
pub use validate::DeptValidator;
