//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Which rule a rejected mutation tripped over.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValidationRule {
    /// A mandatory field was absent or blank.
    Required,
    /// A field was outside its length bounds.
    Length,
    /// A field had the wrong shape (leading `/`, URL scheme, ...).
    Format,
    /// A name or path collides with another live node of the same kind.
    Unique,
    /// A node was asked to become its own parent.
    SelfParent,
    /// The requested parent does not exist or is soft-deleted.
    MissingParent,
    /// The requested parent is a descendant of the node.
    Cycle,
    /// The node kind is outside the supported set.
    UnsupportedKind,
    /// `order` metadata is missing, non-numeric or negative.
    InvalidOrder,
    /// The same id appears more than once in a batch.
    Duplicate,
    /// A batch references a node that does not exist.
    UnknownNode,
    /// A batch carried no operations.
    Empty,
}

impl core::fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ValidationRule::Required => "required",
            ValidationRule::Length => "length",
            ValidationRule::Format => "format",
            ValidationRule::Unique => "unique",
            ValidationRule::SelfParent => "self_parent",
            ValidationRule::MissingParent => "missing_parent",
            ValidationRule::Cycle => "cycle",
            ValidationRule::UnsupportedKind => "unsupported_kind",
            ValidationRule::InvalidOrder => "invalid_order",
            ValidationRule::Duplicate => "duplicate",
            ValidationRule::UnknownNode => "unknown_node",
            ValidationRule::Empty => "empty",
        };
        f.write_str(s)
    }
}

/// Structured reason for a rejected mutation: the offending field, the rule,
/// and a human-readable message the caller can render as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub field: &'static str,
    pub rule: ValidationRule,
    pub message: String,
}

impl core::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({}): {}", self.field, self.rule, self.message)
    }
}

/// Failure reported by a [`crate::NodeStore`] implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,

    #[error("record not found: {0}")]
    Missing(String),

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("unique constraint on {field} violated by '{value}'")]
    UniqueViolation { field: &'static str, value: String },
}

/// Domain-level error.
///
/// Validation, not-found and conflict outcomes are expected results returned
/// to the caller; none of them is fatal to the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A mutation failed a structural or invariant check.
    #[error("validation failed: {0}")]
    Validation(ValidationFailure),

    /// An identifier was invalid (e.g. blank).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The referenced record does not exist or is soft-deleted.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The mutation conflicts with current state (children on delete,
    /// uniqueness race caught at write time, protected records).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store failed for reasons unrelated to the request.
    #[error("store failure: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub fn validation(field: &'static str, rule: ValidationRule, msg: impl Into<String>) -> Self {
        Self::Validation(ValidationFailure {
            field,
            rule,
            message: msg.into(),
        })
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// The validation failure, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationFailure> {
        match self {
            DomainError::Validation(v) => Some(v),
            _ => None,
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            // Write-time uniqueness is the fallback to the advisory pre-check.
            StoreError::UniqueViolation { field, value } => {
                DomainError::conflict(format!("{field} '{value}' is already taken"))
            }
            StoreError::DuplicateId(id) => DomainError::conflict(format!("id '{id}' already exists")),
            other => DomainError::Store(other),
        }
    }
}
