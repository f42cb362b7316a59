//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers are opaque strings: rows created here get a UUIDv7 in simple
//! form, but ids coming from existing storage are accepted verbatim.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a hierarchy node (menu entry or department).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

/// Identifier of a console user (actor identity).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

/// Identifier of a role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

macro_rules! impl_string_id {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7().simple().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: blank", $name)));
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    };
}

impl_string_id!(NodeId, "NodeId");
impl_string_id!(UserId, "UserId");
impl_string_id!(RoleId, "RoleId");

impl NodeId {
    /// Reserved parent id meaning "top of the tree".
    pub const ROOT: &'static str = "0";

    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    /// Normalise a raw parent reference: surrounding whitespace is dropped,
    /// and absent, blank and the literal `"null"` all mean the root.
    pub fn parent_or_root(raw: Option<&NodeId>) -> NodeId {
        match raw.map(|id| id.0.trim()) {
            Some(id) if !id.is_empty() && !id.eq_ignore_ascii_case("null") => Self(id.to_string()),
            _ => Self::root(),
        }
    }
}

impl RoleId {
    /// Id of the built-in super-admin role.
    pub const ADMIN: &'static str = "1";

    pub fn admin() -> Self {
        Self(Self::ADMIN.to_string())
    }

    pub fn is_admin(&self) -> bool {
        self.0 == Self::ADMIN
    }
}
