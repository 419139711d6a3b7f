//! Type-safe identifiers for templates, products and template types.
//!
//! The remote services key rows by integer ids. Wrapping them in newtypes
//! keeps a template id from being passed where a product id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Server-assigned identifier of a persisted email template row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(i64);

impl TemplateId {
    /// Wraps a raw row id.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw row id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TemplateId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Identifier of a product in the inventory service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

impl ProductId {
    /// Validates and wraps a raw product id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidProductId`] unless `raw > 0`.
    pub fn new(raw: i64) -> Result<Self, ValidationError> {
        if raw > 0 {
            Ok(Self(raw))
        } else {
            Err(ValidationError::InvalidProductId(raw))
        }
    }

    /// Returns the raw product id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification type a template belongs to (e.g. `auto_order`).
///
/// There is one editable slot per type; the type also selects the
/// required/recommended variable vocabularies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateType(String);

impl TemplateType {
    /// Wire name of the supplier auto-order notification.
    pub const AUTO_ORDER: &'static str = "auto_order";

    /// Parses a template type: a non-empty `[a-z0-9_]` identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTemplateType`] otherwise.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        let valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if valid {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ValidationError::InvalidTemplateType(raw.to_string()))
        }
    }

    /// The supplier auto-order template type.
    #[must_use]
    pub fn auto_order() -> Self {
        Self(Self::AUTO_ORDER.to_string())
    }

    /// Returns the wire name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
