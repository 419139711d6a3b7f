//! Required/recommended variable checks and recipient validation.
//!
//! Validation is pure and synchronous: it runs on every edit and again
//! right before any save, test send or execution. A report with
//! `has_errors` blocks the action before any network call; recommended
//! gaps only warn.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::TemplateType;
use super::template::TemplateFields;
use crate::error::ValidationError;

/// `local@domain.tld`: no whitespace, exactly one `@`, a dot in the domain.
#[allow(clippy::expect_used)]
static RECIPIENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("recipient pattern is a valid literal")
});

const AUTO_ORDER_REQUIRED: &[&str] = &["SUPPLIER_NAME", "ORDER_NUMBER"];

const AUTO_ORDER_RECOMMENDED: &[&str] = &[
    "ORDER_DATE",
    "PRODUCTS_LIST",
    "TOTAL_VALUE",
    "COMPANY_NAME",
    "DELIVERY_ADDRESS",
];

/// Sample-data keys tried, in order, when no recipient was entered.
pub const RECIPIENT_FALLBACK_KEYS: &[&str] = &["SUPPLIER_EMAIL", "COMPANY_EMAIL"];

/// Required and recommended vocabularies for one template type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariablePolicy {
    required: &'static [&'static str],
    recommended: &'static [&'static str],
}

impl VariablePolicy {
    /// Builds a policy from static vocabularies.
    #[must_use]
    pub const fn new(
        required: &'static [&'static str],
        recommended: &'static [&'static str],
    ) -> Self {
        Self {
            required,
            recommended,
        }
    }

    /// Returns the process-wide policy for a template type. Types without a
    /// vocabulary require nothing.
    #[must_use]
    pub fn for_type(template_type: &TemplateType) -> Self {
        match template_type.as_str() {
            TemplateType::AUTO_ORDER => Self::new(AUTO_ORDER_REQUIRED, AUTO_ORDER_RECOMMENDED),
            _ => Self::new(&[], &[]),
        }
    }

    /// Required variable names.
    #[must_use]
    pub const fn required(&self) -> &'static [&'static str] {
        self.required
    }

    /// Recommended variable names.
    #[must_use]
    pub const fn recommended(&self) -> &'static [&'static str] {
        self.recommended
    }

    /// Compares the tokens a template uses against both vocabularies.
    #[must_use]
    pub fn validate(&self, used: &BTreeSet<String>) -> ValidationReport {
        let missing = |names: &[&str]| -> Vec<String> {
            names
                .iter()
                .filter(|name| !used.contains(**name))
                .map(|name| (*name).to_string())
                .collect()
        };
        let missing_required = missing(self.required);
        let missing_recommended = missing(self.recommended);
        ValidationReport {
            has_errors: !missing_required.is_empty(),
            missing_required,
            missing_recommended,
        }
    }
}

/// Outcome of [`VariablePolicy::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Required variables absent from the template, in vocabulary order.
    pub missing_required: Vec<String>,
    /// Recommended variables absent from the template, in vocabulary order.
    pub missing_recommended: Vec<String>,
    /// `true` iff at least one required variable is missing.
    pub has_errors: bool,
}

impl ValidationReport {
    /// Converts a blocking report into an error.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingRequiredVariables`] when
    /// `has_errors` is set.
    pub fn ensure_ok(&self) -> Result<(), ValidationError> {
        if self.has_errors {
            Err(ValidationError::MissingRequiredVariables(
                self.missing_required.clone(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Name, subject and body must all be non-blank before a save.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyField`] naming the first blank field.
pub fn check_required_fields(fields: &TemplateFields) -> Result<(), ValidationError> {
    if fields.name.trim().is_empty() {
        return Err(ValidationError::EmptyField("template name"));
    }
    if fields.subject.trim().is_empty() {
        return Err(ValidationError::EmptyField("subject"));
    }
    if fields.body.trim().is_empty() {
        return Err(ValidationError::EmptyField("body"));
    }
    Ok(())
}

/// Checks that `address` looks like `local@domain.tld`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidRecipient`] otherwise.
pub fn validate_recipient(address: &str) -> Result<String, ValidationError> {
    let trimmed = address.trim();
    if RECIPIENT_PATTERN.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::InvalidRecipient(trimmed.to_string()))
    }
}

/// Picks the test-email recipient: the operator's entry when non-blank,
/// otherwise the first non-blank fallback. Whichever is chosen is
/// validated; an invalid operator entry never falls through to a default.
///
/// # Errors
///
/// Returns [`ValidationError::MissingRecipient`] when nothing is available
/// and [`ValidationError::InvalidRecipient`] when the chosen address is
/// malformed.
pub fn resolve_recipient<'a>(
    entered: Option<&'a str>,
    fallbacks: impl IntoIterator<Item = Option<&'a str>>,
) -> Result<String, ValidationError> {
    let chosen = entered
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            fallbacks
                .into_iter()
                .flatten()
                .map(str::trim)
                .find(|s| !s.is_empty())
        })
        .ok_or(ValidationError::MissingRecipient)?;
    validate_recipient(chosen)
}
