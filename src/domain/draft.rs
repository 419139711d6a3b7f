//! Locally cached unsaved edits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::template::TemplateFields;

/// Unsaved edit kept in the local draft slot of one template type.
///
/// Serialized as `{templateName, subject, body, savedAt}` with an
/// ISO-8601 `savedAt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Template name at the time of the autosave.
    pub template_name: String,
    /// Subject text at the time of the autosave.
    pub subject: String,
    /// Body text at the time of the autosave.
    pub body: String,
    /// When the draft was written locally.
    pub saved_at: DateTime<Utc>,
}

impl Draft {
    /// Captures `fields` as a draft stamped with `saved_at`.
    #[must_use]
    pub fn capture(fields: &TemplateFields, saved_at: DateTime<Utc>) -> Self {
        Self {
            template_name: fields.name.clone(),
            subject: fields.subject.clone(),
            body: fields.body.clone(),
            saved_at,
        }
    }

    /// The editable fields carried by this draft.
    #[must_use]
    pub fn fields(&self) -> TemplateFields {
        TemplateFields {
            name: self.template_name.clone(),
            subject: self.subject.clone(),
            body: self.body.clone(),
        }
    }

    /// A draft supersedes the server copy only when strictly newer. A
    /// server copy without a timestamp is always older.
    #[must_use]
    pub fn is_newer_than(&self, server_updated_at: Option<DateTime<Utc>>) -> bool {
        server_updated_at.is_none_or(|updated| self.saved_at > updated)
    }
}
