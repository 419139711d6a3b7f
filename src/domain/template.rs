//! Email template aggregate, editable fields and history snapshots.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::variables::used_variables;
use super::{TemplateId, TemplateType};

/// The three operator-editable parts of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFields {
    /// Display name of the template.
    pub name: String,
    /// Subject line, may contain `{{TOKEN}}` placeholders.
    pub subject: String,
    /// Body text, may contain `{{TOKEN}}` placeholders.
    pub body: String,
}

/// Partial edit applied by the operator; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FieldPatch {
    /// New template name.
    #[serde(default)]
    pub name: Option<String>,
    /// New subject text.
    #[serde(default)]
    pub subject: Option<String>,
    /// New body text.
    #[serde(default)]
    pub body: Option<String>,
}

impl FieldPatch {
    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.subject.is_none() && self.body.is_none()
    }
}

/// A parameterized subject/body pair for one notification type.
///
/// `id` is `None` until the server has persisted the row, and again for a
/// duplicated copy that has not been saved yet. Timestamps and authorship
/// are owned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailTemplate {
    /// Server row id.
    pub id: Option<TemplateId>,
    /// Notification type.
    pub template_type: TemplateType,
    /// Display name.
    pub name: String,
    /// Subject text.
    pub subject: String,
    /// Body text.
    pub body: String,
    /// Soft-delete flag; deactivated templates are never removed.
    pub active: bool,
    /// Whether this row is the default for its type.
    pub default: bool,
    /// Server creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Server timestamp of the last save.
    pub updated_at: Option<DateTime<Utc>>,
    /// Author of the first save.
    pub created_by: Option<String>,
    /// Display name of the last editor.
    pub updated_by_name: Option<String>,
}

impl EmailTemplate {
    /// An unsaved, empty, active template of the given type.
    #[must_use]
    pub fn blank(template_type: TemplateType) -> Self {
        Self {
            id: None,
            template_type,
            name: String::new(),
            subject: String::new(),
            body: String::new(),
            active: true,
            default: false,
            created_at: None,
            updated_at: None,
            created_by: None,
            updated_by_name: None,
        }
    }

    /// Copies out the editable fields.
    #[must_use]
    pub fn fields(&self) -> TemplateFields {
        TemplateFields {
            name: self.name.clone(),
            subject: self.subject.clone(),
            body: self.body.clone(),
        }
    }

    /// Overwrites the editable fields.
    pub fn set_fields(&mut self, fields: TemplateFields) {
        self.name = fields.name;
        self.subject = fields.subject;
        self.body = fields.body;
    }

    /// Applies the non-`None` parts of a patch.
    pub fn apply_patch(&mut self, patch: FieldPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(subject) = patch.subject {
            self.subject = subject;
        }
        if let Some(body) = patch.body {
            self.body = body;
        }
    }

    /// Normalized tokens used across subject and body.
    #[must_use]
    pub fn used_variables(&self) -> BTreeSet<String> {
        used_variables(&self.subject, &self.body)
    }
}

/// Read-only snapshot of a past or alternate template row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// Row id of the snapshot.
    pub id: TemplateId,
    /// The template as stored in that row.
    pub template: EmailTemplate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_is_unsaved_and_active() {
        let t = EmailTemplate::blank(TemplateType::auto_order());
        assert!(t.id.is_none());
        assert!(t.active);
        assert!(!t.default);
        assert_eq!(t.fields(), TemplateFields::default());
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut t = EmailTemplate::blank(TemplateType::auto_order());
        t.set_fields(TemplateFields {
            name: "n".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        });
        t.apply_patch(FieldPatch {
            subject: Some("Comanda {{ORDER_NUMBER}}".to_string()),
            ..FieldPatch::default()
        });
        assert_eq!(t.name, "n");
        assert_eq!(t.body, "b");
        assert!(t.used_variables().contains("ORDER_NUMBER"));
    }

    #[test]
    fn empty_patch() {
        assert!(FieldPatch::default().is_empty());
        assert!(
            !FieldPatch {
                body: Some(String::new()),
                ..FieldPatch::default()
            }
            .is_empty()
        );
    }
}
