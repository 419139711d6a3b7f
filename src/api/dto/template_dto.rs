//! Template editor DTOs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    EmailTemplate, FieldPatch, HistoryEntry, RenderedPreview, TemplateId, TemplateType,
    ValidationReport,
};
use crate::service::{LifecycleSnapshot, LifecycleState, TemplatePreview};

/// Email template as shown to the operator.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TemplateDto {
    /// Server row id, `null` until saved.
    pub id: Option<i64>,
    /// Template type.
    pub template_type: String,
    /// Display name.
    pub name: String,
    /// Subject text with `{{TOKEN}}` placeholders.
    pub subject: String,
    /// Body text with `{{TOKEN}}` placeholders.
    pub body: String,
    /// Soft-delete flag.
    pub active: bool,
    /// Default flag.
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

impl From<&EmailTemplate> for TemplateDto {
    fn from(t: &EmailTemplate) -> Self {
        Self {
            id: t.id.map(TemplateId::get),
            template_type: t.template_type.to_string(),
            name: t.name.clone(),
            subject: t.subject.clone(),
            body: t.body.clone(),
            active: t.active,
            default: t.default,
            created_at: t.created_at,
            updated_at: t.updated_at,
            created_by: t.created_by.clone(),
            updated_by_name: t.updated_by_name.clone(),
        }
    }
}

/// Required/recommended variable check.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ValidationReportDto {
    /// Missing required variables; any entry blocks saving.
    pub missing_required: Vec<String>,
    /// Missing recommended variables; warning only.
    pub missing_recommended: Vec<String>,
    /// `true` iff `missing_required` is non-empty.
    pub has_errors: bool,
}

impl From<&ValidationReport> for ValidationReportDto {
    fn from(r: &ValidationReport) -> Self {
        Self {
            missing_required: r.missing_required.clone(),
            missing_recommended: r.missing_recommended.clone(),
            has_errors: r.has_errors,
        }
    }
}

/// Past or alternate template row.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryEntryDto {
    /// Row id; pass it to the restore endpoint.
    pub id: i64,
    /// The stored template.
    pub template: TemplateDto,
}

impl From<&HistoryEntry> for HistoryEntryDto {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            id: entry.id.get(),
            template: TemplateDto::from(&entry.template),
        }
    }
}

/// Full state of one template slot.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TemplateSnapshotResponse {
    /// Template type of the slot.
    pub template_type: String,
    /// Workflow state.
    pub state: LifecycleState,
    /// Template as currently edited.
    pub template: TemplateDto,
    /// Normalized variables used by subject and body.
    pub used_variables: Vec<String>,
    /// Current validation report.
    pub validation: ValidationReportDto,
    /// Whether there are edits not saved to the server.
    pub unsaved_changes: bool,
    /// Set when a newer local draft replaced the server fields at load.
    pub draft_restored_at: Option<DateTime<Utc>>,
    /// History entries, excluding the loaded row.
    pub history: Vec<HistoryEntryDto>,
    /// Preview values keyed by variable name.
    pub sample_data: BTreeMap<String, String>,
    /// Variables known to the server.
    pub available_variables: Vec<String>,
    /// Message of the last failed operation.
    pub last_error: Option<String>,
}

impl TemplateSnapshotResponse {
    /// Builds the response for `template_type` from a lifecycle snapshot.
    #[must_use]
    pub fn new(template_type: &TemplateType, snapshot: LifecycleSnapshot) -> Self {
        Self {
            template_type: template_type.to_string(),
            state: snapshot.state,
            template: TemplateDto::from(&snapshot.template),
            used_variables: snapshot.used_variables,
            validation: ValidationReportDto::from(&snapshot.validation),
            unsaved_changes: snapshot.unsaved_changes,
            draft_restored_at: snapshot.draft_restored_at,
            history: snapshot.history.iter().map(HistoryEntryDto::from).collect(),
            sample_data: snapshot.sample_data,
            available_variables: snapshot.available_variables,
            last_error: snapshot.last_error,
        }
    }
}

/// Request body for `PATCH /templates/{type}/fields`. Omitted fields are
/// left untouched.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EditFieldsRequest {
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

impl From<EditFieldsRequest> for FieldPatch {
    fn from(req: EditFieldsRequest) -> Self {
        Self {
            name: req.name,
            subject: req.subject,
            body: req.body,
        }
    }
}

/// Response body for `GET /templates/{type}/preview`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PreviewResponse {
    /// Subject rendered with the sample data.
    pub subject: String,
    /// Body rendered with the sample data.
    pub body: String,
    /// Placeholders without a sample value, e.g. `{{DELIVERY_DATE}}`.
    pub unresolved: Vec<String>,
    /// Validation of the unrendered text.
    pub validation: ValidationReportDto,
}

impl From<TemplatePreview> for PreviewResponse {
    fn from(p: TemplatePreview) -> Self {
        Self {
            validation: ValidationReportDto::from(&p.validation),
            subject: p.subject,
            body: p.body,
            unresolved: p.unresolved,
        }
    }
}

/// Request body for `POST /templates/{type}/deactivate`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DeactivateRequest {
    /// Must be `true`; deactivation is refused otherwise.
    #[serde(default)]
    pub confirm: bool,
}

/// Request body for `POST /templates/{type}/test-send`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TestSendBody {
    /// Recipient; the sample supplier/company email is used when omitted.
    #[serde(default)]
    pub recipient: Option<String>,
}

/// Subject/body pair rendered by a remote service.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RenderedPreviewDto {
    /// Rendered subject.
    pub subject: String,
    /// Rendered body.
    pub body: String,
}

impl From<RenderedPreview> for RenderedPreviewDto {
    fn from(p: RenderedPreview) -> Self {
        Self {
            subject: p.subject,
            body: p.body,
        }
    }
}
