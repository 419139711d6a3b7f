//! Auto-order dry-run results and the simulation payload adapter.
//!
//! The simulation service answers with field names in either English or
//! Romanian (`result`/`rezultat`, `details`/`detalii`, ...). All of that
//! tolerance lives in [`decode_simulation_payload`]; nothing downstream
//! looks at raw field names.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::ProductId;
use crate::error::DeskError;

/// Severity of one feasibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Check passed.
    Ok,
    /// Check passed with a caveat.
    Warning,
    /// Check failed.
    Error,
    /// Informational row, or an unrecognized result word.
    Info,
}

impl ValidationStatus {
    /// Maps a free-form result word through the fixed vocabulary.
    /// Unrecognized words map to [`ValidationStatus::Info`].
    #[must_use]
    pub fn from_result_text(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "ok" | "success" | "succes" | "passed" | "valid" | "da" | "yes" | "true" | "✓"
            | "✔" => Self::Ok,
            "error" | "eroare" | "fail" | "failed" | "esuat" | "eșuat" | "invalid" | "nu"
            | "no" | "false" | "✗" | "✘" => Self::Error,
            "warning" | "warn" | "atentie" | "atenție" | "avertisment" | "⚠" => Self::Warning,
            _ => Self::Info,
        }
    }
}

/// One row of the feasibility checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// What was checked.
    pub label: String,
    /// Outcome severity.
    pub status: ValidationStatus,
    /// Free-form explanation from the service.
    pub detail: String,
}

/// Subject/body pair as rendered by a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderedPreview {
    /// Rendered subject line.
    pub subject: String,
    /// Rendered body text.
    pub body: String,
}

impl RenderedPreview {
    /// HTML-escaped copy for display; body newlines become `<br>`.
    #[must_use]
    pub fn escaped(&self) -> Self {
        Self {
            subject: escape_html(&self.subject),
            body: escape_html(&self.body).replace('\n', "<br>"),
        }
    }
}

/// A dry run of the auto-order flow for one product. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoOrderSimulation {
    /// Simulated product.
    pub product_id: ProductId,
    /// Product display name supplied by the operator screen.
    pub product_name: String,
    /// Feasibility checklist.
    pub validation_results: Vec<ValidationResult>,
    /// Service-substituted email preview.
    pub rendered_preview: RenderedPreview,
    /// Every value of the service's `simulation` object.
    pub simulation_metrics: Map<String, Value>,
    /// Service-computed feasibility flag (`poate_comanda`).
    pub can_execute: bool,
    /// Supplier/company address usable as a test recipient.
    pub fallback_recipient: Option<String>,
    /// When the result was applied.
    pub last_run_at: DateTime<Utc>,
}

impl AutoOrderSimulation {
    /// Loading placeholder shown while the service is running.
    #[must_use]
    pub fn pending(product_id: ProductId, product_name: &str) -> Self {
        Self {
            product_id,
            product_name: product_name.to_string(),
            validation_results: Vec::new(),
            rendered_preview: RenderedPreview::default(),
            simulation_metrics: Map::new(),
            can_execute: false,
            fallback_recipient: None,
            last_run_at: Utc::now(),
        }
    }

    /// A failed run rendered inline as a single error row.
    #[must_use]
    pub fn failed(product_id: ProductId, product_name: &str, reason: &str) -> Self {
        let mut simulation = Self::pending(product_id, product_name);
        simulation.validation_results.push(ValidationResult {
            label: "Simulation".to_string(),
            status: ValidationStatus::Error,
            detail: reason.to_string(),
        });
        simulation
    }
}

/// Simulation keys carrying an address usable as a test recipient.
const RECIPIENT_KEYS: &[&str] = &[
    "supplier_email",
    "email_furnizor",
    "company_email",
    "email_companie",
];

/// Decodes a simulation service response.
///
/// Field fallback order (first present wins):
/// - checklist label: `condition`, `conditie`
/// - checklist result: `result`, `rezultat`
/// - checklist detail: `details`, `detalii`
/// - preview subject: `subject_preview`, `subject`
/// - preview body: `body_preview`, `body`
/// - feasibility: `poate_comanda`, `can_order` (must be JSON `true`)
/// - failure text: `message`, `mesaj`
///
/// # Errors
///
/// Returns [`DeskError::Rejected`] when the service reports
/// `success: false` and [`DeskError::Transport`] when `data` is missing.
pub fn decode_simulation_payload(
    product_id: ProductId,
    product_name: &str,
    payload: &Value,
) -> Result<AutoOrderSimulation, DeskError> {
    if payload.get("success").and_then(Value::as_bool) == Some(false) {
        let message = first_str(payload, &["message", "mesaj"])
            .unwrap_or("simulation failed")
            .to_string();
        return Err(DeskError::Rejected(message));
    }
    let data = payload
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| DeskError::Transport("simulation payload has no data object".to_string()))?;

    let validation_results = data
        .get("validations")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().map(decode_validation_row).collect())
        .unwrap_or_default();

    let template = data.get("template").unwrap_or(&Value::Null);
    let rendered_preview = RenderedPreview {
        subject: first_str(template, &["subject_preview", "subject"])
            .unwrap_or_default()
            .to_string(),
        body: first_str(template, &["body_preview", "body"])
            .unwrap_or_default()
            .to_string(),
    };

    let simulation_metrics = data
        .get("simulation")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let can_execute = ["poate_comanda", "can_order"]
        .iter()
        .find_map(|key| simulation_metrics.get(*key))
        .is_some_and(|flag| flag.as_bool() == Some(true));
    let fallback_recipient = RECIPIENT_KEYS
        .iter()
        .filter_map(|key| simulation_metrics.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|addr| !addr.is_empty())
        .map(str::to_string);

    Ok(AutoOrderSimulation {
        product_id,
        product_name: product_name.to_string(),
        validation_results,
        rendered_preview,
        simulation_metrics,
        can_execute,
        fallback_recipient,
        last_run_at: Utc::now(),
    })
}

fn decode_validation_row(row: &Value) -> ValidationResult {
    ValidationResult {
        label: first_str(row, &["condition", "conditie"])
            .unwrap_or_default()
            .to_string(),
        status: ValidationStatus::from_result_text(
            first_str(row, &["result", "rezultat"]).unwrap_or_default(),
        ),
        detail: first_str(row, &["details", "detalii"])
            .unwrap_or_default()
            .to_string(),
    }
}

fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
