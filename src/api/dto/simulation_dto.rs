//! Simulation panel DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::RenderedPreviewDto;
use crate::domain::{ValidationResult, ValidationStatus};
use crate::service::{SimulationState, SimulationView};

/// Request body for `POST /simulation/open`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OpenSimulationRequest {
    /// Product to simulate.
    pub product_id: i64,
    /// Display name shown in the panel.
    #[serde(default)]
    pub product_name: String,
}

/// Request body for `POST /simulation/execute`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProductActionRequest {
    /// Product currently open in the panel.
    pub product_id: i64,
}

/// Request body for `POST /simulation/test-email`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SimulationTestEmailRequest {
    /// Product currently open in the panel.
    pub product_id: i64,
    /// Recipient; the supplier/company email of the simulation is used
    /// when omitted.
    #[serde(default)]
    pub recipient: Option<String>,
}

/// One checklist row.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ValidationResultDto {
    /// What was checked.
    pub label: String,
    /// `ok`, `warning`, `error` or `info`.
    #[schema(value_type = String)]
    pub status: ValidationStatus,
    /// Service explanation.
    pub detail: String,
}

impl From<&ValidationResult> for ValidationResultDto {
    fn from(r: &ValidationResult) -> Self {
        Self {
            label: r.label.clone(),
            status: r.status,
            detail: r.detail.clone(),
        }
    }
}

/// State of the simulation panel.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SimulationResponse {
    /// Simulated product.
    pub product_id: i64,
    /// Product display name.
    pub product_name: String,
    /// Workflow state.
    pub state: SimulationState,
    /// Feasibility checklist.
    pub validation_results: Vec<ValidationResultDto>,
    /// Service-rendered email, HTML-escaped.
    pub rendered_preview: RenderedPreviewDto,
    /// Raw values of the service's `simulation` object.
    #[schema(value_type = Object)]
    pub simulation_metrics: Map<String, Value>,
    /// Whether the real order may be created.
    pub can_execute: bool,
    /// Supplier/company address used when no test recipient is entered.
    pub fallback_recipient: Option<String>,
    /// When the result was applied.
    pub last_run_at: DateTime<Utc>,
    /// Message of the last successful action.
    pub last_message: Option<String>,
    /// Message of the last failed action.
    pub last_error: Option<String>,
}

impl From<SimulationView> for SimulationResponse {
    fn from(view: SimulationView) -> Self {
        let sim = view.simulation;
        Self {
            product_id: sim.product_id.get(),
            product_name: sim.product_name,
            state: view.state,
            validation_results: sim.validation_results.iter().map(ValidationResultDto::from).collect(),
            rendered_preview: view.escaped_preview.into(),
            simulation_metrics: sim.simulation_metrics,
            can_execute: sim.can_execute,
            fallback_recipient: sim.fallback_recipient,
            last_run_at: sim.last_run_at,
            last_message: view.last_message,
            last_error: view.last_error,
        }
    }
}

/// Answer to an open or test-email call that a newer open or a close
/// overtook. Not an error: the panel simply moved on.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SupersededResponse {
    /// Always `superseded`.
    pub status: String,
    /// Service reply when the action still went through (a delivered
    /// test email).
    pub message: Option<String>,
}

impl SupersededResponse {
    /// Builds the body with an optional service message.
    #[must_use]
    pub fn new(message: Option<String>) -> Self {
        Self {
            status: "superseded".to_string(),
            message,
        }
    }
}

/// Response body for `POST /simulation/close`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CloseSimulationResponse {
    /// Whether a simulation was open.
    pub closed: bool,
}
