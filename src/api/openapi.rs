//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto;
use super::handlers::{search, simulation, system, templates};
use crate::error::{ErrorBody, ErrorResponse};
use crate::remote::{SearchHit, SearchKind};
use crate::service::{ExecutionOutcome, LifecycleState, SimulationState};

/// Aggregated OpenAPI description, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "Auto-order desk API",
        description = "Operator backend for supplier auto-order email templates: editing with local drafts, validation, preview, test sends, and dry runs of the purchase order before it is executed.",
        license(name = "MIT")
    ),
    paths(
        system::health_handler,
        templates::get_template,
        templates::load_template,
        templates::edit_fields,
        templates::preview_template,
        templates::save_template,
        templates::duplicate_template,
        templates::deactivate_template,
        templates::restore_history,
        templates::test_send,
        templates::close_template,
        simulation::open_simulation,
        simulation::get_simulation,
        simulation::send_test_email,
        simulation::execute_auto_order,
        simulation::close_simulation,
        search::search,
    ),
    components(schemas(
        ErrorResponse,
        ErrorBody,
        system::HealthResponse,
        dto::TemplateDto,
        dto::ValidationReportDto,
        dto::HistoryEntryDto,
        dto::TemplateSnapshotResponse,
        dto::EditFieldsRequest,
        dto::PreviewResponse,
        dto::DeactivateRequest,
        dto::TestSendBody,
        dto::RenderedPreviewDto,
        dto::OpenSimulationRequest,
        dto::ProductActionRequest,
        dto::SimulationTestEmailRequest,
        dto::ValidationResultDto,
        dto::SimulationResponse,
        dto::CloseSimulationResponse,
        dto::SupersededResponse,
        dto::SearchResponse,
        SearchHit,
        SearchKind,
        LifecycleState,
        SimulationState,
        ExecutionOutcome,
    )),
    tags(
        (name = "System", description = "Health"),
        (name = "Templates", description = "Template editor with local drafts"),
        (name = "Simulation", description = "Auto-order dry run and execution"),
        (name = "Search", description = "Debounced product and seller lookups"),
    )
)]
pub struct ApiDoc;
