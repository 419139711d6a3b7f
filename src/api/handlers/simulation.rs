//! Simulation panel handlers: open, view, test email, execute, close.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CloseSimulationResponse, OpenSimulationRequest, ProductActionRequest, SimulationResponse,
    SimulationTestEmailRequest, SupersededResponse,
};
use crate::app_state::AppState;
use crate::domain::ProductId;
use crate::error::{DeskError, ErrorResponse};
use crate::service::{ExecutionOutcome, PanelUpdate};

fn panel_response(update: PanelUpdate) -> Response {
    match update {
        PanelUpdate::Applied(view) => Json(SimulationResponse::from(view)).into_response(),
        PanelUpdate::Superseded { message } => {
            Json(SupersededResponse::new(message)).into_response()
        }
    }
}

/// `POST /simulation/open`: Dry-run the auto order for a product.
///
/// # Errors
///
/// Returns a validation error for an invalid product id. A call overtaken
/// by a newer open answers 200 with a `superseded` body.
#[utoipa::path(
    post,
    path = "/api/v1/simulation/open",
    tag = "Simulation",
    summary = "Open simulation",
    description = "Supersedes any open simulation, calls the simulation service and returns the checklist, preview and execution flag. Service failures appear as a single error row.",
    request_body = OpenSimulationRequest,
    responses(
        (status = 200, description = "Simulation ready, or a `superseded` body when a newer open or a close overtook it", body = SimulationResponse),
        (status = 400, description = "Invalid product id", body = ErrorResponse),
    )
)]
pub async fn open_simulation(
    State(state): State<AppState>,
    Json(req): Json<OpenSimulationRequest>,
) -> Result<Response, DeskError> {
    let product_id = ProductId::new(req.product_id)?;
    let update = state.simulation.open(product_id, &req.product_name).await;
    Ok(panel_response(update))
}

/// `GET /simulation`: Current panel state.
///
/// # Errors
///
/// Returns [`DeskError::NotFound`] when no simulation is open.
#[utoipa::path(
    get,
    path = "/api/v1/simulation",
    tag = "Simulation",
    summary = "Get simulation",
    responses(
        (status = 200, description = "Open simulation", body = SimulationResponse),
        (status = 404, description = "Nothing open", body = ErrorResponse),
    )
)]
pub async fn get_simulation(State(state): State<AppState>) -> Result<impl IntoResponse, DeskError> {
    let view = state
        .simulation
        .view()
        .await
        .ok_or_else(|| DeskError::NotFound("open simulation".to_string()))?;
    Ok(Json(SimulationResponse::from(view)))
}

/// `POST /simulation/test-email`: Send the auto-order email to a test address.
///
/// # Errors
///
/// Returns a validation error without contacting the service when no
/// valid recipient is available. An email delivered after the panel moved
/// on answers 200 with a `superseded` body.
#[utoipa::path(
    post,
    path = "/api/v1/simulation/test-email",
    tag = "Simulation",
    summary = "Send test email",
    request_body = SimulationTestEmailRequest,
    responses(
        (status = 200, description = "Test email sent; `superseded` body when the panel moved on meanwhile", body = SimulationResponse),
        (status = 400, description = "Missing or invalid recipient", body = ErrorResponse),
        (status = 409, description = "Simulation not ready", body = ErrorResponse),
    )
)]
pub async fn send_test_email(
    State(state): State<AppState>,
    Json(req): Json<SimulationTestEmailRequest>,
) -> Result<Response, DeskError> {
    let product_id = ProductId::new(req.product_id)?;
    let update = state
        .simulation
        .send_test_email(product_id, req.recipient.as_deref())
        .await?;
    Ok(panel_response(update))
}

/// `POST /simulation/execute`: Create the real purchase order.
///
/// # Errors
///
/// Returns [`DeskError::InvalidState`] unless the simulation is ready and
/// executable.
#[utoipa::path(
    post,
    path = "/api/v1/simulation/execute",
    tag = "Simulation",
    summary = "Execute auto order",
    description = "Creates the order when the simulation reported it feasible, then closes the panel.",
    request_body = ProductActionRequest,
    responses(
        (status = 201, description = "Order created", body = ExecutionOutcome),
        (status = 409, description = "Not executable", body = ErrorResponse),
        (status = 502, description = "Order service failed; retry permitted", body = ErrorResponse),
    )
)]
pub async fn execute_auto_order(
    State(state): State<AppState>,
    Json(req): Json<ProductActionRequest>,
) -> Result<impl IntoResponse, DeskError> {
    let product_id = ProductId::new(req.product_id)?;
    let outcome = state.simulation.execute(product_id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `POST /simulation/close`: Discard the panel state.
#[utoipa::path(
    post,
    path = "/api/v1/simulation/close",
    tag = "Simulation",
    summary = "Close simulation",
    responses(
        (status = 200, description = "Closed", body = CloseSimulationResponse),
    )
)]
pub async fn close_simulation(State(state): State<AppState>) -> impl IntoResponse {
    let closed = state.simulation.close().await;
    Json(CloseSimulationResponse { closed })
}

/// Simulation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/simulation", get(get_simulation))
        .route("/simulation/open", post(open_simulation))
        .route("/simulation/test-email", post(send_test_email))
        .route("/simulation/execute", post(execute_auto_order))
        .route("/simulation/close", post(close_simulation))
}
