//! Template editor handlers: load, edit, preview, save, duplicate,
//! deactivate, history restore, test send and close.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::api::dto::{
    DeactivateRequest, EditFieldsRequest, PreviewResponse, RenderedPreviewDto,
    TemplateSnapshotResponse, TestSendBody,
};
use crate::app_state::AppState;
use crate::domain::{TemplateId, TemplateType};
use crate::error::{DeskError, ErrorResponse};
use crate::service::SaveOverrides;

async fn snapshot_response(
    state: &AppState,
    template_type: &TemplateType,
) -> TemplateSnapshotResponse {
    let snapshot = state.templates.snapshot(template_type).await;
    TemplateSnapshotResponse::new(template_type, snapshot)
}

/// `GET /templates/{type}`: Current state of a template slot.
///
/// # Errors
///
/// Returns [`DeskError::Validation`] for a malformed template type.
#[utoipa::path(
    get,
    path = "/api/v1/templates/{template_type}",
    tag = "Templates",
    summary = "Get template slot",
    description = "Returns the editor state of the slot without contacting the persistence service.",
    params(("template_type" = String, Path, description = "Template type, e.g. auto_order")),
    responses(
        (status = 200, description = "Slot state", body = TemplateSnapshotResponse),
        (status = 400, description = "Malformed template type", body = ErrorResponse),
    )
)]
pub async fn get_template(
    State(state): State<AppState>,
    Path(raw_type): Path<String>,
) -> Result<impl IntoResponse, DeskError> {
    let template_type = TemplateType::parse(&raw_type)?;
    Ok(Json(snapshot_response(&state, &template_type).await))
}

/// `POST /templates/{type}/load`: Fetch and reconcile with the local draft.
///
/// # Errors
///
/// Returns the persistence service error when the template cannot be fetched.
#[utoipa::path(
    post,
    path = "/api/v1/templates/{template_type}/load",
    tag = "Templates",
    summary = "Load template",
    description = "Fetches the template, sample data and variable catalog, applies a newer local draft if one exists, then fetches history.",
    params(("template_type" = String, Path, description = "Template type")),
    responses(
        (status = 200, description = "Loaded slot", body = TemplateSnapshotResponse),
        (status = 502, description = "Persistence service unavailable", body = ErrorResponse),
    )
)]
pub async fn load_template(
    State(state): State<AppState>,
    Path(raw_type): Path<String>,
) -> Result<impl IntoResponse, DeskError> {
    let template_type = TemplateType::parse(&raw_type)?;
    let slot = state.templates.slot(&template_type).await;
    let snapshot = slot.lock().await.load().await?;
    Ok(Json(TemplateSnapshotResponse::new(&template_type, snapshot)))
}

/// `PATCH /templates/{type}/fields`: Apply an edit.
///
/// # Errors
///
/// Returns [`DeskError::InvalidState`] when the template is not loaded.
#[utoipa::path(
    patch,
    path = "/api/v1/templates/{template_type}/fields",
    tag = "Templates",
    summary = "Edit fields",
    description = "Applies a partial name/subject/body edit, revalidates and marks the draft dirty.",
    params(("template_type" = String, Path, description = "Template type")),
    request_body = EditFieldsRequest,
    responses(
        (status = 200, description = "Updated slot", body = TemplateSnapshotResponse),
        (status = 409, description = "Template not loaded", body = ErrorResponse),
    )
)]
pub async fn edit_fields(
    State(state): State<AppState>,
    Path(raw_type): Path<String>,
    Json(req): Json<EditFieldsRequest>,
) -> Result<impl IntoResponse, DeskError> {
    let template_type = TemplateType::parse(&raw_type)?;
    let slot = state.templates.slot(&template_type).await;
    let mut lifecycle = slot.lock().await;
    let _ = lifecycle.edit(req.into())?;
    Ok(Json(TemplateSnapshotResponse::new(&template_type, lifecycle.snapshot())))
}

/// `GET /templates/{type}/preview`: Render with the sample data.
///
/// # Errors
///
/// Returns [`DeskError::InvalidState`] when the template is not loaded.
#[utoipa::path(
    get,
    path = "/api/v1/templates/{template_type}/preview",
    tag = "Templates",
    summary = "Preview template",
    description = "Renders subject and body with the sample data and lists unresolved placeholders.",
    params(("template_type" = String, Path, description = "Template type")),
    responses(
        (status = 200, description = "Rendered preview", body = PreviewResponse),
        (status = 409, description = "Template not loaded", body = ErrorResponse),
    )
)]
pub async fn preview_template(
    State(state): State<AppState>,
    Path(raw_type): Path<String>,
) -> Result<impl IntoResponse, DeskError> {
    let template_type = TemplateType::parse(&raw_type)?;
    let slot = state.templates.slot(&template_type).await;
    let preview = slot.lock().await.preview()?;
    Ok(Json(PreviewResponse::from(preview)))
}

/// `POST /templates/{type}/save`: Save to the persistence service.
///
/// # Errors
///
/// Returns a validation error without contacting the service when a
/// required variable or field is missing.
#[utoipa::path(
    post,
    path = "/api/v1/templates/{template_type}/save",
    tag = "Templates",
    summary = "Save template",
    description = "Validates, saves, adopts the server copy and clears the local draft.",
    params(("template_type" = String, Path, description = "Template type")),
    responses(
        (status = 200, description = "Saved slot", body = TemplateSnapshotResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 502, description = "Save failed; edits and draft kept", body = ErrorResponse),
    )
)]
pub async fn save_template(
    State(state): State<AppState>,
    Path(raw_type): Path<String>,
) -> Result<impl IntoResponse, DeskError> {
    let template_type = TemplateType::parse(&raw_type)?;
    let slot = state.templates.slot(&template_type).await;
    let mut lifecycle = slot.lock().await;
    let _ = lifecycle.save(SaveOverrides::default()).await?;
    Ok(Json(TemplateSnapshotResponse::new(&template_type, lifecycle.snapshot())))
}

/// `POST /templates/{type}/duplicate`: Save as a new row.
///
/// # Errors
///
/// Same as `save`.
#[utoipa::path(
    post,
    path = "/api/v1/templates/{template_type}/duplicate",
    tag = "Templates",
    summary = "Duplicate template",
    description = "Saves the current fields as a new row named `<name> - copie`.",
    params(("template_type" = String, Path, description = "Template type")),
    responses(
        (status = 200, description = "Slot now showing the copy", body = TemplateSnapshotResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 502, description = "Save failed", body = ErrorResponse),
    )
)]
pub async fn duplicate_template(
    State(state): State<AppState>,
    Path(raw_type): Path<String>,
) -> Result<impl IntoResponse, DeskError> {
    let template_type = TemplateType::parse(&raw_type)?;
    let slot = state.templates.slot(&template_type).await;
    let mut lifecycle = slot.lock().await;
    let _ = lifecycle.duplicate().await?;
    Ok(Json(TemplateSnapshotResponse::new(&template_type, lifecycle.snapshot())))
}

/// `POST /templates/{type}/deactivate`: Soft delete.
///
/// # Errors
///
/// Returns a validation error without `confirm: true` or for an unsaved
/// template.
#[utoipa::path(
    post,
    path = "/api/v1/templates/{template_type}/deactivate",
    tag = "Templates",
    summary = "Deactivate template",
    description = "Saves the loaded template with `is_active = false`. Requires `confirm: true`.",
    params(("template_type" = String, Path, description = "Template type")),
    request_body = DeactivateRequest,
    responses(
        (status = 200, description = "Deactivated", body = TemplateSnapshotResponse),
        (status = 400, description = "Not confirmed or not saved yet", body = ErrorResponse),
    )
)]
pub async fn deactivate_template(
    State(state): State<AppState>,
    Path(raw_type): Path<String>,
    Json(req): Json<DeactivateRequest>,
) -> Result<impl IntoResponse, DeskError> {
    let template_type = TemplateType::parse(&raw_type)?;
    let slot = state.templates.slot(&template_type).await;
    let mut lifecycle = slot.lock().await;
    let _ = lifecycle.deactivate(req.confirm).await?;
    Ok(Json(TemplateSnapshotResponse::new(&template_type, lifecycle.snapshot())))
}

/// `POST /templates/{type}/history/{entry_id}/restore`: Copy a history
/// entry into the editor.
///
/// # Errors
///
/// Returns [`DeskError::NotFound`] when the entry is not in the fetched history.
#[utoipa::path(
    post,
    path = "/api/v1/templates/{template_type}/history/{entry_id}/restore",
    tag = "Templates",
    summary = "Restore history entry",
    description = "Copies the entry's fields into the editor without saving.",
    params(
        ("template_type" = String, Path, description = "Template type"),
        ("entry_id" = i64, Path, description = "History row id"),
    ),
    responses(
        (status = 200, description = "Editor now holds the entry", body = TemplateSnapshotResponse),
        (status = 404, description = "Unknown entry", body = ErrorResponse),
    )
)]
pub async fn restore_history(
    State(state): State<AppState>,
    Path((raw_type, entry_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, DeskError> {
    let template_type = TemplateType::parse(&raw_type)?;
    let slot = state.templates.slot(&template_type).await;
    let mut lifecycle = slot.lock().await;
    let _ = lifecycle.load_from_history(TemplateId::new(entry_id))?;
    Ok(Json(TemplateSnapshotResponse::new(&template_type, lifecycle.snapshot())))
}

/// `POST /templates/{type}/test-send`: Send a test email.
///
/// # Errors
///
/// Returns a validation error without contacting the service when no
/// valid recipient is available.
#[utoipa::path(
    post,
    path = "/api/v1/templates/{template_type}/test-send",
    tag = "Templates",
    summary = "Send test email",
    description = "Sends the current fields, saved or not, to the given recipient or the sample supplier address.",
    params(("template_type" = String, Path, description = "Template type")),
    request_body = TestSendBody,
    responses(
        (status = 200, description = "Preview of the sent email", body = RenderedPreviewDto),
        (status = 400, description = "Invalid template or recipient", body = ErrorResponse),
    )
)]
pub async fn test_send(
    State(state): State<AppState>,
    Path(raw_type): Path<String>,
    Json(req): Json<TestSendBody>,
) -> Result<impl IntoResponse, DeskError> {
    let template_type = TemplateType::parse(&raw_type)?;
    let slot = state.templates.slot(&template_type).await;
    let preview = slot.lock().await.send_test(req.recipient.as_deref()).await?;
    Ok(Json(RenderedPreviewDto::from(preview)))
}

/// `POST /templates/{type}/close`: Close the editor.
///
/// # Errors
///
/// Returns [`DeskError::Validation`] for a malformed template type.
#[utoipa::path(
    post,
    path = "/api/v1/templates/{template_type}/close",
    tag = "Templates",
    summary = "Close editor",
    description = "Persists unsaved edits to the local draft (or clears it) and stops the autosave timer.",
    params(("template_type" = String, Path, description = "Template type")),
    responses(
        (status = 200, description = "Idle slot", body = TemplateSnapshotResponse),
    )
)]
pub async fn close_template(
    State(state): State<AppState>,
    Path(raw_type): Path<String>,
) -> Result<impl IntoResponse, DeskError> {
    let template_type = TemplateType::parse(&raw_type)?;
    let Some(slot) = state.templates.existing(&template_type).await else {
        return Ok(Json(snapshot_response(&state, &template_type).await));
    };
    let mut lifecycle = slot.lock().await;
    lifecycle.close().await;
    Ok(Json(TemplateSnapshotResponse::new(&template_type, lifecycle.snapshot())))
}

/// Template routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/templates/{template_type}", get(get_template))
        .route("/templates/{template_type}/load", post(load_template))
        .route("/templates/{template_type}/fields", patch(edit_fields))
        .route("/templates/{template_type}/preview", get(preview_template))
        .route("/templates/{template_type}/save", post(save_template))
        .route("/templates/{template_type}/duplicate", post(duplicate_template))
        .route("/templates/{template_type}/deactivate", post(deactivate_template))
        .route(
            "/templates/{template_type}/history/{entry_id}/restore",
            post(restore_history),
        )
        .route("/templates/{template_type}/test-send", post(test_send))
        .route("/templates/{template_type}/close", post(close_template))
}
