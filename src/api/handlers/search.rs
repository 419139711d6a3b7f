//! Debounced product and seller lookups.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{SearchParams, SearchResponse};
use crate::app_state::AppState;
use crate::error::{DeskError, ErrorResponse};
use crate::remote::SearchKind;

const DEFAULT_CONTEXT: &str = "default";

/// `GET /search/{kind}`: Lookup as the operator types.
///
/// A call that is overtaken by a newer one in the same context answers
/// `superseded` with no results.
///
/// # Errors
///
/// Returns [`DeskError::NotFound`] for an unknown kind and the lookup
/// service error for a current request.
#[utoipa::path(
    get,
    path = "/api/v1/search/{kind}",
    tag = "Search",
    summary = "Search products or sellers",
    params(
        ("kind" = String, Path, description = "`products` or `sellers`"),
        SearchParams,
    ),
    responses(
        (status = 200, description = "Outcome of the lookup", body = SearchResponse),
        (status = 404, description = "Unknown kind", body = ErrorResponse),
        (status = 502, description = "Lookup service failed", body = ErrorResponse),
    )
)]
pub async fn search(
    State(state): State<AppState>,
    Path(raw_kind): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, DeskError> {
    let kind = SearchKind::parse(&raw_kind)?;
    let context = params.context.as_deref().unwrap_or(DEFAULT_CONTEXT);
    let outcome = state.search.context(context, kind).await.search(&params.q).await?;
    Ok(Json(SearchResponse::new(kind, outcome)))
}

/// Search routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/search/{kind}", get(search))
}
