//! REST endpoint handlers organized by resource.

pub mod search;
pub mod simulation;
pub mod system;
pub mod templates;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(templates::routes())
        .merge(simulation::routes())
        .merge(search::routes())
}
