//! Shared application state injected into all Axum handlers.
//!
//! This is the process-wide session context: every workflow the operator
//! screens drive lives here and is reached through `State<AppState>`.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::{LifecycleRegistry, SearchRegistry, SimulationController};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Template slots, one per template type.
    pub templates: Arc<LifecycleRegistry>,
    /// The auto-order simulation panel.
    pub simulation: Arc<SimulationController>,
    /// Lookup contexts for product and seller fields.
    pub search: Arc<SearchRegistry>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}
