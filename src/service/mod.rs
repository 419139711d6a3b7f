//! Service layer: the stateful workflows behind the REST API.
//!
//! [`TemplateLifecycle`] drives one template type through
//! load/edit/save and owns a [`DraftReconciler`] for its local draft.
//! [`SimulationController`] runs the auto-order dry run and gates the real
//! execution. [`DebouncedSearch`] coalesces lookups per search context.
//! All of them publish transitions on the [`super::domain::EventBus`].

pub mod draft_reconciler;
pub mod lifecycle_registry;
pub mod remote_search;
pub mod simulation_controller;
pub mod template_lifecycle;

pub use draft_reconciler::{DEFAULT_AUTOSAVE_PERIOD, DraftReconciler, EditorSnapshot, Reconciled};
pub use lifecycle_registry::LifecycleRegistry;
pub use remote_search::{DebouncedSearch, MAX_SEARCH_CONTEXTS, SearchOutcome, SearchRegistry};
pub use simulation_controller::{
    ExecutionOutcome, PanelUpdate, SimulationController, SimulationState, SimulationTicket,
    SimulationView,
};
pub use template_lifecycle::{
    LifecycleSnapshot, LifecycleState, SaveOverrides, TemplateLifecycle, TemplatePreview,
};
