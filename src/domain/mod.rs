//! Domain layer: identifiers, templates, variables, validation and events.
//!
//! Everything here is free of I/O. The variable engine and the validation
//! rules are pure functions; the simulation adapter only decodes JSON.

pub mod desk_event;
pub mod draft;
pub mod event_bus;
pub mod ids;
pub mod simulation;
pub mod template;
pub mod validation;
pub mod variables;

pub use desk_event::{DeskEvent, EventTopic};
pub use draft::Draft;
pub use event_bus::EventBus;
pub use ids::{ProductId, TemplateId, TemplateType};
pub use simulation::{
    AutoOrderSimulation, RenderedPreview, ValidationResult, ValidationStatus,
    decode_simulation_payload,
};
pub use template::{EmailTemplate, FieldPatch, HistoryEntry, TemplateFields};
pub use validation::{ValidationReport, VariablePolicy};
pub use variables::{SampleData, VariableCatalog};
