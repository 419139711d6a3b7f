//! Remote collaborators: the persistence, simulation and lookup services.
//!
//! Each service sits behind a trait so that the services layer can be
//! exercised with in-process fakes. The `Http*` implementations use a
//! shared `reqwest::Client`; every response goes through
//! [`wire::read_envelope`], which turns non-2xx statuses into
//! [`crate::error::DeskError::Transport`] and `success: false` bodies into
//! [`crate::error::DeskError::Rejected`].

pub mod search;
pub mod simulation;
pub mod templates;
pub mod wire;

pub use search::{HttpSearchBackend, SearchBackend, SearchHit, SearchKind};
pub use simulation::{HttpSimulationService, SimulationService};
pub use templates::{HttpTemplateStore, LoadedTemplate, TemplateStore};
pub use wire::{SaveTemplateRequest, SimulationAck, TestSendRequest};
