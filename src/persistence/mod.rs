//! Persistence layer: the local draft slots.
//!
//! Provides the [`DraftStore`] trait for caching unsaved template edits,
//! one slot per template type. [`MemoryDraftStore`] keeps slots in process;
//! [`PostgresDraftStore`] uses `sqlx::PgPool` so that drafts survive a
//! crash or restart.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;

pub use memory::MemoryDraftStore;
pub use postgres::PostgresDraftStore;

use crate::domain::{Draft, TemplateType};
use crate::error::DeskError;

/// Storage for one draft per template type.
///
/// Failures are reported but callers treat them as non-fatal.
#[async_trait]
pub trait DraftStore: Send + Sync + fmt::Debug {
    /// Reads the draft slot of `template_type`.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Persistence`] if the slot cannot be read.
    async fn load(&self, template_type: &TemplateType) -> Result<Option<Draft>, DeskError>;

    /// Overwrites the draft slot of `template_type`.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Persistence`] if the slot cannot be written.
    async fn store(&self, template_type: &TemplateType, draft: &Draft) -> Result<(), DeskError>;

    /// Empties the draft slot of `template_type`.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Persistence`] if the slot cannot be cleared.
    async fn clear(&self, template_type: &TemplateType) -> Result<(), DeskError>;
}
