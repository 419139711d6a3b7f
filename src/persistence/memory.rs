//! In-process draft slots.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::DraftStore;
use crate::domain::{Draft, TemplateType};
use crate::error::DeskError;

/// Draft slots held in a `RwLock<HashMap<...>>`; lost on restart.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    slots: RwLock<HashMap<TemplateType, Draft>>,
}

impl MemoryDraftStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied slots.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Returns `true` if no slot holds a draft.
    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn load(&self, template_type: &TemplateType) -> Result<Option<Draft>, DeskError> {
        Ok(self.slots.read().await.get(template_type).cloned())
    }

    async fn store(&self, template_type: &TemplateType, draft: &Draft) -> Result<(), DeskError> {
        self.slots
            .write()
            .await
            .insert(template_type.clone(), draft.clone());
        Ok(())
    }

    async fn clear(&self, template_type: &TemplateType) -> Result<(), DeskError> {
        self.slots.write().await.remove(template_type);
        Ok(())
    }
}
