//! One [`TemplateLifecycle`] per template type, created on first use.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use super::template_lifecycle::{LifecycleSnapshot, TemplateLifecycle};
use crate::domain::{EventBus, TemplateType};
use crate::persistence::DraftStore;
use crate::remote::TemplateStore;

/// Registry of template slots.
///
/// The map is guarded by a `RwLock`; each slot by its own `Mutex`, so a
/// slow save on one type never blocks another.
#[derive(Debug)]
pub struct LifecycleRegistry {
    slots: RwLock<HashMap<TemplateType, Arc<Mutex<TemplateLifecycle>>>>,
    store: Arc<dyn TemplateStore>,
    drafts: Arc<dyn DraftStore>,
    event_bus: EventBus,
    autosave_interval: Duration,
}

impl LifecycleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(
        store: Arc<dyn TemplateStore>,
        drafts: Arc<dyn DraftStore>,
        event_bus: EventBus,
        autosave_interval: Duration,
    ) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            store,
            drafts,
            event_bus,
            autosave_interval,
        }
    }

    /// Returns the slot for `template_type`, creating an idle one if needed.
    pub async fn slot(&self, template_type: &TemplateType) -> Arc<Mutex<TemplateLifecycle>> {
        if let Some(slot) = self.slots.read().await.get(template_type) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        let slot = slots.entry(template_type.clone()).or_insert_with(|| {
            tracing::debug!(%template_type, "creating template slot");
            Arc::new(Mutex::new(TemplateLifecycle::new(
                template_type.clone(),
                Arc::clone(&self.store),
                Arc::clone(&self.drafts),
                self.event_bus.clone(),
                self.autosave_interval,
            )))
        });
        Arc::clone(slot)
    }

    /// Returns the slot for `template_type` only if it already exists.
    pub async fn existing(&self, template_type: &TemplateType) -> Option<Arc<Mutex<TemplateLifecycle>>> {
        self.slots.read().await.get(template_type).map(Arc::clone)
    }

    /// Read-only view of `template_type`; an unopened type gets an idle
    /// view and no slot is created.
    pub async fn snapshot(&self, template_type: &TemplateType) -> LifecycleSnapshot {
        match self.existing(template_type).await {
            Some(slot) => slot.lock().await.snapshot(),
            None => LifecycleSnapshot::idle(template_type),
        }
    }

    /// Number of slots created so far.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Returns `true` if no slot has been created.
    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}
