//! Local draft cache with a recurring autosave and load-time reconciliation.
//!
//! The lifecycle owns the canonical template and publishes what the editor
//! currently shows through a `watch` channel. The autosave task only reads
//! that snapshot and writes the draft slot; it never touches the template.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::domain::{DeskEvent, Draft, EmailTemplate, EventBus, TemplateFields, TemplateType};
use crate::persistence::DraftStore;

/// Autosave period used when none (or zero) is configured.
pub const DEFAULT_AUTOSAVE_PERIOD: Duration = Duration::from_secs(30);

/// What the editor currently shows and whether it differs from the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorSnapshot {
    /// Current editable fields.
    pub fields: TemplateFields,
    /// `true` while there are edits not yet saved to the server.
    pub unsaved_changes: bool,
}

/// Outcome of [`DraftReconciler::reconcile_on_load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// Fields the editor should show.
    pub fields: TemplateFields,
    /// `savedAt` of the draft that won, if one did.
    pub restored_from: Option<DateTime<Utc>>,
}

/// Draft slot manager for one template type.
#[derive(Debug)]
pub struct DraftReconciler {
    template_type: TemplateType,
    store: Arc<dyn DraftStore>,
    event_bus: EventBus,
    period: Duration,
    snapshot: watch::Sender<EditorSnapshot>,
    autosave: Option<JoinHandle<()>>,
}

impl DraftReconciler {
    /// Creates a reconciler writing to `store` every `period` while dirty.
    ///
    /// A zero `period` is replaced by [`DEFAULT_AUTOSAVE_PERIOD`].
    #[must_use]
    pub fn new(
        template_type: TemplateType,
        store: Arc<dyn DraftStore>,
        event_bus: EventBus,
        period: Duration,
    ) -> Self {
        let (snapshot, _) = watch::channel(EditorSnapshot::default());
        let period = if period.is_zero() {
            tracing::warn!(%template_type, "zero autosave period, using default");
            DEFAULT_AUTOSAVE_PERIOD
        } else {
            period
        };
        Self {
            template_type,
            store,
            event_bus,
            period,
            snapshot,
            autosave: None,
        }
    }

    /// Returns `true` while there are edits not yet saved to the server.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.snapshot.borrow().unsaved_changes
    }

    /// Returns `true` while the autosave task is alive.
    #[must_use]
    pub fn is_autosave_running(&self) -> bool {
        self.autosave.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Records `fields` as the current unsaved editor content and makes
    /// sure the autosave timer is running.
    pub fn mark_dirty(&mut self, fields: &TemplateFields) {
        self.snapshot.send_replace(EditorSnapshot {
            fields: fields.clone(),
            unsaved_changes: true,
        });
        if !self.is_autosave_running() {
            self.autosave = Some(self.spawn_autosave());
        }
    }

    /// Records `fields` as matching the server copy. Later ticks are no-ops.
    pub fn mark_clean(&mut self, fields: TemplateFields) {
        self.snapshot.send_replace(EditorSnapshot {
            fields,
            unsaved_changes: false,
        });
    }

    /// Overwrites the draft slot with `fields` stamped now.
    pub async fn persist_draft_locally(&self, fields: &TemplateFields) {
        write_draft(self.store.as_ref(), &self.event_bus, &self.template_type, fields).await;
    }

    /// Merges the local draft against the freshly loaded server copy.
    ///
    /// A draft strictly newer than `server.updated_at` wins and leaves the
    /// editor dirty; an older one is discarded. Store failures are logged
    /// and treated as "no draft".
    pub async fn reconcile_on_load(&mut self, server: Option<&EmailTemplate>) -> Reconciled {
        let server_fields = server.map(EmailTemplate::fields).unwrap_or_default();
        let server_updated_at = server.and_then(|t| t.updated_at);

        let draft = match self.store.load(&self.template_type).await {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(template_type = %self.template_type, error = %e, "draft slot unreadable");
                None
            }
        };

        match draft {
            Some(draft) if draft.is_newer_than(server_updated_at) => {
                let fields = draft.fields();
                self.mark_dirty(&fields);
                tracing::info!(
                    template_type = %self.template_type,
                    saved_at = %draft.saved_at,
                    "restored unsaved draft"
                );
                Reconciled {
                    fields,
                    restored_from: Some(draft.saved_at),
                }
            }
            Some(_) => {
                tracing::debug!(template_type = %self.template_type, "discarding outdated draft");
                self.clear_draft().await;
                self.mark_clean(server_fields.clone());
                Reconciled {
                    fields: server_fields,
                    restored_from: None,
                }
            }
            None => {
                self.mark_clean(server_fields.clone());
                Reconciled {
                    fields: server_fields,
                    restored_from: None,
                }
            }
        }
    }

    /// Empties the draft slot.
    pub async fn clear_draft(&self) {
        if let Err(e) = self.store.clear(&self.template_type).await {
            tracing::warn!(template_type = %self.template_type, error = %e, "failed to clear draft");
        }
    }

    /// Persists one last time if dirty (otherwise clears the slot) and
    /// stops the autosave timer.
    pub async fn on_close(&mut self) {
        let current = self.snapshot.borrow().clone();
        if current.unsaved_changes {
            self.persist_draft_locally(&current.fields).await;
        } else {
            self.clear_draft().await;
        }
        self.stop_autosave();
    }

    fn stop_autosave(&mut self) {
        if let Some(task) = self.autosave.take() {
            task.abort();
        }
    }

    fn spawn_autosave(&self) -> JoinHandle<()> {
        let mut snapshot = self.snapshot.subscribe();
        let store = Arc::clone(&self.store);
        let event_bus = self.event_bus.clone();
        let template_type = self.template_type.clone();
        let period = self.period;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let current = snapshot.borrow_and_update().clone();
                if !current.unsaved_changes {
                    continue;
                }
                write_draft(store.as_ref(), &event_bus, &template_type, &current.fields).await;
                // A save may have gone through while the write was pending.
                let saved_meanwhile = !snapshot.borrow().unsaved_changes;
                if saved_meanwhile && let Err(e) = store.clear(&template_type).await {
                    tracing::warn!(%template_type, error = %e, "failed to clear superseded draft");
                }
            }
        })
    }
}

impl Drop for DraftReconciler {
    fn drop(&mut self) {
        self.stop_autosave();
    }
}

async fn write_draft(
    store: &dyn DraftStore,
    event_bus: &EventBus,
    template_type: &TemplateType,
    fields: &TemplateFields,
) {
    let draft = Draft::capture(fields, Utc::now());
    match store.store(template_type, &draft).await {
        Ok(()) => {
            tracing::debug!(%template_type, saved_at = %draft.saved_at, "draft autosaved");
            let _ = event_bus.publish(DeskEvent::DraftAutosaved {
                template_type: template_type.clone(),
                saved_at: draft.saved_at,
            });
        }
        Err(e) => tracing::warn!(%template_type, error = %e, "draft autosave failed"),
    }
}
