//! Template lifecycle: load, edit, save, duplicate, deactivate and history.
//!
//! One [`TemplateLifecycle`] per template type. It is the only writer of
//! the in-memory template; the [`DraftReconciler`] it owns mirrors the
//! editor fields into the local draft slot.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::draft_reconciler::DraftReconciler;
use crate::domain::validation::{RECIPIENT_FALLBACK_KEYS, check_required_fields, resolve_recipient};
use crate::domain::variables::{detect_unresolved, render};
use crate::domain::{
    DeskEvent, EmailTemplate, EventBus, FieldPatch, HistoryEntry, RenderedPreview, SampleData,
    TemplateId, TemplateType, ValidationReport, VariableCatalog, VariablePolicy,
};
use crate::error::{DeskError, ValidationError};
use crate::persistence::DraftStore;
use crate::remote::{SaveTemplateRequest, TemplateStore, TestSendRequest};

/// Suffix appended to the name of a duplicated template.
pub const DUPLICATE_SUFFIX: &str = " - copie";

/// Workflow state of a template slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Nothing loaded.
    Idle,
    /// Fetching the server copy.
    Loading,
    /// Editor matches the server copy.
    Loaded,
    /// Editor holds unsaved changes.
    Editing,
    /// A save request is in flight.
    Saving,
    /// The initial load failed.
    Error,
}

/// Per-call adjustments to a save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOverrides {
    /// Send `template_id: null` so the server creates a new row.
    pub force_new: bool,
    /// Replaces the name for this save.
    pub name: Option<String>,
    /// Replaces the active flag for this save.
    pub active: Option<bool>,
}

/// Client-side rendering of the current fields with the sample data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplatePreview {
    /// Rendered subject.
    pub subject: String,
    /// Rendered body.
    pub body: String,
    /// Placeholders left after rendering, in order of appearance.
    pub unresolved: Vec<String>,
    /// Validation of the unrendered text.
    pub validation: ValidationReport,
}

/// Read-only view of a slot.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleSnapshot {
    /// Workflow state.
    pub state: LifecycleState,
    /// Template as currently edited.
    pub template: EmailTemplate,
    /// Variables used by subject and body.
    pub used_variables: Vec<String>,
    /// Current validation report.
    pub validation: ValidationReport,
    /// Whether there are edits not saved to the server.
    pub unsaved_changes: bool,
    /// `savedAt` of the local draft restored at load, if any.
    pub draft_restored_at: Option<DateTime<Utc>>,
    /// Past and alternate rows, excluding the loaded one.
    pub history: Vec<HistoryEntry>,
    /// Preview values.
    pub sample_data: BTreeMap<String, String>,
    /// Variables known to the server.
    pub available_variables: Vec<String>,
    /// Message of the last failed operation.
    pub last_error: Option<String>,
}

impl LifecycleSnapshot {
    /// View of a slot that was never opened.
    #[must_use]
    pub fn idle(template_type: &TemplateType) -> Self {
        let template = EmailTemplate::blank(template_type.clone());
        let used = template.used_variables();
        Self {
            state: LifecycleState::Idle,
            validation: VariablePolicy::for_type(template_type).validate(&used),
            used_variables: used.into_iter().collect(),
            template,
            unsaved_changes: false,
            draft_restored_at: None,
            history: Vec::new(),
            sample_data: BTreeMap::new(),
            available_variables: Vec::new(),
            last_error: None,
        }
    }
}

/// Load/edit/save workflow of one template type.
#[derive(Debug)]
pub struct TemplateLifecycle {
    template_type: TemplateType,
    store: Arc<dyn TemplateStore>,
    drafts: DraftReconciler,
    policy: VariablePolicy,
    event_bus: EventBus,
    state: LifecycleState,
    template: EmailTemplate,
    sample_data: SampleData,
    catalog: VariableCatalog,
    history: Vec<HistoryEntry>,
    report: ValidationReport,
    draft_restored_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl TemplateLifecycle {
    /// Creates an idle slot.
    #[must_use]
    pub fn new(
        template_type: TemplateType,
        store: Arc<dyn TemplateStore>,
        draft_store: Arc<dyn DraftStore>,
        event_bus: EventBus,
        autosave_interval: Duration,
    ) -> Self {
        let drafts = DraftReconciler::new(
            template_type.clone(),
            draft_store,
            event_bus.clone(),
            autosave_interval,
        );
        let policy = VariablePolicy::for_type(&template_type);
        let template = EmailTemplate::blank(template_type.clone());
        Self {
            template_type,
            store,
            drafts,
            policy,
            event_bus,
            state: LifecycleState::Idle,
            report: policy.validate(&template.used_variables()),
            template,
            sample_data: SampleData::new(),
            catalog: VariableCatalog::default(),
            history: Vec::new(),
            draft_restored_at: None,
            last_error: None,
        }
    }

    /// Current workflow state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Template as currently edited.
    #[must_use]
    pub const fn template(&self) -> &EmailTemplate {
        &self.template
    }

    /// Current validation report.
    #[must_use]
    pub const fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// Fetched history entries.
    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Read-only view of the slot.
    #[must_use]
    pub fn snapshot(&self) -> LifecycleSnapshot {
        LifecycleSnapshot {
            state: self.state,
            template: self.template.clone(),
            used_variables: self.template.used_variables().into_iter().collect(),
            validation: self.report.clone(),
            unsaved_changes: self.drafts.has_unsaved_changes(),
            draft_restored_at: self.draft_restored_at,
            history: self.history.clone(),
            sample_data: self
                .sample_data
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            available_variables: self.catalog.names().map(str::to_string).collect(),
            last_error: self.last_error.clone(),
        }
    }

    /// Fetches the template, sample data and catalog, reconciles the local
    /// draft, then fetches history.
    ///
    /// A failed history fetch leaves history empty. A failed load keeps
    /// whatever was loaded before.
    ///
    /// # Errors
    ///
    /// Returns the store's [`DeskError`] when the template cannot be fetched.
    pub async fn load(&mut self) -> Result<LifecycleSnapshot, DeskError> {
        let previous = self.state;
        self.state = LifecycleState::Loading;
        tracing::debug!(template_type = %self.template_type, "loading template");

        let loaded = match self.store.load(&self.template_type).await {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(template_type = %self.template_type, error = %e, "template load failed");
                self.state = match previous {
                    LifecycleState::Idle | LifecycleState::Loading => LifecycleState::Error,
                    other => other,
                };
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let reconciled = self.drafts.reconcile_on_load(loaded.template.as_ref()).await;
        self.template = loaded
            .template
            .unwrap_or_else(|| EmailTemplate::blank(self.template_type.clone()));
        self.template.set_fields(reconciled.fields);
        self.sample_data = loaded.sample_data;
        self.catalog = loaded.catalog;
        self.draft_restored_at = reconciled.restored_from;
        self.last_error = None;
        self.revalidate();
        self.state = if reconciled.restored_from.is_some() {
            LifecycleState::Editing
        } else {
            LifecycleState::Loaded
        };

        self.refresh_history().await;

        let _ = self.event_bus.publish(DeskEvent::TemplateLoaded {
            template_type: self.template_type.clone(),
            draft_restored: reconciled.restored_from.is_some(),
            timestamp: Utc::now(),
        });
        tracing::info!(
            template_type = %self.template_type,
            template_id = ?self.template.id,
            draft_restored = reconciled.restored_from.is_some(),
            "template loaded"
        );
        Ok(self.snapshot())
    }

    /// Applies an operator edit and revalidates.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::InvalidState`] when nothing is loaded.
    pub fn edit(&mut self, patch: FieldPatch) -> Result<&ValidationReport, DeskError> {
        self.ensure_loaded()?;
        if patch.is_empty() {
            return Ok(&self.report);
        }
        self.template.apply_patch(patch);
        self.revalidate();
        self.drafts.mark_dirty(&self.template.fields());
        self.state = LifecycleState::Editing;
        Ok(&self.report)
    }

    /// Renders subject and body with the sample data.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::InvalidState`] when nothing is loaded.
    pub fn preview(&self) -> Result<TemplatePreview, DeskError> {
        self.ensure_loaded()?;
        let subject = render(&self.template.subject, &self.sample_data);
        let body = render(&self.template.body, &self.sample_data);
        let unresolved = detect_unresolved(&format!("{subject}\n{body}"));
        Ok(TemplatePreview {
            subject,
            body,
            unresolved,
            validation: self.report.clone(),
        })
    }

    /// Validates and saves the current fields.
    ///
    /// On success the server copy replaces the editor fields, the draft
    /// is cleared and history refreshed. On failure the editor state and
    /// the draft are kept.
    ///
    /// # Errors
    ///
    /// Returns a [`DeskError::Validation`] without any network call when
    /// a field is blank or a required variable is missing, and the store's
    /// error when the save fails.
    pub async fn save(&mut self, overrides: SaveOverrides) -> Result<EmailTemplate, DeskError> {
        self.ensure_loaded()?;
        let mut candidate = self.template.clone();
        if let Some(name) = overrides.name {
            candidate.name = name;
        }
        if let Some(active) = overrides.active {
            candidate.active = active;
        }
        if overrides.force_new {
            candidate.id = None;
        }

        self.revalidate();
        if let Err(e) = self.check_saveable(&candidate) {
            self.last_error = Some(e.to_string());
            return Err(e.into());
        }

        let previous = self.state;
        self.state = LifecycleState::Saving;
        match self.store.save(&SaveTemplateRequest::from(&candidate)).await {
            Ok(saved) => {
                self.template = saved;
                self.drafts.mark_clean(self.template.fields());
                self.drafts.clear_draft().await;
                self.draft_restored_at = None;
                self.last_error = None;
                self.state = LifecycleState::Loaded;
                self.revalidate();
                self.refresh_history().await;

                let _ = self.event_bus.publish(DeskEvent::TemplateSaved {
                    template_type: self.template_type.clone(),
                    template_id: self.template.id,
                    duplicated: overrides.force_new,
                    timestamp: Utc::now(),
                });
                tracing::info!(
                    template_type = %self.template_type,
                    template_id = ?self.template.id,
                    duplicated = overrides.force_new,
                    "template saved"
                );
                Ok(self.template.clone())
            }
            Err(e) => {
                tracing::warn!(template_type = %self.template_type, error = %e, "template save failed");
                self.state = previous;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Saves the current fields as a new row named `<name> - copie`.
    ///
    /// # Errors
    ///
    /// Same as [`TemplateLifecycle::save`].
    pub async fn duplicate(&mut self) -> Result<EmailTemplate, DeskError> {
        let name = format!("{}{DUPLICATE_SUFFIX}", self.template.name);
        self.save(SaveOverrides {
            force_new: true,
            name: Some(name),
            active: None,
        })
        .await
    }

    /// Soft-deletes the loaded template by saving it with `active: false`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ConfirmationRequired`] without
    /// confirmation, [`ValidationError::NotPersisted`] when the template
    /// has no id, otherwise the same errors as [`TemplateLifecycle::save`].
    pub async fn deactivate(&mut self, confirmed: bool) -> Result<EmailTemplate, DeskError> {
        self.ensure_loaded()?;
        if !confirmed {
            return Err(ValidationError::ConfirmationRequired.into());
        }
        let Some(template_id) = self.template.id else {
            return Err(ValidationError::NotPersisted.into());
        };
        let saved = self
            .save(SaveOverrides {
                active: Some(false),
                ..SaveOverrides::default()
            })
            .await?;
        let _ = self.event_bus.publish(DeskEvent::TemplateDeactivated {
            template_type: self.template_type.clone(),
            template_id: Some(template_id),
            timestamp: Utc::now(),
        });
        Ok(saved)
    }

    /// Copies a fetched history entry into the editor. The loaded id is
    /// kept, so a later save overwrites the current row.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::NotFound`] when `entry_id` is not in the
    /// fetched history.
    pub fn load_from_history(&mut self, entry_id: TemplateId) -> Result<&EmailTemplate, DeskError> {
        self.ensure_loaded()?;
        let fields = self
            .history
            .iter()
            .find(|entry| entry.id == entry_id)
            .map(|entry| entry.template.fields())
            .ok_or_else(|| DeskError::NotFound(format!("history entry {entry_id}")))?;
        self.template.set_fields(fields);
        self.revalidate();
        self.drafts.mark_dirty(&self.template.fields());
        self.state = LifecycleState::Editing;
        tracing::debug!(template_type = %self.template_type, %entry_id, "history entry restored");
        Ok(&self.template)
    }

    /// Sends the current fields to `recipient`, or to the supplier/company
    /// address of the sample data when none is entered.
    ///
    /// # Errors
    ///
    /// Returns a [`DeskError::Validation`] without any network call when
    /// the template is invalid or no valid recipient is available, and the
    /// store's error when the send fails.
    pub async fn send_test(&mut self, recipient: Option<&str>) -> Result<RenderedPreview, DeskError> {
        self.ensure_loaded()?;
        self.revalidate();
        let recipient = match self.check_saveable(&self.template).and_then(|()| {
            resolve_recipient(
                recipient,
                RECIPIENT_FALLBACK_KEYS
                    .iter()
                    .map(|key| self.sample_data.get(key)),
            )
        }) {
            Ok(recipient) => recipient,
            Err(e) => {
                self.last_error = Some(e.to_string());
                return Err(e.into());
            }
        };

        let request = TestSendRequest {
            template_id: self.template.id.map(TemplateId::get),
            template_type: self.template_type.to_string(),
            subject_template: self.template.subject.clone(),
            body_template: self.template.body.clone(),
            recipient_email: recipient.clone(),
        };
        match self.store.send_test(&request).await {
            Ok(preview) => {
                tracing::info!(template_type = %self.template_type, %recipient, "test email sent");
                self.last_error = None;
                Ok(preview)
            }
            Err(e) => {
                tracing::warn!(template_type = %self.template_type, error = %e, "test email failed");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Closes the editor: persists or clears the draft, stops the autosave
    /// and returns the slot to `Idle`.
    pub async fn close(&mut self) {
        self.drafts.on_close().await;
        self.template = EmailTemplate::blank(self.template_type.clone());
        self.history.clear();
        self.sample_data = SampleData::new();
        self.catalog = VariableCatalog::default();
        self.draft_restored_at = None;
        self.last_error = None;
        self.revalidate();
        self.state = LifecycleState::Idle;
        tracing::debug!(template_type = %self.template_type, "template editor closed");
    }

    fn ensure_loaded(&self) -> Result<(), DeskError> {
        match self.state {
            LifecycleState::Loaded | LifecycleState::Editing => Ok(()),
            other => Err(DeskError::InvalidState(format!(
                "template {} is not editable in state {other:?}",
                self.template_type
            ))),
        }
    }

    fn check_saveable(&self, candidate: &EmailTemplate) -> Result<(), ValidationError> {
        check_required_fields(&candidate.fields())?;
        self.policy.validate(&candidate.used_variables()).ensure_ok()
    }

    fn revalidate(&mut self) {
        self.report = self.policy.validate(&self.template.used_variables());
    }

    async fn refresh_history(&mut self) {
        let current = self.template.id;
        self.history = match self.store.history(&self.template_type).await {
            Ok(entries) => entries
                .into_iter()
                .filter(|entry| Some(entry.id) != current)
                .collect(),
            Err(e) => {
                tracing::warn!(template_type = %self.template_type, error = %e, "history fetch failed");
                Vec::new()
            }
        };
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use super::*;
    use crate::remote::LoadedTemplate;
    use crate::service::draft_reconciler::tests::CountingDraftStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    /// In-process template store recording every call.
    #[derive(Debug)]
    pub(crate) struct FakeTemplateStore {
        pub(crate) current: Mutex<Option<EmailTemplate>>,
        pub(crate) history: Mutex<Vec<HistoryEntry>>,
        pub(crate) sample: SampleData,
        pub(crate) saves: Mutex<Vec<SaveTemplateRequest>>,
        pub(crate) tests_sent: Mutex<Vec<TestSendRequest>>,
        pub(crate) calls: AtomicUsize,
        pub(crate) fail_saves: AtomicBool,
        pub(crate) fail_history: AtomicBool,
        next_id: AtomicI64,
    }

    impl FakeTemplateStore {
        pub(crate) fn new(current: Option<EmailTemplate>) -> Self {
            let mut sample = SampleData::new();
            sample.insert("SUPPLIER_NAME", "Acme");
            sample.insert("ORDER_NUMBER", "PO-1");
            sample.insert("SUPPLIER_EMAIL", "orders@acme.ro");
            Self {
                current: Mutex::new(current),
                history: Mutex::new(Vec::new()),
                sample,
                saves: Mutex::new(Vec::new()),
                tests_sent: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                fail_saves: AtomicBool::new(false),
                fail_history: AtomicBool::new(false),
                next_id: AtomicI64::new(100),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn count(&self) {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TemplateStore for FakeTemplateStore {
        async fn load(&self, _template_type: &TemplateType) -> Result<LoadedTemplate, DeskError> {
            self.count();
            Ok(LoadedTemplate {
                template: self.current.lock().await.clone(),
                sample_data: self.sample.clone(),
                catalog: VariableCatalog::default(),
            })
        }

        async fn history(&self, _template_type: &TemplateType) -> Result<Vec<HistoryEntry>, DeskError> {
            self.count();
            if self.fail_history.load(Ordering::SeqCst) {
                return Err(DeskError::Transport("history down".to_string()));
            }
            Ok(self.history.lock().await.clone())
        }

        async fn save(&self, request: &SaveTemplateRequest) -> Result<EmailTemplate, DeskError> {
            self.count();
            self.saves.lock().await.push(request.clone());
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(DeskError::Transport("connection reset".to_string()));
            }
            let id = request
                .template_id
                .unwrap_or_else(|| self.next_id.fetch_add(1, Ordering::SeqCst));
            let mut saved = EmailTemplate::blank(TemplateType::auto_order());
            saved.id = Some(TemplateId::new(id));
            saved.name = request.template_name.clone();
            saved.subject = request.subject_template.clone();
            saved.body = request.body_template.clone();
            saved.active = request.is_active;
            saved.updated_at = Some(Utc::now());
            Ok(saved)
        }

        async fn send_test(&self, request: &TestSendRequest) -> Result<RenderedPreview, DeskError> {
            self.count();
            self.tests_sent.lock().await.push(request.clone());
            Ok(RenderedPreview {
                subject: request.subject_template.clone(),
                body: request.body_template.clone(),
            })
        }
    }

    pub(crate) fn server_template() -> EmailTemplate {
        let mut template = EmailTemplate::blank(TemplateType::auto_order());
        template.id = Some(TemplateId::new(12));
        template.name = "Comanda automata".to_string();
        template.subject = "Comanda {{ORDER_NUMBER}}".to_string();
        template.body = "Salut {{SUPPLIER_NAME}}, comanda {{ORDER_NUMBER}}".to_string();
        template.updated_at = Some(Utc::now() - chrono::Duration::hours(1));
        template
    }

    fn lifecycle(store: Arc<FakeTemplateStore>) -> (TemplateLifecycle, Arc<CountingDraftStore>) {
        let drafts = Arc::new(CountingDraftStore::default());
        let lifecycle = TemplateLifecycle::new(
            TemplateType::auto_order(),
            store,
            Arc::clone(&drafts) as Arc<dyn DraftStore>,
            EventBus::new(64),
            Duration::from_secs(30),
        );
        (lifecycle, drafts)
    }

    fn body_patch(body: &str) -> FieldPatch {
        FieldPatch {
            body: Some(body.to_string()),
            ..FieldPatch::default()
        }
    }

    #[tokio::test]
    async fn load_populates_fields_and_excludes_current_from_history() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        let mut old = server_template();
        old.id = Some(TemplateId::new(3));
        old.body = "Vechi {{SUPPLIER_NAME}} {{ORDER_NUMBER}}".to_string();
        *store.history.lock().await = vec![
            HistoryEntry { id: TemplateId::new(12), template: server_template() },
            HistoryEntry { id: TemplateId::new(3), template: old },
        ];
        let (mut lc, _) = lifecycle(Arc::clone(&store));

        let Ok(snapshot) = lc.load().await else {
            panic!("load should succeed");
        };
        assert_eq!(snapshot.state, LifecycleState::Loaded);
        assert!(!snapshot.unsaved_changes);
        assert!(!snapshot.validation.has_errors);
        let [only] = snapshot.history.as_slice() else {
            panic!("one history entry expected");
        };
        assert_eq!(only.id, TemplateId::new(3));
    }

    #[tokio::test]
    async fn history_failure_is_not_fatal() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        store.fail_history.store(true, Ordering::SeqCst);
        let (mut lc, _) = lifecycle(Arc::clone(&store));

        assert!(lc.load().await.is_ok());
        assert!(lc.history().is_empty());
        assert_eq!(lc.state(), LifecycleState::Loaded);
    }

    #[tokio::test]
    async fn newer_draft_is_restored_on_load() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        let (mut lc, drafts) = lifecycle(Arc::clone(&store));
        let draft = crate::domain::Draft::capture(
            &crate::domain::TemplateFields {
                name: "Comanda automata".to_string(),
                subject: "Comanda {{ORDER_NUMBER}}".to_string(),
                body: "Draft {{SUPPLIER_NAME}}".to_string(),
            },
            Utc::now(),
        );
        let _ = drafts.inner.store(&TemplateType::auto_order(), &draft).await;

        let Ok(snapshot) = lc.load().await else {
            panic!("load should succeed");
        };
        assert_eq!(snapshot.state, LifecycleState::Editing);
        assert!(snapshot.unsaved_changes);
        assert_eq!(snapshot.template.body, "Draft {{SUPPLIER_NAME}}");
        assert_eq!(snapshot.template.id, Some(TemplateId::new(12)));
    }

    #[tokio::test]
    async fn save_missing_required_variable_makes_no_network_call() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        let (mut lc, _) = lifecycle(Arc::clone(&store));
        assert!(lc.load().await.is_ok());
        let calls_after_load = store.calls();

        let _ = lc.edit(FieldPatch {
            subject: Some("Comanda".to_string()),
            body: Some("Salut {{SUPPLIER_NAME}}".to_string()),
            ..FieldPatch::default()
        });
        assert_eq!(lc.report().missing_required, vec!["ORDER_NUMBER".to_string()]);
        assert!(lc.report().has_errors);

        let result = lc.save(SaveOverrides::default()).await;
        assert!(matches!(
            result,
            Err(DeskError::Validation(ValidationError::MissingRequiredVariables(ref names)))
                if names == &vec!["ORDER_NUMBER".to_string()]
        ));
        assert_eq!(store.calls(), calls_after_load);
        assert_eq!(lc.state(), LifecycleState::Editing);
    }

    #[tokio::test]
    async fn blank_body_is_refused_locally() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        let (mut lc, _) = lifecycle(Arc::clone(&store));
        assert!(lc.load().await.is_ok());
        let _ = lc.edit(body_patch("   "));

        let result = lc.save(SaveOverrides::default()).await;
        assert!(matches!(
            result,
            Err(DeskError::Validation(ValidationError::EmptyField("body")))
        ));
        assert!(store.saves.lock().await.is_empty());
    }

    #[tokio::test]
    async fn successful_save_adopts_server_copy_and_clears_draft() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        let (mut lc, drafts) = lifecycle(Arc::clone(&store));
        assert!(lc.load().await.is_ok());
        let _ = lc.edit(body_patch("Buna {{SUPPLIER_NAME}}, comanda {{ORDER_NUMBER}}"));
        lc.drafts.persist_draft_locally(&lc.template.fields()).await;

        let Ok(saved) = lc.save(SaveOverrides::default()).await else {
            panic!("save should succeed");
        };
        assert_eq!(saved.id, Some(TemplateId::new(12)));
        assert!(saved.updated_at.is_some());
        assert_eq!(lc.state(), LifecycleState::Loaded);
        assert!(!lc.snapshot().unsaved_changes);
        assert!(drafts.inner.is_empty().await);
    }

    #[tokio::test]
    async fn failed_save_keeps_editing_and_draft() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        store.fail_saves.store(true, Ordering::SeqCst);
        let (mut lc, drafts) = lifecycle(Arc::clone(&store));
        assert!(lc.load().await.is_ok());
        let _ = lc.edit(body_patch("Noua {{SUPPLIER_NAME}} {{ORDER_NUMBER}}"));
        lc.drafts.persist_draft_locally(&lc.template.fields()).await;

        let result = lc.save(SaveOverrides::default()).await;
        assert!(matches!(result, Err(DeskError::Transport(_))));
        assert_eq!(lc.state(), LifecycleState::Editing);
        assert!(lc.snapshot().unsaved_changes);
        assert!(lc.snapshot().last_error.is_some());
        assert_eq!(drafts.inner.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_sends_null_id_and_suffixed_name() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        let (mut lc, _) = lifecycle(Arc::clone(&store));
        assert!(lc.load().await.is_ok());

        let Ok(copy) = lc.duplicate().await else {
            panic!("duplicate should succeed");
        };
        let saves = store.saves.lock().await;
        let [request] = saves.as_slice() else {
            panic!("one save expected");
        };
        assert!(request.template_id.is_none());
        assert!(request.template_name.ends_with("- copie"));
        assert_eq!(copy.id, Some(TemplateId::new(100)));
    }

    #[tokio::test]
    async fn deactivate_requires_confirmation_and_id() {
        let store = Arc::new(FakeTemplateStore::new(None));
        let (mut lc, _) = lifecycle(Arc::clone(&store));
        assert!(lc.load().await.is_ok());

        assert!(matches!(
            lc.deactivate(false).await,
            Err(DeskError::Validation(ValidationError::ConfirmationRequired))
        ));
        assert!(matches!(
            lc.deactivate(true).await,
            Err(DeskError::Validation(ValidationError::NotPersisted))
        ));
        assert!(store.saves.lock().await.is_empty());
    }

    #[tokio::test]
    async fn deactivate_saves_inactive_copy() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        let (mut lc, _) = lifecycle(Arc::clone(&store));
        assert!(lc.load().await.is_ok());

        let Ok(saved) = lc.deactivate(true).await else {
            panic!("deactivate should succeed");
        };
        assert!(!saved.active);
        let saves = store.saves.lock().await;
        let [request] = saves.as_slice() else {
            panic!("one save expected");
        };
        assert_eq!(request.template_id, Some(12));
        assert!(!request.is_active);
    }

    #[tokio::test]
    async fn restore_from_history_marks_dirty_without_network() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        let mut old = server_template();
        old.id = Some(TemplateId::new(3));
        old.body = "Vechi {{SUPPLIER_NAME}} {{ORDER_NUMBER}}".to_string();
        *store.history.lock().await = vec![HistoryEntry { id: TemplateId::new(3), template: old }];
        let (mut lc, _) = lifecycle(Arc::clone(&store));
        assert!(lc.load().await.is_ok());
        let calls = store.calls();

        let Ok(restored) = lc.load_from_history(TemplateId::new(3)) else {
            panic!("entry should exist");
        };
        assert_eq!(restored.body, "Vechi {{SUPPLIER_NAME}} {{ORDER_NUMBER}}");
        assert_eq!(restored.id, Some(TemplateId::new(12)));
        assert_eq!(lc.state(), LifecycleState::Editing);
        assert!(lc.snapshot().unsaved_changes);
        assert_eq!(store.calls(), calls);

        assert!(matches!(
            lc.load_from_history(TemplateId::new(99)),
            Err(DeskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn preview_renders_sample_data() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        let (mut lc, _) = lifecycle(Arc::clone(&store));
        assert!(lc.load().await.is_ok());
        let _ = lc.edit(body_patch("Salut {{SUPPLIER_NAME}}, comanda {{ORDER_NUMBER}} {{DELIVERY_DATE}}"));

        let Ok(preview) = lc.preview() else {
            panic!("preview expected");
        };
        assert_eq!(preview.subject, "Comanda PO-1");
        assert_eq!(preview.body, "Salut Acme, comanda PO-1 {{DELIVERY_DATE}}");
        assert_eq!(preview.unresolved, vec!["{{DELIVERY_DATE}}".to_string()]);
    }

    #[tokio::test]
    async fn send_test_falls_back_to_sample_supplier_email() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        let (mut lc, _) = lifecycle(Arc::clone(&store));
        assert!(lc.load().await.is_ok());

        assert!(lc.send_test(None).await.is_ok());
        let sent = store.tests_sent.lock().await;
        let [request] = sent.as_slice() else {
            panic!("one test send expected");
        };
        assert_eq!(request.recipient_email, "orders@acme.ro");
    }

    #[tokio::test]
    async fn send_test_rejects_invalid_entry_without_network() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        let (mut lc, _) = lifecycle(Arc::clone(&store));
        assert!(lc.load().await.is_ok());
        let calls = store.calls();

        assert!(matches!(
            lc.send_test(Some("not-an-address")).await,
            Err(DeskError::Validation(ValidationError::InvalidRecipient(_)))
        ));
        assert_eq!(store.calls(), calls);
    }

    #[tokio::test]
    async fn operations_require_a_loaded_template() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        let (mut lc, _) = lifecycle(Arc::clone(&store));
        assert!(matches!(lc.edit(body_patch("x")), Err(DeskError::InvalidState(_))));
        assert!(matches!(
            lc.save(SaveOverrides::default()).await,
            Err(DeskError::InvalidState(_))
        ));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn close_returns_to_idle_and_persists_dirty_draft() {
        let store = Arc::new(FakeTemplateStore::new(Some(server_template())));
        let (mut lc, drafts) = lifecycle(Arc::clone(&store));
        assert!(lc.load().await.is_ok());
        let _ = lc.edit(body_patch("Nesalvat {{SUPPLIER_NAME}} {{ORDER_NUMBER}}"));

        lc.close().await;
        assert_eq!(lc.state(), LifecycleState::Idle);
        assert_eq!(drafts.writes(), 1);
    }
}
