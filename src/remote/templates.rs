//! Persistence service client: load, history, save and test send.

use async_trait::async_trait;
use std::fmt;

use super::wire::{
    HistoryResponse, LoadResponse, SaveResponse, SaveTemplateRequest, TestSendRequest,
    TestSendResponse, decode, read_envelope,
};
use crate::domain::{
    EmailTemplate, HistoryEntry, RenderedPreview, SampleData, TemplateType, VariableCatalog,
};
use crate::error::DeskError;

/// Result of `action=load`.
#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    /// Canonical template, `None` when the type has never been saved.
    pub template: Option<EmailTemplate>,
    /// Preview values.
    pub sample_data: SampleData,
    /// Known variables.
    pub catalog: VariableCatalog,
}

/// Remote canonical store of email templates.
#[async_trait]
pub trait TemplateStore: Send + Sync + fmt::Debug {
    /// Fetches the current template with its sample data and catalog.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Transport`] or [`DeskError::Rejected`] when the
    /// service cannot be reached or declines.
    async fn load(&self, template_type: &TemplateType) -> Result<LoadedTemplate, DeskError>;

    /// Fetches past and alternate rows of the type.
    ///
    /// # Errors
    ///
    /// Same as [`TemplateStore::load`].
    async fn history(&self, template_type: &TemplateType) -> Result<Vec<HistoryEntry>, DeskError>;

    /// Creates (`template_id: None`) or updates a row; returns the canonical row.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Rejected`] with the service message when the
    /// save is refused, [`DeskError::Transport`] otherwise.
    async fn save(&self, request: &SaveTemplateRequest) -> Result<EmailTemplate, DeskError>;

    /// Sends a rendered test email; returns the server's preview.
    ///
    /// # Errors
    ///
    /// Same as [`TemplateStore::save`].
    async fn send_test(&self, request: &TestSendRequest) -> Result<RenderedPreview, DeskError>;
}

/// [`TemplateStore`] over HTTP, dispatching on the `action` query parameter.
#[derive(Debug, Clone)]
pub struct HttpTemplateStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTemplateStore {
    /// Creates a client for the service at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl TemplateStore for HttpTemplateStore {
    async fn load(&self, template_type: &TemplateType) -> Result<LoadedTemplate, DeskError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("action", "load"), ("type", template_type.as_str())])
            .send()
            .await?;
        let body: LoadResponse = decode(read_envelope(response).await?)?;
        tracing::debug!(%template_type, found = body.template.is_some(), "template loaded");
        Ok(LoadedTemplate {
            template: body.template.map(|record| record.into_template(template_type)),
            sample_data: SampleData::from_json(&body.sample_data),
            catalog: VariableCatalog::from_json(&body.available_variables),
        })
    }

    async fn history(&self, template_type: &TemplateType) -> Result<Vec<HistoryEntry>, DeskError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("action", "history"), ("type", template_type.as_str())])
            .send()
            .await?;
        let body: HistoryResponse = decode(read_envelope(response).await?)?;
        Ok(body
            .history
            .into_iter()
            .filter_map(|record| {
                let template = record.into_template(template_type);
                template.id.map(|id| HistoryEntry { id, template })
            })
            .collect())
    }

    async fn save(&self, request: &SaveTemplateRequest) -> Result<EmailTemplate, DeskError> {
        let response = self
            .client
            .post(&self.base_url)
            .query(&[("action", "save")])
            .json(request)
            .send()
            .await?;
        let body: SaveResponse = decode(read_envelope(response).await?)?;
        let slot_type = TemplateType::parse(&request.template_type)?;
        Ok(body.template.into_template(&slot_type))
    }

    async fn send_test(&self, request: &TestSendRequest) -> Result<RenderedPreview, DeskError> {
        let response = self
            .client
            .post(&self.base_url)
            .query(&[("action", "test")])
            .json(request)
            .send()
            .await?;
        let body: TestSendResponse = decode(read_envelope(response).await?)?;
        Ok(body.preview.into())
    }
}
