//! Simulation and order-creation service client.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use super::wire::{SimulationAck, SimulationActionRequest, decode, read_envelope};
use crate::domain::ProductId;
use crate::error::DeskError;

/// Remote dry-run and order-creation service.
#[async_trait]
pub trait SimulationService: Send + Sync + fmt::Debug {
    /// Runs the dry run; the raw payload is decoded by
    /// [`crate::domain::decode_simulation_payload`].
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Transport`] or [`DeskError::Rejected`].
    async fn simulate(&self, product_id: ProductId) -> Result<Value, DeskError>;

    /// Sends the auto-order email for `product_id` to `recipient` only.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Transport`] or [`DeskError::Rejected`].
    async fn send_test_email(
        &self,
        product_id: ProductId,
        recipient: &str,
    ) -> Result<SimulationAck, DeskError>;

    /// Creates the real purchase order.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Rejected`] with the service message when the
    /// order is refused, [`DeskError::Transport`] otherwise.
    async fn execute_auto_order(&self, product_id: ProductId) -> Result<SimulationAck, DeskError>;
}

/// [`SimulationService`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSimulationService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSimulationService {
    /// Creates a client for the service at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn post_action(&self, request: &SimulationActionRequest) -> Result<SimulationAck, DeskError> {
        let response = self.client.post(&self.base_url).json(request).send().await?;
        decode(read_envelope(response).await?)
    }
}

#[async_trait]
impl SimulationService for HttpSimulationService {
    async fn simulate(&self, product_id: ProductId) -> Result<Value, DeskError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("product_id", product_id.get())])
            .send()
            .await?;
        read_envelope(response).await
    }

    async fn send_test_email(
        &self,
        product_id: ProductId,
        recipient: &str,
    ) -> Result<SimulationAck, DeskError> {
        self.post_action(&SimulationActionRequest {
            action: "send_test_email",
            product_id: product_id.get(),
            test_recipient: Some(recipient.to_string()),
        })
        .await
    }

    async fn execute_auto_order(&self, product_id: ProductId) -> Result<SimulationAck, DeskError> {
        self.post_action(&SimulationActionRequest {
            action: "execute_auto_order",
            product_id: product_id.get(),
            test_recipient: None,
        })
        .await
    }
}
