//! Product and seller lookup client.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use utoipa::ToSchema;

use super::wire::read_envelope;
use crate::error::{DeskError, ValidationError};

/// Entity searched by a lookup field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    /// Products.
    Products,
    /// Sellers (suppliers).
    Sellers,
}

impl SearchKind {
    /// Wire name used in the `entity` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Sellers => "sellers",
        }
    }

    /// Parses `products` or `sellers`.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::NotFound`] for any other kind.
    pub fn parse(raw: &str) -> Result<Self, DeskError> {
        match raw {
            "products" => Ok(Self::Products),
            "sellers" => Ok(Self::Sellers),
            other => Err(DeskError::NotFound(format!("search kind {other}"))),
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lookup match.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SearchHit {
    /// Entity id as text.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Remaining fields of the row.
    #[schema(value_type = Object)]
    pub attributes: Map<String, Value>,
}

const LABEL_KEYS: &[&str] = &["label", "name", "nume", "denumire"];

impl SearchHit {
    /// Builds a hit from a result row; rows without an id are skipped.
    #[must_use]
    pub fn from_row(row: &Value) -> Option<Self> {
        let mut attributes = row.as_object()?.clone();
        let id = match attributes.remove("id")? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let label = LABEL_KEYS
            .iter()
            .find_map(|key| attributes.get(*key).and_then(Value::as_str))
            .unwrap_or(id.as_str())
            .to_string();
        Some(Self {
            id,
            label,
            attributes,
        })
    }
}

/// Remote lookup service.
#[async_trait]
pub trait SearchBackend: Send + Sync + fmt::Debug {
    /// Returns matches for `query`, which is already trimmed and long enough.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Transport`] or [`DeskError::Rejected`].
    async fn search(&self, kind: SearchKind, query: &str) -> Result<Vec<SearchHit>, DeskError>;
}

/// [`SearchBackend`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSearchBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchBackend {
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
impl SearchBackend for HttpSearchBackend {
    async fn search(&self, kind: SearchKind, query: &str) -> Result<Vec<SearchHit>, DeskError> {
        if query.is_empty() {
            return Err(ValidationError::EmptyField("search query").into());
        }
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("action", "search"), ("entity", kind.as_str()), ("q", query)])
            .send()
            .await?;
        let body = read_envelope(response).await?;
        let rows = ["results", "data"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_array))
            .ok_or_else(|| DeskError::Transport("search payload has no results".to_string()))?;
        Ok(rows.iter().filter_map(SearchHit::from_row).collect())
    }
}
