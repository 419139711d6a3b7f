//! Lookup DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::remote::{SearchHit, SearchKind};
use crate::service::SearchOutcome;

/// Query parameters for `GET /search/{kind}`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SearchParams {
    /// Text typed so far.
    #[serde(default)]
    pub q: String,
    /// Lookup field issuing the search. Defaults to `default`.
    #[serde(default)]
    pub context: Option<String>,
}

/// Response body for `GET /search/{kind}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchResponse {
    /// Searched entity.
    pub kind: SearchKind,
    /// `results`, `cleared` or `superseded`.
    pub status: String,
    /// Matches; empty unless `status` is `results`.
    pub results: Vec<SearchHit>,
}

impl SearchResponse {
    /// Builds the response for one search outcome.
    #[must_use]
    pub fn new(kind: SearchKind, outcome: SearchOutcome) -> Self {
        let (status, results) = match outcome {
            SearchOutcome::Results(hits) => ("results", hits),
            SearchOutcome::Cleared => ("cleared", Vec::new()),
            SearchOutcome::Superseded => ("superseded", Vec::new()),
        };
        Self {
            kind,
            status: status.to_string(),
            results,
        }
    }
}
