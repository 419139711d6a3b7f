//! Desk error types with HTTP status code mapping.
//!
//! [`DeskError`] is the central error type for the crate. Local validation
//! failures are grouped under [`ValidationError`] so that callers can tell
//! "refused before any network call" apart from transport problems. Each
//! variant maps to a numeric code, an HTTP status and a JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "missing required variables: ORDER_NUMBER",
///     "details": ["ORDER_NUMBER"]
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`DeskError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional machine-readable details.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

/// Local validation failures. Raised before any I/O and never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The composed text lacks variables the operator depends on.
    #[error("missing required variables: {}", .0.join(", "))]
    MissingRequiredVariables(Vec<String>),

    /// A mandatory template field is blank.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// No operator-entered or sample-data address is available.
    #[error("no recipient address available for the test email")]
    MissingRecipient,

    /// The chosen recipient is not a `local@domain.tld` address.
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),

    /// The template type is not a lowercase identifier.
    #[error("invalid template type: {0:?}")]
    InvalidTemplateType(String),

    /// Product identifiers are strictly positive.
    #[error("invalid product id: {0}")]
    InvalidProductId(i64),

    /// The operation needs a template that already exists on the server.
    #[error("template has not been saved yet")]
    NotPersisted,

    /// Destructive operations need an explicit confirmation flag.
    #[error("operation requires explicit confirmation")]
    ConfirmationRequired,
}

/// Crate-wide error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category             | HTTP Status               |
/// |-----------|----------------------|---------------------------|
/// | 1000–1999 | Validation           | 400 Bad Request           |
/// | 2000–2999 | State / Not Found    | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server / Upstream    | 500 / 502 Bad Gateway     |
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    /// Local validation refused the operation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Network failure, non-2xx status or malformed payload.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote service answered but declined the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// A completion arrived for a request that has since been superseded.
    #[error("stale response discarded")]
    Stale,

    /// The referenced item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation is not allowed in the current workflow state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Local draft store failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DeskError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(inner) => match inner {
                ValidationError::MissingRequiredVariables(_) => 1001,
                ValidationError::EmptyField(_) => 1002,
                ValidationError::MissingRecipient => 1003,
                ValidationError::InvalidRecipient(_) => 1004,
                ValidationError::InvalidTemplateType(_) => 1005,
                ValidationError::InvalidProductId(_) => 1006,
                ValidationError::NotPersisted => 1007,
                ValidationError::ConfirmationRequired => 1008,
            },
            Self::NotFound(_) => 2001,
            Self::InvalidState(_) => 2002,
            Self::Stale => 2003,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::Transport(_) => 3002,
            Self::Rejected(_) => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidState(_) | Self::Stale => StatusCode::CONFLICT,
            Self::Transport(_) | Self::Rejected(_) => StatusCode::BAD_GATEWAY,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for errors raised locally before any network call.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation(ValidationError::MissingRequiredVariables(names)) => {
                Some(serde_json::json!(names))
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DeskError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<sqlx::Error> for DeskError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for DeskError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
