//! Error taxonomy for the suggestion pipeline and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::suggest::types::ConceptCategory;

/// Failure of one suggestion source's contribution. Never fatal to a request.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_name} returned HTTP 204")]
    NoContent { source_name: String },

    #[error("{source_name} returned HTTP 400")]
    BadRequest { source_name: String },

    #[error("{source_name} returned HTTP {status}")]
    Status { source_name: String, status: u16 },

    #[error("calling {source_name} failed: {error}")]
    Transport {
        source_name: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("decoding {source_name} response failed: {error}")]
    Decode {
        source_name: String,
        #[source]
        error: serde_json::Error,
    },

    #[error("No source defined for {0}")]
    MissingFlag(ConceptCategory),
}

impl SourceError {
    /// 204 and 400 are expected provider answers and only warrant a warning.
    pub fn is_tolerable_condition(&self) -> bool {
        matches!(
            self,
            SourceError::NoContent { .. } | SourceError::BadRequest { .. }
        )
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::NoContent { .. } => "no_content",
            SourceError::BadRequest { .. } => "bad_request",
            SourceError::Status { .. } => "status",
            SourceError::Transport { .. } => "transport",
            SourceError::Decode { .. } => "decode",
            SourceError::MissingFlag(_) => "missing_flag",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConcordanceError {
    #[error("calling internal concordances failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("non 200 status code returned: {0}")]
    Status(u16),

    #[error("decoding concordance response failed: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum BlacklistError {
    #[error("calling concept-suggestions-blacklister failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("concept-suggestions-blacklister returned HTTP {0}")]
    Status(u16),

    #[error("decoding blacklist failed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Request-level failure: the caller gets no suggestions at all.
#[derive(Debug, Error)]
pub enum SuggestError {
    #[error(transparent)]
    Concordance(#[from] ConcordanceError),
}

/// Errors surfaced by the inbound HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Payload should not be empty")]
    EmptyPayload,

    #[error("Invalid value '{value}' for {param}")]
    InvalidFlag { param: &'static str, value: String },

    #[error("Requesting suggestions failed")]
    Suggest(#[from] SuggestError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::EmptyPayload | ApiError::InvalidFlag { .. } => StatusCode::BAD_REQUEST,
            ApiError::Suggest(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
