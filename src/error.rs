//! Error types for the gate, the content provider, and the HTTP layer.

use std::time::Duration;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::models::ErrorBody;

/// Errors raised by the admission gate.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Invalid gate parameters. Fatal at startup.
    #[error("invalid gate configuration: {0}")]
    Configuration(String),

    /// Invalid per-call argument (zero limit, empty key).
    #[error("invalid gate argument: {0}")]
    InvalidArgument(String),

    /// The key has used up its admissions for the current window.
    #[error("rate limit of {limit} exceeded for client key {key}")]
    RateLimitExceeded {
        key: String,
        limit: u32,
        retry_after: Duration,
    },
}

/// Failures talking to the language-model provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no provider API key configured or supplied")]
    MissingApiKey,

    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider response could not be decoded: {0}")]
    Decode(String),

    #[error("provider returned no completion text")]
    EmptyCompletion,
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("too many requests")]
    TooManyRequests { limit: u32, retry_after: Duration },

    #[error(transparent)]
    Downstream(#[from] ProviderError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::RateLimitExceeded {
                limit, retry_after, ..
            } => ApiError::TooManyRequests { limit, retry_after },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

// Round up so clients never retry a fraction of a second early
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 { secs + 1 } else { secs }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody::new(msg))).into_response()
            }
            ApiError::TooManyRequests { limit, retry_after } => {
                let secs = retry_after_secs(retry_after);
                let body = ErrorBody {
                    error: "Too many requests".to_string(),
                    limit: Some(limit),
                    retry_after_secs: Some(secs),
                };
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                response
            }
            ApiError::Downstream(err) => {
                tracing::error!(error = %err, "content provider failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new("Failed to generate blog post")),
                )
                    .into_response()
            }
            ApiError::Internal(msg) => {
                tracing::error!(%msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new("Internal server error")),
                )
                    .into_response()
            }
        }
    }
}
