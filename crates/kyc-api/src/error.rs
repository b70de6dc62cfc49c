//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps pipeline, validation, and store errors to HTTP status codes with a
//! JSON body carrying a machine-readable code and message. Internal and
//! upstream failure details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::auth::UnauthenticatedReason;
use crate::pipeline::KycError;
use crate::store::StoreError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "CONFLICT").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// `{"reason": ...}` on 401 responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// A required field was missing or malformed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body is not valid JSON (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No session and no usable phone fallback (401).
    #[error("unauthorized: {message}")]
    Unauthorized {
        message: String,
        reason: &'static str,
    },

    /// A prerequisite step or document is missing (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),

    /// The verification provider failed (502).
    #[error("upstream provider error: {0}")]
    UpstreamError(String),

    /// Service dependency not configured (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::UpstreamError(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        }
    }

    pub fn unauthorized(reason: UnauthenticatedReason) -> Self {
        Self::Unauthorized {
            message: reason.message().to_string(),
            reason: reason.as_str(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal/upstream error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::UpstreamError(_) => {
                "The verification provider did not return a usable response; retry later".to_string()
            }
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::ServiceUnavailable(msg) => msg.clone(),
            Self::Unauthorized { message, .. } => message.clone(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::UpstreamError(_) => tracing::error!(error = %self, "upstream provider error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let details = match &self {
            Self::Unauthorized { reason, .. } => Some(serde_json::json!({ "reason": reason })),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<KycError> for AppError {
    fn from(err: KycError) -> Self {
        match err {
            KycError::Unauthenticated(reason) => Self::unauthorized(reason),
            KycError::NotFound(id) => Self::NotFound(format!("driver {id} not found")),
            KycError::Prerequisite(unmet) => Self::Conflict(unmet.to_string()),
            KycError::Conflict(msg) => Self::Conflict(msg),
            KycError::Unprocessable(v) => Self::from(v),
            KycError::Provider(e) => Self::UpstreamError(e.to_string()),
            KycError::ProviderUnavailable => {
                Self::ServiceUnavailable("verification provider is not configured".to_string())
            }
            KycError::Internal(e) => Self::from(e),
        }
    }
}

impl From<kyc_core::ValidationError> for AppError {
    fn from(err: kyc_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}
