use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error as ThisError;

use crate::vault::VaultError;

/// Workflow-boundary error for the create/drop operations.
///
/// Every failure inside a workflow is mapped to exactly one of these
/// before it reaches the transport layer; internal causes are logged and
/// masked, upstream envelopes are forwarded verbatim.
#[derive(Debug, ThisError)]
pub enum OrchestrationError {
    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidConfiguration(String),

    /// Structured error from the pool manager; status, message, service
    /// and details are surfaced to the caller unchanged.
    #[error("Upstream error with status {status}: {message}")]
    Upstream {
        status: StatusCode,
        message: String,
        service: Option<String>,
        details: Option<Value>,
    },

    /// An external call timed out; retryable by the caller.
    #[error("{0}")]
    Unavailable(String),

    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Actor rpc failed: {0}")]
    Rpc(String),

    #[error("{0}")]
    Internal(String),
}

/// Standardized error response payload.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorBody {
    fn message(error: impl Into<String>) -> Self {
        ErrorBody {
            error: error.into(),
            service: None,
            details: None,
        }
    }
}

impl IntoResponse for OrchestrationError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            OrchestrationError::Forbidden => {
                (StatusCode::FORBIDDEN, ErrorBody::message("Forbidden"))
            }

            OrchestrationError::NotFound(message) => {
                (StatusCode::NOT_FOUND, ErrorBody::message(message))
            }

            OrchestrationError::InvalidConfiguration(message) => {
                (StatusCode::BAD_REQUEST, ErrorBody::message(message))
            }

            OrchestrationError::Upstream {
                status,
                message,
                service,
                details,
            } => {
                tracing::warn!(
                    status = %status,
                    service = service.as_deref().unwrap_or("-"),
                    message = %message,
                    "forwarding upstream error"
                );
                (
                    status,
                    ErrorBody {
                        error: message,
                        service,
                        details,
                    },
                )
            }

            OrchestrationError::Unavailable(message) => {
                tracing::warn!(message = %message, "external dependency unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, ErrorBody::message(message))
            }

            // Deliberate internal message, e.g. "Failed to drop pod".
            OrchestrationError::Internal(message) => {
                tracing::error!(message = %message, "workflow failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::message(message))
            }

            err @ (OrchestrationError::Vault(_)
            | OrchestrationError::Database(_)
            | OrchestrationError::Json(_)
            | OrchestrationError::Rpc(_)) => {
                tracing::error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::message("An internal server error occurred."),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
