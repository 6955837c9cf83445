use axum::http::StatusCode;
use podbay_schema::PoolApiErrorBody;
use thiserror::Error as ThisError;

use crate::error::OrchestrationError;

/// How much of an unstructured upstream body is kept for diagnostics.
pub const UPSTREAM_BODY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, ThisError)]
pub enum PoolControlError {
    /// Structured error envelope from the control plane.
    #[error("pool manager rejected the request: status={status}")]
    Api {
        status: StatusCode,
        body: PoolApiErrorBody,
    },

    /// Non-success response whose body did not parse as an envelope. The
    /// preview is bounded and for internal diagnostics only.
    #[error("pool manager returned {status}: {body:.200}")]
    Fallback { status: StatusCode, body: String },

    /// Transport-level failure (DNS, connect, timeouts, etc).
    #[error("pool manager transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl PoolControlError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PoolControlError::Transport(e) if e.is_timeout())
    }
}

/// Bound an upstream body for logs and fallback messages.
pub(crate) fn preview(body: &str) -> String {
    body.chars().take(UPSTREAM_BODY_PREVIEW_CHARS).collect()
}

impl From<PoolControlError> for OrchestrationError {
    fn from(err: PoolControlError) -> Self {
        match err {
            PoolControlError::Api { status, body } => OrchestrationError::Upstream {
                // The envelope's own status wins when it is a valid code.
                status: body
                    .status
                    .and_then(|s| StatusCode::from_u16(s).ok())
                    .unwrap_or(status),
                message: body
                    .message
                    .unwrap_or_else(|| "Upstream service error.".to_string()),
                service: body.service,
                details: body.details,
            },

            PoolControlError::Fallback { status, body } => OrchestrationError::Upstream {
                status,
                message: if body.trim().is_empty() {
                    format!("Upstream returned {status}")
                } else {
                    body
                },
                service: None,
                details: None,
            },

            PoolControlError::Transport(e) if e.is_timeout() => {
                OrchestrationError::Unavailable("Pool manager timed out".to_string())
            }

            PoolControlError::Transport(e) => {
                OrchestrationError::Internal(format!("pool manager request failed: {e}"))
            }
        }
    }
}
