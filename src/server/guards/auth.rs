use crate::server::router::PodbayState;
use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderName, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use serde_json::json;
use subtle::ConstantTimeEq;

/// Header carrying the authenticated principal, set by the product
/// gateway after session resolution.
const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");

/// Authenticated caller identity. Extraction validates the gateway's
/// service key (constant-time) and requires a principal header.
#[derive(Debug, Clone)]
pub struct Caller(pub String);

impl FromRequestParts<PodbayState> for Caller {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &PodbayState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .map(|auth| auth.token().to_string())
            .ok_or(AuthError::MissingKey)?;

        let expected = state.service_key.as_ref();
        if !bool::from(token.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(AuthError::InvalidKey);
        }

        let user_id = parts
            .headers
            .get(X_USER_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingUser)?;

        Ok(Caller(user_id.to_string()))
    }
}

pub enum AuthError {
    MissingKey,
    InvalidKey,
    MissingUser,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, reason) = match self {
            AuthError::MissingKey => (StatusCode::UNAUTHORIZED, "Missing service key"),
            AuthError::InvalidKey => (StatusCode::UNAUTHORIZED, "Invalid service key"),
            AuthError::MissingUser => (StatusCode::UNAUTHORIZED, "Missing caller identity"),
        };
        (
            status,
            Json(json!({ "error": "unauthorized", "reason": reason })),
        )
            .into_response()
    }
}
