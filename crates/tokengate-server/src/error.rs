use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tokengate_auth::AuthError;

/// Errors returned by the HTTP handlers.
///
/// Token errors are rendered by the auth crate's own response mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "invalid_grant",
                    "reason": "invalid_credentials",
                    "message": self.to_string(),
                })),
            )
                .into_response(),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid_request",
                    "reason": "bad_request",
                    "message": message,
                })),
            )
                .into_response(),
            ApiError::Auth(err) => err.into_response(),
        }
    }
}
