//! Error responses for rejected requests.
//!
//! Body: `{"error", "reason", "code"?, "message"}`. 401 responses also carry
//! `WWW-Authenticate: Bearer realm="tokengate", ...`.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error) = error_details(&self);

        let message = if self.is_server_error() {
            tracing::error!(error = %self, category = %self.category(), "Authentication failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut body = json!({
            "error": error,
            "reason": self.reason_code(),
            "message": message,
        });
        if let Some(code) = self.expiry_code() {
            body["code"] = json!(code);
        }

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(&self, error, &message);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(body)).into_response()
    }
}

/// Returns (HTTP status, error code).
fn error_details(error: &AuthError) -> (StatusCode, &'static str) {
    match error {
        AuthError::ParseFailure { .. } | AuthError::RefreshNotAllowed { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_request")
        }
        AuthError::MissingCredential { .. } => (StatusCode::UNAUTHORIZED, "unauthorized"),
        AuthError::SignatureMismatch
        | AuthError::UnsignedToken
        | AuthError::NotYetValid
        | AuthError::MalformedIdentity { .. }
        | AuthError::Revoked
        | AuthError::ExpiredRefreshable { .. }
        | AuthError::ExpiredTerminal { .. } => (StatusCode::UNAUTHORIZED, "invalid_token"),
        AuthError::Storage { .. } | AuthError::Configuration { .. } | AuthError::Internal { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "server_error")
        }
    }
}

/// A request without credentials gets the bare challenge.
fn build_www_authenticate_header(error: &AuthError, code: &str, description: &str) -> String {
    if matches!(error, AuthError::MissingCredential { .. }) {
        return "Bearer realm=\"tokengate\"".to_string();
    }
    let escaped_desc = description.replace('"', "\\\"");
    format!(
        "Bearer realm=\"tokengate\", error=\"{}\", error_description=\"{}\"",
        code, escaped_desc
    )
}
