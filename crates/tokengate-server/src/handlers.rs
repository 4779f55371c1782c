use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokengate_auth::{
    Authenticated, CustomClaims, RequestTokenSource, SessionGate, Token, TokenService,
};

use crate::credentials::CredentialStore;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub gate: SessionGate,
    pub credentials: CredentialStore,
}

impl AppState {
    pub fn new(service: Arc<TokenService>, credentials: CredentialStore) -> Self {
        let gate = SessionGate::new(service).with_user_directory(Arc::new(credentials.directory()));
        Self { gate, credentials }
    }

    fn service(&self) -> &Arc<TokenService> {
        self.gate.service()
    }
}

impl FromRef<AppState> for SessionGate {
    fn from_ref(state: &AppState) -> Self {
        state.gate.clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    /// Unix timestamp after which the token must be refreshed
    pub expires_at: i64,
    /// Unix timestamp after which refresh is no longer possible
    pub refresh_until: i64,
}

impl TokenResponse {
    fn new(service: &TokenService, token: &Token) -> Self {
        let claims = token.claims();
        Self {
            token: token.as_str().to_string(),
            token_type: "Bearer".to_string(),
            expires_at: claims.exp,
            refresh_until: service.refresh_policy().refresh_deadline(claims),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    let Some(user) = state.credentials.verify(&req.username, &req.password).await else {
        tracing::info!(username = %req.username, "Login rejected");
        return Err(ApiError::InvalidCredentials);
    };

    let service = state.service();
    let mut custom = CustomClaims::new();
    custom.insert(
        service.config().user_binding.claim.clone(),
        Value::String(user.id.clone()),
    );
    custom.insert("username".to_string(), json!(user.username));
    custom.insert("roles".to_string(), json!(user.roles));

    let token = service.issue(custom).await?;
    tracing::info!(user_id = %user.id, jti = %token.jti(), "Login succeeded");
    Ok(Json(TokenResponse::new(service, &token)))
}

/// Exchanges an expired token that is still inside its refresh window.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = presented_token(&state, &headers, &uri)?;
    let service = state.service();
    let refreshed = service.refresh(&token).await?;
    Ok(Json(TokenResponse::new(service, &refreshed)))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<StatusCode, ApiError> {
    let token = presented_token(&state, &headers, &uri)?;
    state.service().logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(Authenticated(identity): Authenticated) -> Json<Value> {
    Json(json!({
        "jti": identity.jti(),
        "claims": identity.claims.as_ref(),
        "user": identity.user,
    }))
}

fn presented_token(state: &AppState, headers: &HeaderMap, uri: &Uri) -> Result<Token, ApiError> {
    let source = RequestTokenSource::new(headers, uri);
    let raw = state.gate.extract(&source)?;
    Ok(state.service().parse(&raw)?)
}
