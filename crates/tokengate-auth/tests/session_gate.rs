use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    middleware,
    routing::get,
};
use serde_json::{Value, json};
use tokengate_auth::{
    AuthConfig, Authenticated, CustomClaims, InMemoryRevocationStore, InMemoryUserDirectory,
    OptionalAuthenticated, SessionGate, TokenService, TokenTransport, UserIdentity,
    require_session,
};
use tower::ServiceExt;

fn gate_with(config: AuthConfig) -> SessionGate {
    let store = Arc::new(InMemoryRevocationStore::new());
    let service = TokenService::from_config(config, store).expect("valid config");

    let mut alice = UserIdentity::new("u1", "alice");
    alice.roles = vec!["admin".to_string()];
    let users: InMemoryUserDirectory = [alice].into_iter().collect();

    SessionGate::new(Arc::new(service)).with_user_directory(Arc::new(users))
}

fn config() -> AuthConfig {
    let mut config = AuthConfig::default();
    config.signing.secret = Some("gate-test-secret-gate-test-secret!".to_string());
    config
}

fn custom(uid: &str) -> CustomClaims {
    let mut custom = CustomClaims::new();
    custom.insert("uid".to_string(), json!(uid));
    custom
}

async fn whoami(Authenticated(identity): Authenticated) -> Json<Value> {
    Json(json!({
        "jti": identity.jti(),
        "user": identity.user.as_ref().map(|u| u.username.clone()),
    }))
}

async fn maybe(OptionalAuthenticated(identity): OptionalAuthenticated) -> String {
    match identity {
        Some(identity) => format!("hello {}", identity.jti()),
        None => "hello anonymous".to_string(),
    }
}

fn app(gate: SessionGate) -> Router {
    let protected = Router::new()
        .route("/protected", get(whoami).options(|| async { "preflight" }))
        .route_layer(middleware::from_fn_with_state(gate.clone(), require_session));

    Router::new()
        .route("/me", get(whoami))
        .route("/maybe", get(maybe))
        .merge(protected)
        .with_state(gate)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn valid_token_binds_user() {
    let gate = gate_with(config());
    let token = gate.service().issue(custom("u1")).await.unwrap();

    let response = app(gate).oneshot(bearer("/me", token.as_str())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["jti"], token.jti());
    assert_eq!(body["user"], "alice");
}

#[tokio::test]
async fn unknown_principal_stays_unbound() {
    let gate = gate_with(config());
    let token = gate.service().issue(custom("ghost")).await.unwrap();

    let response = app(gate).oneshot(bearer("/me", token.as_str())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user"], Value::Null);
}

#[tokio::test]
async fn binding_disabled_skips_lookup() {
    let mut config = config();
    config.user_binding.enabled = false;
    let gate = gate_with(config);
    let token = gate.service().issue(custom("u1")).await.unwrap();

    let response = app(gate).oneshot(bearer("/me", token.as_str())).await.unwrap();
    assert_eq!(body_json(response).await["user"], Value::Null);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let gate = gate_with(config());

    let request = Request::builder().uri("/me").body(Body::empty()).unwrap();
    let response = app(gate).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    assert_eq!(body_json(response).await["reason"], "missing_credential");
}

#[tokio::test]
async fn malformed_token_is_bad_request() {
    let gate = gate_with(config());

    let response = app(gate).oneshot(bearer("/me", "not-a-token")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["reason"], "parse_failure");
}

#[tokio::test]
async fn revoked_token_is_rejected() {
    let gate = gate_with(config());
    let token = gate.service().issue(custom("u1")).await.unwrap();
    gate.service().logout(&token).await.unwrap();

    let response = app(gate).oneshot(bearer("/me", token.as_str())).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["reason"], "revoked");
}

#[tokio::test]
async fn require_session_passes_preflight() {
    let gate = gate_with(config());

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/protected")
        .body(Body::empty())
        .unwrap();
    let response = app(gate).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn require_session_rejects_and_admits() {
    let gate = gate_with(config());
    let token = gate.service().issue(custom("u1")).await.unwrap();

    let request = Request::builder()
        .uri("/protected")
        .body(Body::empty())
        .unwrap();
    let response = app(gate.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app(gate)
        .oneshot(bearer("/protected", token.as_str()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user"], "alice");
}

#[tokio::test]
async fn optional_extractor() {
    let gate = gate_with(config());
    let token = gate.service().issue(custom("u1")).await.unwrap();

    let request = Request::builder().uri("/maybe").body(Body::empty()).unwrap();
    let response = app(gate.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"hello anonymous");

    let response = app(gate.clone())
        .oneshot(bearer("/maybe", token.as_str()))
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), format!("hello {}", token.jti()));

    // a present but invalid token is still rejected
    let response = app(gate).oneshot(bearer("/maybe", "a.b.c")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cookie_transport() {
    let mut config = config();
    config.transport.kind = TokenTransport::Cookie;
    config.transport.name = "session".to_string();
    let gate = gate_with(config);
    let token = gate.service().issue(custom("u1")).await.unwrap();

    let request = Request::builder()
        .uri("/me")
        .header(header::COOKIE, format!("theme=dark; session={}", token.as_str()))
        .body(Body::empty())
        .unwrap();
    let response = app(gate.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // the bearer header is not consulted for cookie transport
    let response = app(gate).oneshot(bearer("/me", token.as_str())).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authenticate_directly_from_source() {
    let gate = gate_with(config());
    let token = gate.service().issue(custom("u1")).await.unwrap();

    let request = bearer("/", token.as_str());
    let source = tokengate_auth::RequestTokenSource::new(request.headers(), request.uri());
    let identity = gate.authenticate(&source).await.unwrap();

    assert_eq!(identity.jti(), token.jti());
    assert!(identity.is_user_bound());
    assert!(identity.user.unwrap().has_role("admin"));
}
