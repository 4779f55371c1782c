use std::sync::{Arc, OnceLock};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use time::OffsetDateTime;
use tokengate_auth::{AuthConfig, CustomClaims, InMemoryRevocationStore, TokenService};
use tokengate_server::{
    AppState, CredentialStore, TokenResponse, build_app, config::UserRecord, hash_password,
};
use tower::ServiceExt;

fn alice_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password("wonderland").expect("hash"))
}

struct TestApp {
    app: Router,
    service: Arc<TokenService>,
}

fn test_app() -> TestApp {
    let mut config = AuthConfig::default();
    config.signing.secret = Some("routes-test-secret-routes-test-secret".to_string());

    let store = Arc::new(InMemoryRevocationStore::new());
    let service = Arc::new(TokenService::from_config(config, store).expect("valid config"));

    let credentials = CredentialStore::from_records(&[UserRecord {
        id: "u1".to_string(),
        username: "alice".to_string(),
        password_hash: alice_hash().to_string(),
        name: Some("Alice".to_string()),
        roles: vec!["reader".to_string()],
    }]);

    TestApp {
        app: build_app(AppState::new(service.clone(), credentials)),
        service,
    }
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"username": username, "password": password}).to_string(),
        ))
        .unwrap()
}

fn with_token(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn login(app: &Router) -> TokenResponse {
    let response = app
        .clone()
        .oneshot(login_request("alice", "wonderland"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    serde_json::from_value(body_json(response).await).unwrap()
}

#[tokio::test]
async fn healthz_and_request_id() {
    let TestApp { app, .. } = test_app();

    let request = Request::builder()
        .uri("/healthz")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn request_id_is_assigned_when_absent() {
    let TestApp { app, .. } = test_app();

    let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let assigned = response.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(assigned.len(), 36);
}

#[tokio::test]
async fn login_then_me() {
    let TestApp { app, .. } = test_app();
    let tokens = login(&app).await;
    assert_eq!(tokens.token_type, "Bearer");
    assert!(tokens.refresh_until >= tokens.expires_at);

    let response = app
        .oneshot(with_token(Method::GET, "/auth/me", &tokens.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["claims"]["uid"], "u1");
    assert_eq!(body["claims"]["username"], "alice");
    assert_eq!(body["user"]["name"], "Alice");
    assert_eq!(body["user"]["roles"], json!(["reader"]));
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let TestApp { app, .. } = test_app();

    let response = app
        .clone()
        .oneshot(login_request("alice", "looking-glass"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["reason"], "invalid_credentials");

    let response = app.oneshot(login_request("", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn me_requires_token() {
    let TestApp { app, .. } = test_app();

    let request = Request::builder().uri("/auth/me").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::WWW_AUTHENTICATE],
        "Bearer realm=\"tokengate\""
    );
}

#[tokio::test]
async fn logout_revokes_token() {
    let TestApp { app, .. } = test_app();
    let tokens = login(&app).await;

    let response = app
        .clone()
        .oneshot(with_token(Method::POST, "/auth/logout", &tokens.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(with_token(Method::GET, "/auth/me", &tokens.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["reason"], "revoked");
}

#[tokio::test]
async fn refresh_of_live_token_is_not_allowed() {
    let TestApp { app, .. } = test_app();
    let tokens = login(&app).await;

    let response = app
        .oneshot(with_token(Method::POST, "/auth/refresh", &tokens.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["reason"], "refresh_not_allowed");
}

#[tokio::test]
async fn expired_token_refreshes_once() {
    let TestApp { app, service } = test_app();

    // default ttl is 1h and the refresh window 2h
    let mut custom = CustomClaims::new();
    custom.insert("uid".to_string(), json!("u1"));
    let expired = service.issue_at(custom, now() - 4_000).await.unwrap();

    let response = app
        .clone()
        .oneshot(with_token(Method::GET, "/auth/me", expired.as_str()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["reason"], "expired_refreshable");
    assert_eq!(body["code"], 50001);

    let response = app
        .clone()
        .oneshot(with_token(Method::POST, "/auth/refresh", expired.as_str()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let refreshed: TokenResponse = serde_json::from_value(body_json(response).await).unwrap();

    let response = app
        .clone()
        .oneshot(with_token(Method::GET, "/auth/me", &refreshed.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["claims"]["uid"], "u1");

    // the superseded token cannot be refreshed again
    let response = app
        .oneshot(with_token(Method::POST, "/auth/refresh", expired.as_str()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["reason"], "revoked");
}

#[tokio::test]
async fn terminal_expiry_requires_login() {
    let TestApp { app, service } = test_app();
    let stale = service
        .issue_at(CustomClaims::new(), now() - 10_000)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(with_token(Method::POST, "/auth/refresh", stale.as_str()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["reason"], "refresh_not_allowed");

    let response = app
        .oneshot(with_token(Method::GET, "/auth/me", stale.as_str()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["reason"], "expired_terminal");
    assert_eq!(body["code"], 50002);
}

#[tokio::test]
async fn garbage_token_is_bad_request() {
    let TestApp { app, .. } = test_app();

    let response = app
        .oneshot(with_token(Method::POST, "/auth/logout", "garbage"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["reason"], "parse_failure");
}
