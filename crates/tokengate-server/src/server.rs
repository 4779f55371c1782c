use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokengate_auth::{InMemoryRevocationStore, TokenService, require_session};
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::AppConfig,
    credentials::CredentialStore,
    handlers::{self, AppState},
    middleware as app_middleware,
};

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(
            state.gate.clone(),
            require_session,
        ));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .route("/auth/logout", post(handlers::logout))
        .merge(protected)
        .with_state(state)
        // Middleware stack (order: request id -> cors -> trace)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .headers()
                        .get(app_middleware::REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
}

pub struct TokengateServer {
    addr: SocketAddr,
    app: Router,
    service: Arc<TokenService>,
    cleanup_interval: Duration,
}

impl TokengateServer {
    /// Builds the token service, credential store and router from config.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(InMemoryRevocationStore::new());
        let service = Arc::new(TokenService::from_config(cfg.auth.clone(), store)?);
        let credentials = CredentialStore::from_records(&cfg.users);
        if credentials.is_empty() {
            tracing::warn!("no users configured; login will always fail");
        }

        let app = build_app(AppState::new(service.clone(), credentials));
        Ok(Self {
            addr: cfg.addr(),
            app,
            service,
            cleanup_interval: cfg.server.cleanup_interval,
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let cleanup = spawn_cleanup(self.service.clone(), self.cleanup_interval);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        cleanup.abort();
        served?;
        Ok(())
    }
}

/// Periodically drops session records whose retention has passed.
pub fn spawn_cleanup(service: Arc<TokenService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match service.cleanup_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "expired session records purged"),
                Err(e) => tracing::warn!(error = %e, "session cleanup failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
