//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the operation handlers
//! - Wire up middleware (request ID, tracing, timeout, CORS, body limit)
//! - Serve plaintext or TLS, with graceful shutdown

use axum::{
    body::Body,
    http::Request,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::handlers;
use crate::net::tls::load_tls_config;
use crate::service::AdminService;

/// Grace period for in-flight requests after a shutdown signal.
const DRAIN_SECS: u64 = 10;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AdminService>,
}

impl AppState {
    pub fn new(service: AdminService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &AppConfig, state: AppState) -> Router {
    let cors = if config.security.permissive_cors {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/status", get(handlers::status))
        .route("/api/issue-token", post(handlers::issue_token))
        .route("/api/transfer-admin", post(handlers::transfer_admin))
        .route("/api/clear-admin", post(handlers::clear_admin))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                // CorsLayer needs a `Default` response body; keep it inside the body limit.
                .layer(cors)
                .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
        )
}

/// HTTP server for the admin gateway.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    pub fn new(config: AppConfig, service: AdminService) -> Self {
        let router = build_router(&config, AppState::new(service));
        Self { router, config }
    }

    /// Serve until `shutdown` fires, then drain.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.listener.bind_address.parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid bind address '{}': {}", self.config.listener.bind_address, e),
            )
        })?;

        match self.config.listener.tls.clone() {
            Some(tls) => {
                let rustls = load_tls_config(&tls).await?;
                let handle = axum_server::Handle::new();
                let drain = handle.clone();
                tokio::spawn(async move {
                    wait(shutdown).await;
                    drain.graceful_shutdown(Some(Duration::from_secs(DRAIN_SECS)));
                });

                tracing::info!(address = %addr, "HTTPS server starting");
                axum_server::bind_rustls(addr, rustls)
                    .handle(handle)
                    .serve(self.router.into_make_service())
                    .await?;
            }
            None => {
                let listener = TcpListener::bind(addr).await?;
                tracing::info!(address = %listener.local_addr()?, "HTTP server starting");
                axum::serve(listener, self.router)
                    .with_graceful_shutdown(wait(shutdown))
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

async fn wait(mut shutdown: broadcast::Receiver<()>) {
    // A closed channel also means shutdown.
    let _ = shutdown.recv().await;
}
