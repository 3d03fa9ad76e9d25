//! Token Gateway
//!
//! Single-binary Rust service that:
//! 1. Issues session tokens in exchange for a shared access password
//! 2. Gates the admin API on those sessions
//! 3. Manages a pool of upstream credentials in Redis

mod admin;
mod auth;
mod config;
mod error;
mod metrics;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use credential_pool::CredentialPool;
use kv_store::{KvStore, MemoryStore, RedisStore};
use metrics_exporter_prometheus::PrometheusHandle;
use session_gate::{AccessPolicy, SessionGate};
use tokio::net::TcpListener;
use tracing::{Instrument, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::admin::AdminState;
use crate::config::{Config, StoreBackend};
use crate::error::json_response;

/// How long in-flight requests may drain after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Key probed by the health check. Its value is never read.
const HEALTH_PROBE_KEY: &str = "health:probe";

/// Response header carrying the per-request id.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    store: Arc<dyn KvStore>,
    gate: Arc<SessionGate>,
    pool: Arc<CredentialPool>,
    started_at: Instant,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// The admin API sits behind the session gate; `/login`, `/health` and
/// `/metrics` do not. A concurrency limit layer caps in-flight requests at
/// `max_connections`.
fn build_router(state: AppState, max_connections: usize) -> Router {
    // route_layer: unmatched paths fall through to 404 instead of the gate
    let admin = admin::build_admin_router(AdminState::new(state.pool.clone())).route_layer(
        middleware::from_fn_with_state(state.gate.clone(), auth::require_session),
    );
    let login = auth::build_login_router(state.gate.clone());

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .merge(login)
        .merge(admin)
        .layer(middleware::from_fn(request_id))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting token-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        backend = ?config.store.backend,
        max_connections = config.server.max_connections,
        session_ttl_secs = config.auth.session_ttl_secs,
        "configuration loaded"
    );

    let store: Arc<dyn KvStore> = match config.store.backend {
        StoreBackend::Redis => {
            let url = config
                .store
                .url
                .as_deref()
                .context("store.url is required for the redis backend")?;
            Arc::new(
                RedisStore::connect(url)
                    .await
                    .context("failed to connect to redis")?,
            )
        }
        StoreBackend::Memory => {
            warn!("using in-memory store; sessions and credentials are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let policy = AccessPolicy::from_secret(config.auth.access_password.clone());
    let gate = SessionGate::new(store.clone(), policy)
        .with_ttl(Duration::from_secs(config.auth.session_ttl_secs));
    if !gate.policy().is_enabled() {
        warn!("no access password configured; admin API is open to everyone");
    }

    let app_state = AppState {
        pool: Arc::new(CredentialPool::new(store.clone())),
        gate: Arc::new(gate),
        store,
        started_at: Instant::now(),
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;

    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;

    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: 200 when the store answers a probe, 503 otherwise.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.started_at.elapsed().as_secs();

    match state.store.exists(HEALTH_PROBE_KEY).await {
        Ok(_) => json_response(
            axum::http::StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "store": "reachable",
                "backend": state.store.id(),
                "uptime_seconds": uptime,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "health probe failed");
            json_response(
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "status": "degraded",
                    "store": "unreachable",
                    "backend": state.store.id(),
                    "uptime_seconds": uptime,
                }),
            )
        }
    }
}

/// Prometheus metrics endpoint — returns metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Run every request inside a span tagged with a fresh `req_<uuid>` id and
/// echo the id back in `x-request-id`.
async fn request_id(request: Request, next: Next) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
