//! HTTP surface of the relay.
//!
//! One listener carries both roles: producers attach over the `/ws`
//! WebSocket to push captures in, and consumers query the store through a
//! small JSON API (`/api/tools`, `/api/resources`) plus `/health` and
//! `/metrics` for operating it.

pub mod resources;
pub mod tools;
pub mod ws;


use std::future::Future;
use std::io::ErrorKind;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use crate::config::{Config, ServerSettings};
use crate::constants::MAX_HTTP_BODY_BYTES;
use crate::error::{Error, Result};
use crate::facade::{LivenessReport, QueryFacade};
use crate::metrics;
use crate::sessions::SessionRegistry;
use crate::store::CaptureStore;

// =============================================================================
// Application State
// =============================================================================

/// Shared handles for every route. Clones are cheap; the services inside
/// are reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub store: CaptureStore,
    pub sessions: SessionRegistry,
    pub facade: QueryFacade,
}

// =============================================================================
// Error Handling
// =============================================================================

/// API-level errors with HTTP status mappings.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

/// Standard error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(message) => {
                error!(%message, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            },
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err.status_code() {
            404 => Self::NotFound(err.to_string()),
            400 | 422 => Self::BadRequest(err.to_string()),
            _ => Self::Internal(err.to_string()),
        }
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// Records request count and latency for every route.
async fn track_metrics(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    metrics::record_http_request(
        method.as_str(),
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

// =============================================================================
// Router
// =============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/tools", get(tools::list_tools_handler))
        .route("/api/tools/call", post(tools::call_tool_handler))
        .route("/api/resources", get(resources::list_resources_handler))
        .route("/api/resources/read", get(resources::read_resource_handler))
        .layer(middleware::from_fn(track_metrics))
        .layer(DefaultBodyLimit::max(MAX_HTTP_BODY_BYTES))
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<LivenessReport> {
    Json(state.facade.liveness())
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics::render_metrics(),
    )
}

// =============================================================================
// Server Lifecycle
// =============================================================================

/// Binds the first available address from the configured port list.
///
/// A busy port is routine (another instance, or a stale process on the
/// default port); only exhausting the whole list is fatal.
pub async fn bind_listener(server: &ServerSettings) -> Result<TcpListener> {
    let mut last_err: Option<std::io::Error> = None;

    for port in &server.ports {
        let addr = format!("{}:{}", server.host, port);
        match TcpListener::bind(&addr).await {
            Ok(listener) => {
                if last_err.is_some() {
                    info!(%addr, "bound after earlier candidates were unavailable");
                }
                return Ok(listener);
            },
            Err(err) if err.kind() == ErrorKind::AddrInUse => {
                warn!(%addr, "port in use, trying next candidate");
                last_err = Some(err);
            },
            Err(err) => {
                warn!(%addr, error = %err, "bind failed, trying next candidate");
                last_err = Some(err);
            },
        }
    }

    let attempted = server
        .ports
        .iter()
        .map(|port| format!("{}:{}", server.host, port))
        .collect::<Vec<_>>()
        .join(", ");
    Err(Error::bind(
        attempted,
        last_err.unwrap_or_else(|| {
            std::io::Error::new(ErrorKind::AddrNotAvailable, "no ports configured")
        }),
    ))
}

/// Binds a listener and runs the relay until Ctrl+C or SIGTERM.
pub async fn serve(config: Config) -> Result<()> {
    let listener = bind_listener(&config.server).await?;
    serve_on(listener, config, shutdown_signal()).await
}

/// Runs the relay on an already-bound listener until `shutdown` resolves.
///
/// Owns service wiring and lifecycle: the expiry sweeper starts before the
/// first connection is accepted and the store is torn down after the last
/// in-flight request drains.
pub async fn serve_on<F>(listener: TcpListener, config: Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bound_addr = listener
        .local_addr()
        .map_err(|err| Error::Internal(format!("failed to read bound address: {err}")))?;

    let store = CaptureStore::new(config.store, config.limits);
    let sessions = SessionRegistry::new();
    let facade = QueryFacade::new(store.clone(), sessions.clone(), bound_addr);
    let state = AppState {
        store: store.clone(),
        sessions,
        facade,
    };

    store.start_sweeper();
    let app = create_router(state);

    info!(%bound_addr, "capture relay listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| Error::Internal(format!("server error: {err}")))?;

    store.teardown();
    info!("shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
