//! HTTP API: probes, Prometheus metrics and gated diagnostics

use crate::gate::{require_identity, resolve_identity, VerifierState};
use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use gallery_lib::{
    health::{ComponentStatus, HealthRegistry},
    GalleryMetrics, HealthSampler, HealthSnapshot, Identity, IdentityVerifier, Trigger,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: GalleryMetrics,
    pub sampler: Arc<HealthSampler>,
    pub verifier: Option<Arc<dyn IdentityVerifier>>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: GalleryMetrics,
        sampler: Arc<HealthSampler>,
        verifier: Option<Arc<dyn IdentityVerifier>>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            sampler,
            verifier,
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Current sampler snapshot
async fn memory_diagnostics(State(state): State<Arc<AppState>>) -> Json<HealthSnapshot> {
    Json(state.sampler.snapshot().await)
}

#[derive(Debug, Serialize)]
pub struct CollectResponse {
    pub collected: bool,
    pub snapshot: HealthSnapshot,
}

/// Run corrective action on demand
async fn force_collect(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Json<CollectResponse> {
    let collected = state.sampler.corrective_action(Trigger::Manual).await;
    info!(
        subject_id = %identity.subject_id,
        collected = collected,
        "Manual corrective action"
    );

    Json(CollectResponse {
        collected,
        snapshot: state.sampler.snapshot().await,
    })
}

/// Identity resolved for the caller
async fn session(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let verifier: VerifierState = state.verifier.clone();

    let api = Router::new()
        .route("/diagnostics/memory", get(memory_diagnostics))
        .route("/diagnostics/gc", post(force_collect))
        .route("/session", get(session))
        .layer(from_fn_with_state(state.metrics.clone(), require_identity));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .nest("/api", api)
        .layer(from_fn_with_state(verifier, resolve_identity))
        .with_state(state)
}

/// Start the API server, returning once `shutdown` resolves and connections drain
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
    drain_timeout: Duration,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = TcpListener::bind(&addr).await?;
    serve_router(listener, app, shutdown, drain_timeout).await
}

/// Serve `app` until `shutdown` resolves, then give open connections at
/// most `drain_timeout` to finish
pub async fn serve_router(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
    drain_timeout: Duration,
) -> anyhow::Result<()> {
    let stopping = Arc::new(Notify::new());
    let signal = {
        let stopping = stopping.clone();
        async move {
            shutdown.await;
            stopping.notify_one();
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return Ok(result?),
        _ = stopping.notified() => {}
    }

    match tokio::time::timeout(drain_timeout, server).await {
        Ok(result) => result?,
        Err(_) => warn!(
            timeout_ms = drain_timeout.as_millis() as u64,
            "Connections still open after drain timeout, abandoning them"
        ),
    }

    Ok(())
}
