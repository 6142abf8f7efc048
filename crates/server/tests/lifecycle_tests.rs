//! Startup and shutdown behaviour of the service

use axum::{routing::get, Router};
use gallery_lib::{
    health::{components, HealthRegistry},
    observability::{GalleryMetrics, StructuredLogger},
    probe::ScriptedProbe,
    HealthSampler, SamplerConfig,
};
use media_gallery::{
    api::{serve_router, AppState},
    run_service,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

async fn test_state() -> Arc<AppState> {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::MEMORY).await;

    let sampler = Arc::new(
        HealthSampler::new(
            SamplerConfig::default(),
            Box::new(ScriptedProbe::from_heap_mb([150])),
        )
        .unwrap()
        .with_health_registry(health_registry.clone()),
    );

    Arc::new(AppState::new(
        health_registry,
        GalleryMetrics::new(),
        sampler,
        None,
    ))
}

#[tokio::test]
async fn test_shutdown_runs_final_corrective_pass() {
    let state = test_state().await;
    state.sampler.tick().await;
    let before = state.metrics.corrective_actions("shutdown");

    let reclaimed = run_service(
        state.clone(),
        0,
        Duration::from_secs(1),
        async {},
        &StructuredLogger::new("lifecycle-test"),
    )
    .await
    .unwrap();

    // No-op collector reclaims nothing but the pass still runs
    assert!(!reclaimed);
    assert!(state.metrics.corrective_actions("shutdown") > before);

    let snapshot = state.sampler.snapshot().await;
    assert!(snapshot.history.memory.is_empty());
    assert!(snapshot.history.cpu.is_empty());
    assert_eq!(snapshot.current.unwrap().reading.heap_used_mb, 150);
}

#[tokio::test]
async fn test_shutdown_gives_up_on_stuck_connections() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().route(
        "/stuck",
        get(|| async {
            std::future::pending::<()>().await;
            "unreachable"
        }),
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(serve_router(
        listener,
        app,
        async {
            let _ = stop_rx.await;
        },
        Duration::from_millis(200),
    ));

    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"GET /stuck HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    // Let the request reach the handler before shutting down
    tokio::time::sleep(Duration::from_millis(100)).await;

    stop_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop once the drain timeout elapses")
        .unwrap();
    assert!(result.is_ok());
    drop(client);
}
