//! Media gallery - API server with process health sampling
//!
//! Serves the gated diagnostics API and probe endpoints while a background
//! task samples process memory and CPU.

use anyhow::Result;
use gallery_lib::{
    gc::platform_collector,
    health::{components, HealthRegistry},
    observability::{GalleryMetrics, StructuredLogger},
    probe::{CountingAllocator, SystemProbe},
    HealthSampler, IdentityVerifier, JwtVerifier,
};
use media_gallery::{api, config::GalleryConfig, run_service, shutdown_signal};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator::new();

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting media-gallery");

    let config = GalleryConfig::load()?;
    let sampler_config = config.sampler.to_sampler_config()?;
    info!(
        instance = %config.instance_name,
        port = config.port,
        interval_secs = sampler_config.interval.as_secs(),
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::MEMORY).await;
    health_registry.register(components::CPU).await;
    health_registry.register(components::SAMPLER).await;

    let metrics = GalleryMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    let sampler = Arc::new(
        HealthSampler::new(sampler_config, Box::new(SystemProbe::new()))?
            .with_collector(platform_collector())
            .with_health_registry(health_registry.clone())
            .with_logger(logger.clone()),
    );

    let verifier: Option<Arc<dyn IdentityVerifier>> = match config.jwt_secret.as_deref() {
        Some(secret) => Some(Arc::new(JwtVerifier::new(secret.as_bytes()))),
        None => {
            warn!("No JWT secret configured, all /api requests will be rejected");
            None
        }
    };

    let app_state = Arc::new(api::AppState::new(
        health_registry,
        metrics,
        sampler,
        verifier,
    ));

    logger.log_startup(VERSION, config.port);

    run_service(
        app_state,
        config.port,
        Duration::from_secs(config.shutdown_timeout_secs),
        shutdown_signal(),
        &logger,
    )
    .await?;
    info!("Shutdown complete");

    Ok(())
}
