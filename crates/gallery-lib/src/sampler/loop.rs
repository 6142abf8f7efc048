//! Periodic sampling loop
//!
//! Drives [`HealthSampler::tick`] on a fixed interval until a shutdown
//! signal arrives. The first tick fires immediately so readiness flips
//! as soon as the process has one reading.

use super::HealthSampler;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

pub struct SamplerLoop {
    sampler: Arc<HealthSampler>,
    interval: Duration,
}

impl SamplerLoop {
    pub fn new(sampler: Arc<HealthSampler>) -> Self {
        let interval = sampler.config().interval;
        Self { sampler, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting health sampler"
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick_count = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.sampler.tick().await;
                    tick_count += 1;

                    debug!(
                        tick = tick_count,
                        heap_used_mb = report.reading.heap_used_mb,
                        cpu_percent = report.reading.cpu_percent,
                        growth_percent = report.growth_percent,
                        signals = report.signals.len(),
                        "Health sample recorded"
                    );
                }
                _ = shutdown.recv() => {
                    info!(ticks = tick_count, "Stopping health sampler");
                    break;
                }
            }
        }
    }
}
