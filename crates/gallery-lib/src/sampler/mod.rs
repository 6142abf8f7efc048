//! Process health sampler
//!
//! Each tick samples process memory and CPU, records the reading in two
//! bounded rolling histories, and classifies it:
//!
//! - heap growth against the previous reading (leak suspicion)
//! - absolute heap usage against the memory tiers
//! - CPU utilization against the CPU tiers
//!
//! Corrective action runs the configured [`Collector`], clears both
//! histories and resets both counters. All state lives behind one lock so
//! a snapshot never observes a half-applied tick.

mod history;
mod r#loop;
mod thresholds;

#[cfg(test)]
mod tests;

pub use history::RollingHistory;
pub use r#loop::SamplerLoop;
pub use thresholds::{
    ConfigError, SamplerConfig, Thresholds, Tier, CRITICAL_STREAK_LIMIT,
    DEFAULT_GROWTH_RATE_LIMIT, DEFAULT_GROWTH_STREAK_LIMIT, DEFAULT_HISTORY_CAPACITY,
};

use crate::gc::{Collector, NoopCollector};
use crate::health::{components, HealthRegistry};
use crate::models::{CpuReading, CurrentUsage, HealthReading, HealthSnapshot, UsageHistory};
use crate::observability::{GalleryMetrics, StructuredLogger};
use crate::probe::ResourceProbe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

/// Why corrective action ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Heap grew on `growth_streak_limit` consecutive ticks
    LeakStreak,
    /// Heap grew by more than `growth_rate_limit` percent in one tick
    LeakSpike,
    /// Second consecutive reading in the critical memory tier
    MemoryCritical,
    /// Reading at or above the failure memory tier
    MemoryFailure,
    /// Requested over the diagnostics API
    Manual,
    /// Process termination
    Shutdown,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::LeakStreak => "leak_streak",
            Trigger::LeakSpike => "leak_spike",
            Trigger::MemoryCritical => "memory_critical",
            Trigger::MemoryFailure => "memory_failure",
            Trigger::Manual => "manual",
            Trigger::Shutdown => "shutdown",
        }
    }
}

/// Diagnostic signal raised while classifying a reading
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    LeakSuspected { growth_percent: f64, growth_count: u32 },
    MemoryTier(Tier),
    CpuTier(Tier),
    CpuHistoryCleared,
    CorrectiveAction { trigger: Trigger, reclaimed: bool },
}

/// Outcome of one sampling tick
#[derive(Debug, Clone)]
pub struct TickReport {
    pub reading: HealthReading,
    pub growth_percent: f64,
    pub memory_tier: Tier,
    pub cpu_tier: Tier,
    pub signals: Vec<Signal>,
}

impl TickReport {
    /// Triggers of every corrective action that ran during the tick
    pub fn corrective_triggers(&self) -> Vec<Trigger> {
        self.signals
            .iter()
            .filter_map(|s| match s {
                Signal::CorrectiveAction { trigger, .. } => Some(*trigger),
                _ => None,
            })
            .collect()
    }

    pub fn leak_suspected(&self) -> bool {
        self.signals
            .iter()
            .any(|s| matches!(s, Signal::LeakSuspected { .. }))
    }
}

/// Sampler counters as of the last completed tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerCounters {
    pub growth_count: u32,
    pub high_memory_count: u32,
}

struct SamplerState {
    latest: Option<HealthReading>,
    memory_history: RollingHistory<HealthReading>,
    cpu_history: RollingHistory<CpuReading>,
    counters: SamplerCounters,
}

impl SamplerState {
    fn new(capacity: usize) -> Self {
        Self {
            latest: None,
            memory_history: RollingHistory::new(capacity),
            cpu_history: RollingHistory::new(capacity),
            counters: SamplerCounters::default(),
        }
    }
}

pub struct HealthSampler {
    config: SamplerConfig,
    state: RwLock<SamplerState>,
    probe: Mutex<Box<dyn ResourceProbe>>,
    collector: Arc<dyn Collector>,
    metrics: GalleryMetrics,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
}

impl HealthSampler {
    /// Create a sampler with a no-op collector
    pub fn new(config: SamplerConfig, probe: Box<dyn ResourceProbe>) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            state: RwLock::new(SamplerState::new(config.history_capacity)),
            config,
            probe: Mutex::new(probe),
            collector: Arc::new(NoopCollector),
            metrics: GalleryMetrics::new(),
            logger: StructuredLogger::new("media-gallery"),
            health: None,
        })
    }

    pub fn with_collector(mut self, collector: Arc<dyn Collector>) -> Self {
        self.collector = collector;
        self
    }

    pub fn with_health_registry(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample, record and classify one reading
    pub async fn tick(&self) -> TickReport {
        let start = Instant::now();

        // Held for the whole tick so concurrent ticks apply in probe order
        let mut probe = self.probe.lock().await;
        let raw = probe.read();
        let reading = HealthReading::from_raw(&raw, chrono::Utc::now().timestamp_millis());

        let (report, counters) = {
            let mut state = self.state.write().await;
            let report = self.apply(&mut state, reading);
            (report, state.counters)
        };
        drop(probe);

        self.metrics.set_process_usage(
            reading.heap_used_mb,
            reading.resident_set_mb,
            reading.cpu_percent,
        );
        self.metrics.set_growth_streak(counters.growth_count);
        self.metrics
            .observe_sample_latency(start.elapsed().as_secs_f64());

        if let Some(health) = &self.health {
            health
                .report_tier(
                    components::MEMORY,
                    report.memory_tier,
                    format!("{} MB heap", reading.heap_used_mb),
                )
                .await;
            health
                .report_tier(
                    components::CPU,
                    report.cpu_tier,
                    format!("{:.1}% cpu", reading.cpu_percent),
                )
                .await;
            health.set_healthy(components::SAMPLER).await;
            health.set_ready(true).await;
        }

        report
    }

    fn apply(&self, state: &mut SamplerState, reading: HealthReading) -> TickReport {
        let mut signals = Vec::new();
        let current = reading.heap_used_mb;

        // Record
        let previous = state.memory_history.last().map(|r| r.heap_used_mb);
        state.memory_history.push(reading);
        state.cpu_history.push(CpuReading {
            usage: reading.cpu_percent,
            timestamp: reading.timestamp,
        });
        state.latest = Some(reading);

        // Growth relative to the previous reading
        let growth_percent = match previous {
            Some(prev) if prev > 0 => (current as f64 - prev as f64) / prev as f64 * 100.0,
            _ => 0.0,
        };
        match previous {
            Some(prev) if current > prev => state.counters.growth_count += 1,
            Some(_) => state.counters.growth_count = 0,
            None => {}
        }

        let spike = growth_percent > self.config.growth_rate_limit;
        let streak = state.counters.growth_count >= self.config.growth_streak_limit;
        if spike || streak {
            let growth_count = state.counters.growth_count;
            self.logger
                .log_leak_suspected(growth_percent, growth_count, current);
            signals.push(Signal::LeakSuspected {
                growth_percent,
                growth_count,
            });
            let trigger = if spike {
                Trigger::LeakSpike
            } else {
                Trigger::LeakStreak
            };
            signals.push(self.run_corrective(state, trigger));
        }

        // Absolute memory level
        let memory_tier = self.config.memory.classify(current as f64);
        match memory_tier {
            Tier::Failure => {
                self.logger.log_memory_tier(memory_tier, current, 0);
                signals.push(self.run_corrective(state, Trigger::MemoryFailure));
            }
            Tier::Critical => {
                state.counters.high_memory_count += 1;
                let consecutive = state.counters.high_memory_count;
                self.logger.log_memory_tier(memory_tier, current, consecutive);
                if consecutive >= CRITICAL_STREAK_LIMIT {
                    signals.push(self.run_corrective(state, Trigger::MemoryCritical));
                }
            }
            Tier::Warning => {
                let consecutive = state.counters.high_memory_count;
                self.logger.log_memory_tier(memory_tier, current, consecutive);
            }
            Tier::Normal => state.counters.high_memory_count = 0,
        }
        if memory_tier != Tier::Normal {
            signals.push(Signal::MemoryTier(memory_tier));
        }

        // CPU level
        let cpu_tier = self.config.cpu.classify(reading.cpu_percent);
        self.logger.log_cpu_tier(cpu_tier, reading.cpu_percent);
        if cpu_tier != Tier::Normal {
            signals.push(Signal::CpuTier(cpu_tier));
        }
        if cpu_tier == Tier::Failure {
            state.cpu_history.clear();
            signals.push(Signal::CpuHistoryCleared);
        }

        TickReport {
            reading,
            growth_percent,
            memory_tier,
            cpu_tier,
            signals,
        }
    }

    fn run_corrective(&self, state: &mut SamplerState, trigger: Trigger) -> Signal {
        let reclaimed = self.collector.collect();

        state.memory_history.clear();
        state.cpu_history.clear();
        state.counters = SamplerCounters::default();

        self.metrics.inc_corrective_actions(trigger.as_str());
        self.logger
            .log_corrective_action(trigger.as_str(), self.collector.name(), reclaimed);

        Signal::CorrectiveAction { trigger, reclaimed }
    }

    /// Run corrective action outside the sampling cycle
    ///
    /// Returns whether the collector released any memory.
    pub async fn corrective_action(&self, trigger: Trigger) -> bool {
        let mut state = self.state.write().await;
        matches!(
            self.run_corrective(&mut state, trigger),
            Signal::CorrectiveAction {
                reclaimed: true,
                ..
            }
        )
    }

    pub async fn counters(&self) -> SamplerCounters {
        self.state.read().await.counters
    }

    /// Latest reading, both histories and thresholds
    pub async fn snapshot(&self) -> HealthSnapshot {
        let state = self.state.read().await;

        HealthSnapshot {
            current: state.latest.map(|reading| CurrentUsage {
                reading,
                cpu_usage: reading.cpu_percent,
            }),
            history: UsageHistory {
                memory: state.memory_history.to_vec(),
                cpu: state.cpu_history.to_vec(),
            },
            thresholds: self.config.threshold_values(),
            potential_leak: state.counters.growth_count >= self.config.growth_streak_limit,
        }
    }
}
