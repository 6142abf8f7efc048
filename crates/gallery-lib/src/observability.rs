//! Observability infrastructure for the gallery service
//!
//! Provides:
//! - Prometheus metrics (process memory/CPU gauges, corrective actions, admission rejections)
//! - Structured JSON logging with tracing

use crate::sampler::Tier;
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Gauge, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{debug, error, info, warn};

/// Histogram buckets for sampling tick latency (in seconds)
const SAMPLE_LATENCY_BUCKETS: &[f64] = &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<GalleryMetricsInner> = OnceLock::new();

struct GalleryMetricsInner {
    heap_used_megabytes: IntGauge,
    resident_set_megabytes: IntGauge,
    cpu_usage_percent: Gauge,
    heap_growth_streak: IntGauge,
    sample_latency_seconds: Histogram,
    corrective_actions: IntCounterVec,
    admission_rejections: IntCounter,
    admitted_requests: IntCounter,
}

impl GalleryMetricsInner {
    fn new() -> Self {
        Self {
            heap_used_megabytes: register_int_gauge!(
                "gallery_heap_used_megabytes",
                "Heap in use at the last sampling tick"
            )
            .expect("Failed to register heap_used_megabytes"),

            resident_set_megabytes: register_int_gauge!(
                "gallery_resident_set_megabytes",
                "Resident set size at the last sampling tick"
            )
            .expect("Failed to register resident_set_megabytes"),

            cpu_usage_percent: register_gauge!(
                "gallery_cpu_usage_percent",
                "CPU utilization averaged across logical cores at the last sampling tick"
            )
            .expect("Failed to register cpu_usage_percent"),

            heap_growth_streak: register_int_gauge!(
                "gallery_heap_growth_streak",
                "Consecutive sampling ticks with heap growth"
            )
            .expect("Failed to register heap_growth_streak"),

            sample_latency_seconds: register_histogram!(
                "gallery_sample_latency_seconds",
                "Time spent on one health sampling tick",
                SAMPLE_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register sample_latency_seconds"),

            corrective_actions: register_int_counter_vec!(
                "gallery_corrective_actions_total",
                "Corrective actions run by the health sampler",
                &["trigger"]
            )
            .expect("Failed to register corrective_actions"),

            admission_rejections: register_int_counter!(
                "gallery_admission_rejections_total",
                "Requests rejected by the access gate"
            )
            .expect("Failed to register admission_rejections"),

            admitted_requests: register_int_counter!(
                "gallery_admitted_requests_total",
                "Requests admitted by the access gate"
            )
            .expect("Failed to register admitted_requests"),
        }
    }
}

/// Lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct GalleryMetrics {
    _private: (),
}

impl Default for GalleryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GalleryMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(GalleryMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &GalleryMetricsInner {
        GLOBAL_METRICS.get_or_init(GalleryMetricsInner::new)
    }

    /// Update process gauges from the latest tick
    pub fn set_process_usage(&self, heap_used_mb: u64, resident_set_mb: u64, cpu_percent: f64) {
        let inner = self.inner();
        inner.heap_used_megabytes.set(heap_used_mb as i64);
        inner.resident_set_megabytes.set(resident_set_mb as i64);
        inner.cpu_usage_percent.set(cpu_percent);
    }

    pub fn set_growth_streak(&self, streak: u32) {
        self.inner().heap_growth_streak.set(i64::from(streak));
    }

    pub fn observe_sample_latency(&self, duration_secs: f64) {
        self.inner().sample_latency_seconds.observe(duration_secs);
    }

    pub fn inc_corrective_actions(&self, trigger: &str) {
        self.inner()
            .corrective_actions
            .with_label_values(&[trigger])
            .inc();
    }

    pub fn corrective_actions(&self, trigger: &str) -> u64 {
        self.inner()
            .corrective_actions
            .with_label_values(&[trigger])
            .get()
    }

    pub fn inc_admission_rejections(&self) {
        self.inner().admission_rejections.inc();
    }

    pub fn admission_rejections(&self) -> u64 {
        self.inner().admission_rejections.get()
    }

    pub fn inc_admitted_requests(&self) {
        self.inner().admitted_requests.inc();
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for lifecycle and
/// resource-pressure events.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, port: u16) {
        info!(
            event = "service_started",
            instance = %self.instance,
            version = %version,
            port = port,
            "Media gallery started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Media gallery shutting down"
        );
    }

    /// Log a memory tier crossing; failure is the only error-level signal
    pub fn log_memory_tier(&self, tier: Tier, heap_used_mb: u64, consecutive_high: u32) {
        match tier {
            Tier::Normal => {}
            Tier::Warning => warn!(
                event = "memory_threshold",
                instance = %self.instance,
                tier = tier.as_str(),
                heap_used_mb = heap_used_mb,
                "Memory usage above warning threshold"
            ),
            Tier::Critical => warn!(
                event = "memory_threshold",
                instance = %self.instance,
                tier = tier.as_str(),
                heap_used_mb = heap_used_mb,
                consecutive_high = consecutive_high,
                "Memory usage above critical threshold"
            ),
            Tier::Failure => error!(
                event = "memory_threshold",
                instance = %self.instance,
                tier = tier.as_str(),
                heap_used_mb = heap_used_mb,
                "Memory usage reached failure threshold"
            ),
        }
    }

    pub fn log_cpu_tier(&self, tier: Tier, cpu_percent: f64) {
        match tier {
            Tier::Normal => {}
            Tier::Warning => info!(
                event = "cpu_threshold",
                instance = %self.instance,
                tier = tier.as_str(),
                cpu_percent = cpu_percent,
                "CPU usage above warning threshold"
            ),
            Tier::Critical | Tier::Failure => warn!(
                event = "cpu_threshold",
                instance = %self.instance,
                tier = tier.as_str(),
                cpu_percent = cpu_percent,
                "CPU usage above critical threshold"
            ),
        }
    }

    pub fn log_leak_suspected(&self, growth_percent: f64, growth_count: u32, heap_used_mb: u64) {
        warn!(
            event = "memory_leak_suspected",
            instance = %self.instance,
            growth_percent = growth_percent,
            growth_count = growth_count,
            heap_used_mb = heap_used_mb,
            "Potential memory leak detected"
        );
    }

    pub fn log_corrective_action(&self, trigger: &str, collector: &str, reclaimed: bool) {
        if reclaimed {
            info!(
                event = "corrective_action",
                instance = %self.instance,
                trigger = %trigger,
                collector = %collector,
                reclaimed = true,
                "Corrective action released memory"
            );
        } else {
            debug!(
                event = "corrective_action",
                instance = %self.instance,
                trigger = %trigger,
                collector = %collector,
                reclaimed = false,
                "Corrective action cleared history only"
            );
        }
    }
}
