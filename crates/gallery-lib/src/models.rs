//! Core data models for the health sampler and diagnostics surface

use serde::{Deserialize, Serialize};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Raw figures read from a probe in a single tick, before rounding
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawUsage {
    pub heap_used_bytes: u64,
    pub heap_total_bytes: u64,
    pub resident_set_bytes: u64,
    pub external_bytes: u64,
    pub array_buffers_bytes: u64,
    pub cpu_percent: f64,
}

impl RawUsage {
    /// Build a usage figure from whole megabytes, mostly for synthetic probes
    pub fn from_heap_mb(heap_used_mb: u64, cpu_percent: f64) -> Self {
        let bytes = heap_used_mb * 1024 * 1024;
        Self {
            heap_used_bytes: bytes,
            heap_total_bytes: bytes,
            resident_set_bytes: bytes,
            external_bytes: 0,
            array_buffers_bytes: 0,
            cpu_percent,
        }
    }
}

/// Round a byte count to the nearest whole megabyte
pub fn bytes_to_mb(bytes: u64) -> u64 {
    (bytes as f64 / BYTES_PER_MB).round() as u64
}

/// Immutable memory snapshot taken on a sampling tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReading {
    #[serde(rename = "heapUsed")]
    pub heap_used_mb: u64,
    #[serde(rename = "heapTotal")]
    pub heap_total_mb: u64,
    #[serde(rename = "rss")]
    pub resident_set_mb: u64,
    #[serde(rename = "external")]
    pub external_mb: u64,
    #[serde(rename = "arrayBuffers")]
    pub array_buffers_mb: u64,
    #[serde(skip)]
    pub cpu_percent: f64,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
}

impl HealthReading {
    pub fn from_raw(raw: &RawUsage, timestamp: i64) -> Self {
        Self {
            heap_used_mb: bytes_to_mb(raw.heap_used_bytes),
            heap_total_mb: bytes_to_mb(raw.heap_total_bytes),
            resident_set_mb: bytes_to_mb(raw.resident_set_bytes),
            external_mb: bytes_to_mb(raw.external_bytes),
            array_buffers_mb: bytes_to_mb(raw.array_buffers_bytes),
            cpu_percent: raw.cpu_percent,
            timestamp,
        }
    }
}

/// CPU utilization entry in the CPU rolling history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpuReading {
    pub usage: f64,
    pub timestamp: i64,
}

/// Latest reading merged with the current CPU usage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUsage {
    #[serde(flatten)]
    pub reading: HealthReading,
    pub cpu_usage: f64,
}

/// Both rolling histories, oldest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageHistory {
    pub memory: Vec<HealthReading>,
    pub cpu: Vec<CpuReading>,
}

/// Tier values as exposed over the diagnostics API
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierValues {
    pub warning: f64,
    pub critical: f64,
    pub failure: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdValues {
    pub memory: TierValues,
    pub cpu: TierValues,
}

/// Read-only view of the sampler returned to the diagnostics endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub current: Option<CurrentUsage>,
    pub history: UsageHistory,
    pub thresholds: ThresholdValues,
    pub potential_leak: bool,
}
