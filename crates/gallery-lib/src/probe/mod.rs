//! Process resource probes
//!
//! A probe produces the raw memory and CPU figures for one sampling tick.
//! [`SystemProbe`] reads the live process; [`ScriptedProbe`] replays a fixed
//! sequence so the sampler can be driven deterministically.

mod alloc;
mod proc_stat;

pub use alloc::{allocator_stats, AllocatorStats, CountingAllocator, LARGE_ALLOCATION_BYTES};
pub use proc_stat::{parse_proc_stat, utilization, CpuTimes};

use crate::models::RawUsage;
use std::collections::VecDeque;
use std::path::PathBuf;
use sysinfo::{Pid, System};
use tracing::debug;

/// Source of raw usage figures for the sampler
pub trait ResourceProbe: Send {
    fn read(&mut self) -> RawUsage;
}

/// Probe for the current process
pub struct SystemProbe {
    system: System,
    pid: Option<Pid>,
    proc_stat_path: PathBuf,
    last_cpu: Option<Vec<CpuTimes>>,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self::with_proc_stat_path("/proc/stat")
    }

    /// Create a probe reading CPU times from a custom path (for testing)
    pub fn with_proc_stat_path(path: impl Into<PathBuf>) -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                debug!(error = %e, "Could not resolve current pid, memory figures will be zero");
                None
            }
        };

        Self {
            system: System::new(),
            pid,
            proc_stat_path: path.into(),
            last_cpu: None,
        }
    }

    /// Resident set and virtual size of this process in bytes
    fn read_process_memory(&mut self) -> (u64, u64) {
        let Some(pid) = self.pid else {
            return (0, 0);
        };

        self.system.refresh_process(pid);
        self.system
            .process(pid)
            .map(|p| (p.memory(), p.virtual_memory()))
            .unwrap_or((0, 0))
    }

    fn read_cpu_percent(&mut self) -> f64 {
        match std::fs::read_to_string(&self.proc_stat_path) {
            Ok(content) => {
                let current = parse_proc_stat(&content);
                if !current.is_empty() {
                    let usage = utilization(self.last_cpu.as_deref(), &current);
                    self.last_cpu = Some(current);
                    return usage;
                }
                debug!(path = %self.proc_stat_path.display(), "No per-core lines in CPU stat file");
            }
            Err(e) => {
                debug!(
                    path = %self.proc_stat_path.display(),
                    error = %e,
                    "CPU stat file unavailable"
                );
            }
        }

        self.system.refresh_cpu();
        f64::from(self.system.global_cpu_info().cpu_usage())
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProbe for SystemProbe {
    fn read(&mut self) -> RawUsage {
        let (resident_set_bytes, virtual_bytes) = self.read_process_memory();

        let (heap_used_bytes, heap_total_bytes, array_buffers_bytes) =
            heap_figures(allocator_stats(), resident_set_bytes, virtual_bytes);

        RawUsage {
            heap_used_bytes,
            heap_total_bytes,
            resident_set_bytes,
            external_bytes: resident_set_bytes.saturating_sub(heap_used_bytes),
            array_buffers_bytes,
            cpu_percent: self.read_cpu_percent(),
        }
    }
}

/// Heap used, heap total and large-buffer bytes.
///
/// Without the counting allocator the resident set stands in for heap used
/// and the virtual size for heap total.
fn heap_figures(
    stats: Option<AllocatorStats>,
    resident_set_bytes: u64,
    virtual_bytes: u64,
) -> (u64, u64, u64) {
    match stats {
        Some(stats) => (
            stats.live_bytes,
            stats.peak_bytes.max(stats.live_bytes),
            stats.large_bytes,
        ),
        None => (resident_set_bytes, virtual_bytes, 0),
    }
}

/// Probe that replays a fixed sequence, repeating the final entry
pub struct ScriptedProbe {
    readings: VecDeque<RawUsage>,
    last: RawUsage,
}

impl ScriptedProbe {
    pub fn new(readings: impl IntoIterator<Item = RawUsage>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            last: RawUsage::default(),
        }
    }

    /// Heap-only script in whole megabytes with idle CPU
    pub fn from_heap_mb(heap_mb: impl IntoIterator<Item = u64>) -> Self {
        Self::new(heap_mb.into_iter().map(|mb| RawUsage::from_heap_mb(mb, 0.0)))
    }
}

impl ResourceProbe for ScriptedProbe {
    fn read(&mut self) -> RawUsage {
        if let Some(next) = self.readings.pop_front() {
            self.last = next;
        }
        self.last
    }
}
