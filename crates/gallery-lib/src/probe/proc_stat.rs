//! Per-core CPU time parsing from /proc/stat
//!
//! Utilization is the mean over logical cores of the busy share of the
//! time elapsed between two readings.

/// Busy and idle jiffies for one logical core
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub busy: u64,
    pub idle: u64,
}

impl CpuTimes {
    pub fn total(&self) -> u64 {
        self.busy + self.idle
    }
}

/// Parse the `cpuN` lines of /proc/stat, skipping the aggregate `cpu` line
///
/// Field order: user nice system idle iowait irq softirq steal guest guest_nice.
/// Guest time is already included in user time, so it is not added again.
pub fn parse_proc_stat(content: &str) -> Vec<CpuTimes> {
    let mut cores = Vec::new();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let Some(label) = parts.next() else {
            continue;
        };
        let is_core = label
            .strip_prefix("cpu")
            .map(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false);
        if !is_core {
            continue;
        }

        let fields: Vec<u64> = parts.map(|p| p.parse().unwrap_or(0)).collect();
        if fields.len() < 4 {
            continue;
        }
        let field = |i: usize| fields.get(i).copied().unwrap_or(0);

        let idle = field(3) + field(4);
        let busy = field(0) + field(1) + field(2) + field(5) + field(6) + field(7);
        cores.push(CpuTimes { busy, idle });
    }

    cores
}

/// Average utilization percent across cores between two readings
///
/// Without a comparable previous reading (none, or a different core count)
/// the cumulative counters since boot are used.
pub fn utilization(previous: Option<&[CpuTimes]>, current: &[CpuTimes]) -> f64 {
    if current.is_empty() {
        return 0.0;
    }

    let previous = previous.filter(|p| p.len() == current.len());

    let sum: f64 = current
        .iter()
        .enumerate()
        .map(|(i, now)| {
            let (busy, idle) = match previous {
                Some(prev) => (
                    now.busy.saturating_sub(prev[i].busy),
                    now.idle.saturating_sub(prev[i].idle),
                ),
                None => (now.busy, now.idle),
            };
            let total = busy + idle;
            if total == 0 {
                0.0
            } else {
                busy as f64 / total as f64
            }
        })
        .sum();

    sum / current.len() as f64 * 100.0
}
