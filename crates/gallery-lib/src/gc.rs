//! Best-effort memory reclamation hooks used by corrective action
//!
//! There is no tracing garbage collector to force, so the closest
//! equivalent is asking the allocator to hand free pages back to the OS.
//! Targets without such a hook use [`NoopCollector`].

use std::sync::Arc;

/// Optional reclamation capability run by corrective action
pub trait Collector: Send + Sync {
    /// Attempt to reclaim memory. Returns true if anything was released.
    ///
    /// Must never panic or block for long; callers treat `false` as
    /// "history clear only".
    fn collect(&self) -> bool;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Collector that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCollector;

impl Collector for NoopCollector {
    fn collect(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Returns free heap pages to the OS through glibc `malloc_trim`
#[derive(Debug, Default, Clone, Copy)]
pub struct MallocTrimCollector;

impl Collector for MallocTrimCollector {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    fn collect(&self) -> bool {
        // SAFETY: malloc_trim only walks allocator arenas and has no
        // preconditions on the caller.
        unsafe { libc::malloc_trim(0) == 1 }
    }

    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    fn collect(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "malloc_trim"
    }
}

/// Pick the best collector available on this target
pub fn platform_collector() -> Arc<dyn Collector> {
    if cfg!(all(target_os = "linux", target_env = "gnu")) {
        Arc::new(MallocTrimCollector)
    } else {
        Arc::new(NoopCollector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_collector_reclaims_nothing() {
        assert!(!NoopCollector.collect());
        assert_eq!(NoopCollector.name(), "noop");
    }

    #[test]
    fn test_malloc_trim_does_not_panic() {
        let _ = MallocTrimCollector.collect();
    }

    #[test]
    fn test_platform_collector_name() {
        let collector = platform_collector();
        if cfg!(all(target_os = "linux", target_env = "gnu")) {
            assert_eq!(collector.name(), "malloc_trim");
        } else {
            assert_eq!(collector.name(), "noop");
        }
    }
}
