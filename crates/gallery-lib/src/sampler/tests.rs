//! Classification tests driving the sampler with scripted readings

use super::*;
use crate::gc::Collector;
use crate::health::{ComponentStatus, HealthRegistry};
use crate::models::RawUsage;
use crate::probe::ScriptedProbe;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Collector that counts invocations
struct CountingCollector {
    calls: AtomicUsize,
    reclaims: bool,
}

impl CountingCollector {
    fn new(reclaims: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reclaims,
        }
    }
}

impl Collector for CountingCollector {
    fn collect(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reclaims
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

fn sampler_with(config: SamplerConfig, probe: ScriptedProbe) -> HealthSampler {
    HealthSampler::new(config, Box::new(probe)).unwrap()
}

fn heap_sampler(heap_mb: impl IntoIterator<Item = u64>) -> HealthSampler {
    sampler_with(SamplerConfig::default(), ScriptedProbe::from_heap_mb(heap_mb))
}

async fn run_ticks(sampler: &HealthSampler, n: usize) -> Vec<TickReport> {
    let mut reports = Vec::with_capacity(n);
    for _ in 0..n {
        reports.push(sampler.tick().await);
    }
    reports
}

#[tokio::test]
async fn test_first_sample_has_zero_growth() {
    let sampler = heap_sampler([500]);
    let report = sampler.tick().await;

    assert_eq!(report.growth_percent, 0.0);
    assert!(report.signals.is_empty());
    assert_eq!(sampler.counters().await.growth_count, 0);
}

#[tokio::test]
async fn test_history_keeps_most_recent_ten() {
    // Strictly decreasing so no growth or tier signal fires
    let script: Vec<u64> = (0..25).map(|i| 500 - i).collect();
    let sampler = heap_sampler(script.clone());

    for _ in 0..25 {
        sampler.tick().await;
        let snapshot = sampler.snapshot().await;
        assert!(snapshot.history.memory.len() <= 10);
        assert!(snapshot.history.cpu.len() <= 10);
    }

    let snapshot = sampler.snapshot().await;
    let heap: Vec<u64> = snapshot.history.memory.iter().map(|r| r.heap_used_mb).collect();
    assert_eq!(heap, script[15..].to_vec());
    assert_eq!(snapshot.history.cpu.len(), 10);
}

#[tokio::test]
async fn test_growth_counter_resets_on_flat_or_falling_heap() {
    let sampler = heap_sampler([100, 101, 102, 102, 103, 101]);

    run_ticks(&sampler, 3).await;
    assert_eq!(sampler.counters().await.growth_count, 2);

    sampler.tick().await; // equal
    assert_eq!(sampler.counters().await.growth_count, 0);

    sampler.tick().await;
    assert_eq!(sampler.counters().await.growth_count, 1);

    sampler.tick().await; // falling
    assert_eq!(sampler.counters().await.growth_count, 0);
}

#[tokio::test]
async fn test_exactly_twenty_percent_growth_does_not_flag() {
    let sampler = heap_sampler([100, 120]);
    let reports = run_ticks(&sampler, 2).await;

    assert!((reports[1].growth_percent - 20.0).abs() < 1e-9);
    assert!(!reports[1].leak_suspected());
    assert!(reports[1].corrective_triggers().is_empty());
}

#[tokio::test]
async fn test_growth_above_twenty_percent_flags_immediately() {
    let sampler = heap_sampler([100, 121]);
    let reports = run_ticks(&sampler, 2).await;

    assert!(reports[1].leak_suspected());
    assert_eq!(reports[1].corrective_triggers(), vec![Trigger::LeakSpike]);
    assert_eq!(sampler.counters().await, SamplerCounters::default());
    assert!(sampler.snapshot().await.history.memory.is_empty());
}

#[tokio::test]
async fn test_steep_sequence_flags_at_first_step_over_limit() {
    let sampler = heap_sampler([100, 120, 145, 175, 215]);
    let reports = run_ticks(&sampler, 3).await;

    // 100 -> 120 is exactly 20%, 120 -> 145 is 20.8%
    assert!(!reports[1].leak_suspected());
    assert!(reports[2].leak_suspected());
    assert_eq!(reports[2].corrective_triggers(), vec![Trigger::LeakSpike]);
}

#[tokio::test]
async fn test_consecutive_growth_streak_flags_leak() {
    // Baseline followed by five small increases
    let sampler = heap_sampler([100, 101, 102, 103, 104, 105]);
    let reports = run_ticks(&sampler, 6).await;

    for report in &reports[..5] {
        assert!(!report.leak_suspected());
    }
    assert!(reports[5].growth_percent <= 20.0);
    assert!(reports[5].leak_suspected());
    assert_eq!(reports[5].corrective_triggers(), vec![Trigger::LeakStreak]);
    assert!(matches!(
        reports[5].signals[0],
        Signal::LeakSuspected { growth_count: 5, .. }
    ));

    // Corrective action reset the streak before the next query
    assert!(!sampler.snapshot().await.potential_leak);
}

#[tokio::test]
async fn test_failure_tier_corrects_on_single_reading() {
    let collector = Arc::new(CountingCollector::new(true));
    let sampler = heap_sampler([4096]).with_collector(collector.clone());

    let report = sampler.tick().await;

    assert_eq!(report.memory_tier, Tier::Failure);
    assert_eq!(report.corrective_triggers(), vec![Trigger::MemoryFailure]);
    assert!(report.signals.contains(&Signal::CorrectiveAction {
        trigger: Trigger::MemoryFailure,
        reclaimed: true,
    }));
    assert_eq!(collector.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_critical_tier_requires_two_consecutive_readings() {
    let sampler = heap_sampler([2048, 2048]);

    let first = sampler.tick().await;
    assert_eq!(first.memory_tier, Tier::Critical);
    assert!(first.corrective_triggers().is_empty());
    assert_eq!(sampler.counters().await.high_memory_count, 1);

    let second = sampler.tick().await;
    assert_eq!(second.corrective_triggers(), vec![Trigger::MemoryCritical]);
    assert_eq!(sampler.counters().await.high_memory_count, 0);
}

#[tokio::test]
async fn test_reading_below_warning_resets_high_memory_count() {
    // Wide growth limit so the jumps are not treated as leaks
    let config = SamplerConfig {
        growth_rate_limit: 1_000.0,
        ..Default::default()
    };
    let sampler = sampler_with(config, ScriptedProbe::from_heap_mb([2048, 500, 2048]));

    let reports = run_ticks(&sampler, 3).await;

    assert!(reports.iter().all(|r| r.corrective_triggers().is_empty()));
    assert_eq!(sampler.counters().await.high_memory_count, 1);
}

#[tokio::test]
async fn test_warning_tier_keeps_high_memory_count() {
    let config = SamplerConfig {
        growth_rate_limit: 1_000.0,
        ..Default::default()
    };
    let sampler = sampler_with(config, ScriptedProbe::from_heap_mb([2048, 1500, 2048]));

    let reports = run_ticks(&sampler, 3).await;

    assert_eq!(reports[1].memory_tier, Tier::Warning);
    assert_eq!(reports[2].corrective_triggers(), vec![Trigger::MemoryCritical]);
}

#[tokio::test]
async fn test_cpu_failure_clears_cpu_history_only() {
    let readings = vec![
        RawUsage::from_heap_mb(300, 10.0),
        RawUsage::from_heap_mb(299, 20.0),
        RawUsage::from_heap_mb(298, 95.0),
    ];
    let collector = Arc::new(CountingCollector::new(false));
    let sampler = sampler_with(SamplerConfig::default(), ScriptedProbe::new(readings))
        .with_collector(collector.clone());

    let reports = run_ticks(&sampler, 3).await;

    assert_eq!(reports[2].cpu_tier, Tier::Failure);
    assert!(reports[2].signals.contains(&Signal::CpuHistoryCleared));
    assert!(reports[2].corrective_triggers().is_empty());
    assert_eq!(collector.calls.load(Ordering::SeqCst), 0);

    let snapshot = sampler.snapshot().await;
    assert!(snapshot.history.cpu.is_empty());
    assert_eq!(snapshot.history.memory.len(), 3);
    assert_eq!(snapshot.current.unwrap().cpu_usage, 95.0);
}

#[tokio::test]
async fn test_cpu_lower_tiers_only_signal() {
    let readings = vec![
        RawUsage::from_heap_mb(300, 60.0),
        RawUsage::from_heap_mb(300, 80.0),
    ];
    let sampler = sampler_with(SamplerConfig::default(), ScriptedProbe::new(readings));

    let reports = run_ticks(&sampler, 2).await;

    assert_eq!(reports[0].signals, vec![Signal::CpuTier(Tier::Warning)]);
    assert_eq!(reports[1].signals, vec![Signal::CpuTier(Tier::Critical)]);
    assert_eq!(sampler.snapshot().await.history.cpu.len(), 2);
}

#[tokio::test]
async fn test_corrective_action_without_reclaim_still_resets() {
    let sampler = heap_sampler([100, 101, 102]);
    run_ticks(&sampler, 3).await;
    assert_eq!(sampler.counters().await.growth_count, 2);

    let reclaimed = sampler.corrective_action(Trigger::Manual).await;

    assert!(!reclaimed);
    assert_eq!(sampler.counters().await, SamplerCounters::default());
    let snapshot = sampler.snapshot().await;
    assert!(snapshot.history.memory.is_empty());
    assert!(snapshot.history.cpu.is_empty());
    // The latest reading survives a history clear
    assert_eq!(snapshot.current.unwrap().reading.heap_used_mb, 102);
}

#[tokio::test]
async fn test_after_clear_next_sample_has_no_previous() {
    let sampler = heap_sampler([100, 121, 130]);
    run_ticks(&sampler, 2).await; // spike clears history

    let report = sampler.tick().await;
    assert_eq!(report.growth_percent, 0.0);
    assert_eq!(sampler.counters().await.growth_count, 0);
}

#[tokio::test]
async fn test_snapshot_before_first_tick() {
    let sampler = heap_sampler([100]);
    let snapshot = sampler.snapshot().await;

    assert!(snapshot.current.is_none());
    assert!(snapshot.history.memory.is_empty());
    assert!(!snapshot.potential_leak);
    assert_eq!(snapshot.thresholds.memory.failure, 4096.0);
    assert_eq!(snapshot.thresholds.cpu.warning, 60.0);
}

#[tokio::test]
async fn test_sampler_reports_to_health_registry() {
    let registry = HealthRegistry::new();
    let sampler = heap_sampler([4096]).with_health_registry(registry.clone());

    assert!(!registry.readiness().await.ready);
    sampler.tick().await;

    let health = registry.health().await;
    assert_eq!(
        health.components[components::MEMORY].status,
        ComponentStatus::Unhealthy
    );
    assert_eq!(
        health.components[components::CPU].status,
        ComponentStatus::Healthy
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_snapshot_never_observes_torn_tick() {
    let script: Vec<u64> = (0..200).map(|i| 1000 - i).collect();
    let sampler = Arc::new(heap_sampler(script));

    let writer = {
        let sampler = sampler.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                sampler.tick().await;
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let sampler = sampler.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..200 {
                let snapshot = sampler.snapshot().await;
                assert!(snapshot.history.memory.len() <= 10);
                assert_eq!(snapshot.history.memory.len(), snapshot.history.cpu.len());
                if let (Some(current), Some(last)) =
                    (snapshot.current, snapshot.history.memory.last())
                {
                    assert_eq!(current.reading, *last);
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}
