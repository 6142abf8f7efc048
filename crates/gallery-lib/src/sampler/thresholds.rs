//! Three-tier threshold configuration
//!
//! Tiers are fixed at process start and validated once, so the sampler can
//! classify readings without re-checking ordering on every tick.

use crate::models::{ThresholdValues, TierValues};
use std::time::Duration;
use thiserror::Error;

/// Default rolling history capacity
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Consecutive heap increases that count as a suspected leak
pub const DEFAULT_GROWTH_STREAK_LIMIT: u32 = 5;

/// Single-step heap growth (percent) that counts as a suspected leak
pub const DEFAULT_GROWTH_RATE_LIMIT: f64 = 20.0;

/// Consecutive critical-tier memory readings before corrective action
pub const CRITICAL_STREAK_LIMIT: u32 = 2;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error(
        "{metric} thresholds must satisfy warning < critical < failure \
         (got {warning}, {critical}, {failure})"
    )]
    UnorderedTiers {
        metric: &'static str,
        warning: f64,
        critical: f64,
        failure: f64,
    },

    #[error("history capacity must be at least 1")]
    EmptyHistory,

    #[error("sampling interval must be non-zero")]
    ZeroInterval,

    #[error("growth streak limit must be at least 1")]
    ZeroGrowthStreak,

    #[error("growth rate limit must be a finite positive percentage (got {0})")]
    InvalidGrowthRate(f64),
}

/// Severity tier a reading falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Normal,
    Warning,
    Critical,
    Failure,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Normal => "normal",
            Tier::Warning => "warning",
            Tier::Critical => "critical",
            Tier::Failure => "failure",
        }
    }
}

/// Ordered warning < critical < failure tiers for one metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    warning: f64,
    critical: f64,
    failure: f64,
}

impl Thresholds {
    pub fn new(
        metric: &'static str,
        warning: f64,
        critical: f64,
        failure: f64,
    ) -> Result<Self, ConfigError> {
        // NaN fails both comparisons, so it is rejected here too
        if !(warning < critical && critical < failure) {
            return Err(ConfigError::UnorderedTiers {
                metric,
                warning,
                critical,
                failure,
            });
        }

        Ok(Self {
            warning,
            critical,
            failure,
        })
    }

    /// Memory tiers in MB: 1024 / 2048 / 4096
    pub fn default_memory() -> Self {
        Self {
            warning: 1024.0,
            critical: 2048.0,
            failure: 4096.0,
        }
    }

    /// CPU tiers in percent: 60 / 75 / 90
    pub fn default_cpu() -> Self {
        Self {
            warning: 60.0,
            critical: 75.0,
            failure: 90.0,
        }
    }

    pub fn warning(&self) -> f64 {
        self.warning
    }

    pub fn critical(&self) -> f64 {
        self.critical
    }

    pub fn failure(&self) -> f64 {
        self.failure
    }

    /// Classify a value; reaching a tier boundary counts as being in that tier
    pub fn classify(&self, value: f64) -> Tier {
        if value >= self.failure {
            Tier::Failure
        } else if value >= self.critical {
            Tier::Critical
        } else if value >= self.warning {
            Tier::Warning
        } else {
            Tier::Normal
        }
    }

    pub fn values(&self) -> TierValues {
        TierValues {
            warning: self.warning,
            critical: self.critical,
            failure: self.failure,
        }
    }
}

/// Complete sampler configuration, fixed for the process lifetime
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub memory: Thresholds,
    pub cpu: Thresholds,
    pub growth_streak_limit: u32,
    pub growth_rate_limit: f64,
    pub history_capacity: usize,
    pub interval: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            memory: Thresholds::default_memory(),
            cpu: Thresholds::default_cpu(),
            growth_streak_limit: DEFAULT_GROWTH_STREAK_LIMIT,
            growth_rate_limit: DEFAULT_GROWTH_RATE_LIMIT,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            interval: Duration::from_secs(60),
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.growth_streak_limit == 0 {
            return Err(ConfigError::ZeroGrowthStreak);
        }
        if !(self.growth_rate_limit.is_finite() && self.growth_rate_limit > 0.0) {
            return Err(ConfigError::InvalidGrowthRate(self.growth_rate_limit));
        }
        Ok(())
    }

    pub fn threshold_values(&self) -> ThresholdValues {
        ThresholdValues {
            memory: self.memory.values(),
            cpu: self.cpu.values(),
        }
    }
}
