//! Service configuration
//!
//! Read once at startup from an optional `gallery.toml` in the working
//! directory and `GALLERY_*` environment variables (nested keys use `__`,
//! e.g. `GALLERY_SAMPLER__MEMORY__WARNING=1500`).

use anyhow::{Context, Result};
use gallery_lib::sampler::{
    ConfigError, SamplerConfig, Thresholds, DEFAULT_GROWTH_RATE_LIMIT,
    DEFAULT_GROWTH_STREAK_LIMIT, DEFAULT_HISTORY_CAPACITY,
};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct GalleryConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds open connections get to finish once shutdown starts
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// HS256 secret for session tokens; without it every `/api` request is rejected
    #[serde(default)]
    pub jwt_secret: Option<String>,

    #[serde(default)]
    pub sampler: SamplerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplerSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_growth_streak_limit")]
    pub growth_streak_limit: u32,

    #[serde(default = "default_growth_rate_limit")]
    pub growth_rate_limit: f64,

    #[serde(default)]
    pub memory: TierSettings,

    #[serde(default)]
    pub cpu: TierSettings,
}

/// Tier overrides; unset tiers keep the metric's defaults
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TierSettings {
    pub warning: Option<f64>,
    pub critical: Option<f64>,
    pub failure: Option<f64>,
}

impl TierSettings {
    fn thresholds(
        &self,
        metric: &'static str,
        defaults: Thresholds,
    ) -> Result<Thresholds, ConfigError> {
        Thresholds::new(
            metric,
            self.warning.unwrap_or(defaults.warning()),
            self.critical.unwrap_or(defaults.critical()),
            self.failure.unwrap_or(defaults.failure()),
        )
    }
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "media-gallery".to_string())
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    60
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_growth_streak_limit() -> u32 {
    DEFAULT_GROWTH_STREAK_LIMIT
}

fn default_growth_rate_limit() -> f64 {
    DEFAULT_GROWTH_RATE_LIMIT
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            history_capacity: default_history_capacity(),
            growth_streak_limit: default_growth_streak_limit(),
            growth_rate_limit: default_growth_rate_limit(),
            memory: TierSettings::default(),
            cpu: TierSettings::default(),
        }
    }
}

impl SamplerSettings {
    /// Validate and convert into the sampler's fixed configuration
    pub fn to_sampler_config(&self) -> Result<SamplerConfig, ConfigError> {
        let config = SamplerConfig {
            memory: self
                .memory
                .thresholds("memory", Thresholds::default_memory())?,
            cpu: self.cpu.thresholds("cpu", Thresholds::default_cpu())?,
            growth_streak_limit: self.growth_streak_limit,
            growth_rate_limit: self.growth_rate_limit,
            history_capacity: self.history_capacity,
            interval: Duration::from_secs(self.interval_secs),
        };
        config.validate()?;
        Ok(config)
    }
}

impl GalleryConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        Self::from_environment(
            config::Environment::with_prefix("GALLERY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
    }

    fn from_environment(environment: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("gallery").required(false))
            .add_source(environment)
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_from(vars: &[(&str, &str)]) -> Result<GalleryConfig> {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        GalleryConfig::from_environment(
            config::Environment::with_prefix("GALLERY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(Some(source)),
        )
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = load_from(&[]).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.shutdown_timeout_secs, 10);
        assert!(config.jwt_secret.is_none());

        let sampler = config.sampler.to_sampler_config().unwrap();
        assert_eq!(sampler.interval, Duration::from_secs(60));
        assert_eq!(sampler.history_capacity, 10);
        assert_eq!(sampler.memory, Thresholds::default_memory());
        assert_eq!(sampler.cpu, Thresholds::default_cpu());
    }

    #[test]
    fn test_environment_overrides() {
        let config = load_from(&[
            ("GALLERY_PORT", "9000"),
            ("GALLERY_JWT_SECRET", "s3cret"),
            ("GALLERY_SAMPLER__INTERVAL_SECS", "15"),
            ("GALLERY_SAMPLER__MEMORY__WARNING", "512"),
            ("GALLERY_SAMPLER__MEMORY__CRITICAL", "768"),
            ("GALLERY_SAMPLER__MEMORY__FAILURE", "1024"),
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.jwt_secret.as_deref(), Some("s3cret"));

        let sampler = config.sampler.to_sampler_config().unwrap();
        assert_eq!(sampler.interval, Duration::from_secs(15));
        assert_eq!(sampler.memory.warning(), 512.0);
        assert_eq!(sampler.memory.failure(), 1024.0);
    }

    #[test]
    fn test_unordered_tiers_fail_validation() {
        let config = load_from(&[
            ("GALLERY_SAMPLER__CPU__WARNING", "95"),
            ("GALLERY_SAMPLER__CPU__CRITICAL", "75"),
            ("GALLERY_SAMPLER__CPU__FAILURE", "90"),
        ])
        .unwrap();

        assert!(matches!(
            config.sampler.to_sampler_config(),
            Err(ConfigError::UnorderedTiers { metric: "cpu", .. })
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = load_from(&[("GALLERY_SAMPLER__INTERVAL_SECS", "0")]).unwrap();
        assert_eq!(
            config.sampler.to_sampler_config().unwrap_err(),
            ConfigError::ZeroInterval
        );
    }

    #[test]
    fn test_single_tier_override_keeps_other_defaults() {
        let config = load_from(&[("GALLERY_SAMPLER__MEMORY__WARNING", "1500")]).unwrap();

        let sampler = config.sampler.to_sampler_config().unwrap();
        assert_eq!(sampler.memory.warning(), 1500.0);
        assert_eq!(sampler.memory.critical(), 2048.0);
        assert_eq!(sampler.memory.failure(), 4096.0);
        assert_eq!(sampler.cpu, Thresholds::default_cpu());
    }

    #[test]
    fn test_single_tier_override_still_checks_ordering() {
        let config = load_from(&[("GALLERY_SAMPLER__CPU__WARNING", "80")]).unwrap();

        assert!(matches!(
            config.sampler.to_sampler_config(),
            Err(ConfigError::UnorderedTiers { metric: "cpu", .. })
        ));
    }

    #[test]
    fn test_zero_growth_streak_limit_rejected() {
        let config = load_from(&[("GALLERY_SAMPLER__GROWTH_STREAK_LIMIT", "0")]).unwrap();
        assert_eq!(
            config.sampler.to_sampler_config().unwrap_err(),
            ConfigError::ZeroGrowthStreak
        );
    }
}
