//! Configuration for the attribute cache

use crate::error::{AttributeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Unit in which a cache TTL is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TtlUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TtlUnit {
    /// Convert `amount` of this unit into a duration
    pub fn to_duration(self, amount: u64) -> Duration {
        match self {
            TtlUnit::Milliseconds => Duration::from_millis(amount),
            TtlUnit::Seconds => Duration::from_secs(amount),
            TtlUnit::Minutes => Duration::from_secs(amount.saturating_mul(60)),
            TtlUnit::Hours => Duration::from_secs(amount.saturating_mul(3600)),
            TtlUnit::Days => Duration::from_secs(amount.saturating_mul(86_400)),
        }
    }
}

impl fmt::Display for TtlUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TtlUnit::Milliseconds => "MILLISECONDS",
            TtlUnit::Seconds => "SECONDS",
            TtlUnit::Minutes => "MINUTES",
            TtlUnit::Hours => "HOURS",
            TtlUnit::Days => "DAYS",
        };
        f.write_str(name)
    }
}

impl FromStr for TtlUnit {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MILLISECONDS" | "MILLIS" | "MS" => Ok(TtlUnit::Milliseconds),
            "SECONDS" | "SECS" | "S" => Ok(TtlUnit::Seconds),
            "MINUTES" | "MINS" | "M" => Ok(TtlUnit::Minutes),
            "HOURS" | "H" => Ok(TtlUnit::Hours),
            "DAYS" | "D" => Ok(TtlUnit::Days),
            other => Err(AttributeError::ConfigError(format!(
                "unknown TTL unit: {}",
                other
            ))),
        }
    }
}

/// Configuration for the attribute cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live of a cached attribute map
    pub ttl: Duration,

    /// Periodically remove expired entries in the background
    pub enable_auto_cleanup: bool,

    /// Interval for automatic cleanup checks
    pub cleanup_interval: Duration,

    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            // 8 hours, the usual lifetime of an SSO session
            ttl: Duration::from_secs(8 * 3600),
            enable_auto_cleanup: true,
            cleanup_interval: Duration::from_secs(300),
            enable_metrics: true,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Default configuration with a TTL of `duration` `unit`s
    pub fn with_ttl(duration: u64, unit: TtlUnit) -> Result<Self> {
        Self::builder().ttl(duration, unit).build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(AttributeError::ConfigError(
                "cache TTL must be greater than 0".to_string(),
            ));
        }

        if self.enable_auto_cleanup && self.cleanup_interval.is_zero() {
            return Err(AttributeError::ConfigError(
                "cleanup_interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for cache configuration with validation
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    ttl: Option<Duration>,
    enable_auto_cleanup: Option<bool>,
    cleanup_interval: Option<Duration>,
    enable_metrics: Option<bool>,
}

impl CacheConfigBuilder {
    /// Set the TTL as an amount of a unit
    pub fn ttl(mut self, duration: u64, unit: TtlUnit) -> Self {
        self.ttl = Some(unit.to_duration(duration));
        self
    }

    /// Set the TTL directly
    pub fn ttl_duration(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Enable or disable automatic cleanup
    pub fn enable_auto_cleanup(mut self, enable: bool) -> Self {
        self.enable_auto_cleanup = Some(enable);
        self
    }

    /// Set cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Enable or disable metrics collection
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Build and validate the cache configuration
    pub fn build(self) -> Result<CacheConfig> {
        let defaults = CacheConfig::default();

        let config = CacheConfig {
            ttl: self.ttl.unwrap_or(defaults.ttl),
            enable_auto_cleanup: self
                .enable_auto_cleanup
                .unwrap_or(defaults.enable_auto_cleanup),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
            enable_metrics: self.enable_metrics.unwrap_or(defaults.enable_metrics),
        };

        config.validate()?;
        Ok(config)
    }
}
