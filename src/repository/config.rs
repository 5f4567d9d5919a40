//! Configuration for the caching attribute repository

use crate::attributes::MergingStrategy;
use crate::cache::{CacheConfig, TtlUnit};
use crate::error::{AttributeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const ENV_CACHE_TTL: &str = "ATTRIBUTE_CACHE_TTL";
pub const ENV_CACHE_TTL_UNIT: &str = "ATTRIBUTE_CACHE_TTL_UNIT";
pub const ENV_MERGING_STRATEGY: &str = "ATTRIBUTE_MERGING_STRATEGY";
pub const ENV_REPOSITORY_IDS: &str = "ATTRIBUTE_REPOSITORY_IDS";
pub const ENV_SOURCE_TIMEOUT_MS: &str = "ATTRIBUTE_SOURCE_TIMEOUT_MS";
pub const ENV_CLEANUP_INTERVAL_SECS: &str = "ATTRIBUTE_CACHE_CLEANUP_INTERVAL_SECS";

/// Configuration for [`CachingAttributeRepository`](super::CachingAttributeRepository)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Cache settings; the TTL is fixed for the life of the repository
    pub cache: CacheConfig,

    /// Initial merging strategy
    pub merging_strategy: MergingStrategy,

    /// Initial source filter; empty means no source is queried
    pub attribute_repository_ids: BTreeSet<String>,

    /// Upper bound on a single source fetch
    pub source_timeout: Duration,

    /// Run one miss path per principal at a time
    pub coalesce_misses: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            merging_strategy: MergingStrategy::default(),
            attribute_repository_ids: BTreeSet::new(),
            source_timeout: Duration::from_secs(5),
            coalesce_misses: true,
        }
    }
}

impl RepositoryConfig {
    pub fn builder() -> RepositoryConfigBuilder {
        RepositoryConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;

        if self.source_timeout.is_zero() {
            return Err(AttributeError::ConfigError(
                "source_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load the configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first when present.
    /// Unset variables keep their defaults; malformed ones are a
    /// [`AttributeError::ConfigError`].
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        let mut cache = CacheConfig::builder();

        let unit = match lookup(ENV_CACHE_TTL_UNIT) {
            Some(raw) => TtlUnit::from_str(&raw)?,
            None => TtlUnit::Seconds,
        };
        if let Some(raw) = lookup(ENV_CACHE_TTL) {
            cache = cache.ttl(parse_number(ENV_CACHE_TTL, &raw)?, unit);
        }
        if let Some(raw) = lookup(ENV_CLEANUP_INTERVAL_SECS) {
            let secs = parse_number(ENV_CLEANUP_INTERVAL_SECS, &raw)?;
            cache = cache.cleanup_interval(Duration::from_secs(secs));
        }
        builder = builder.cache(cache.build()?);

        if let Some(raw) = lookup(ENV_MERGING_STRATEGY) {
            builder = builder.merging_strategy(MergingStrategy::from_str(&raw)?);
        }
        if let Some(raw) = lookup(ENV_REPOSITORY_IDS) {
            builder = builder.attribute_repository_ids(parse_ids(&raw));
        }
        if let Some(raw) = lookup(ENV_SOURCE_TIMEOUT_MS) {
            let millis = parse_number(ENV_SOURCE_TIMEOUT_MS, &raw)?;
            builder = builder.source_timeout(Duration::from_millis(millis));
        }

        let config = builder.build()?;
        debug!("Loaded repository config from environment: {:?}", config);
        Ok(config)
    }
}

fn parse_number(name: &str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|e| {
        AttributeError::ConfigError(format!("invalid value for {}: {:?} ({})", name, raw, e))
    })
}

fn parse_ids(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builder for repository configuration with validation
#[derive(Debug, Default)]
pub struct RepositoryConfigBuilder {
    cache: Option<CacheConfig>,
    merging_strategy: Option<MergingStrategy>,
    attribute_repository_ids: Option<BTreeSet<String>>,
    source_timeout: Option<Duration>,
    coalesce_misses: Option<bool>,
}

impl RepositoryConfigBuilder {
    /// Use a complete cache configuration
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Default cache configuration with the given TTL
    pub fn ttl(mut self, duration: u64, unit: TtlUnit) -> Self {
        let mut cache = self.cache.take().unwrap_or_default();
        cache.ttl = unit.to_duration(duration);
        self.cache = Some(cache);
        self
    }

    pub fn merging_strategy(mut self, strategy: MergingStrategy) -> Self {
        self.merging_strategy = Some(strategy);
        self
    }

    pub fn attribute_repository_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_repository_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = Some(timeout);
        self
    }

    pub fn coalesce_misses(mut self, enable: bool) -> Self {
        self.coalesce_misses = Some(enable);
        self
    }

    /// Build and validate the repository configuration
    pub fn build(self) -> Result<RepositoryConfig> {
        let defaults = RepositoryConfig::default();

        let config = RepositoryConfig {
            cache: self.cache.unwrap_or(defaults.cache),
            merging_strategy: self.merging_strategy.unwrap_or(defaults.merging_strategy),
            attribute_repository_ids: self
                .attribute_repository_ids
                .unwrap_or(defaults.attribute_repository_ids),
            source_timeout: self.source_timeout.unwrap_or(defaults.source_timeout),
            coalesce_misses: self.coalesce_misses.unwrap_or(defaults.coalesce_misses),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = RepositoryConfig::default();
        assert_eq!(config.merging_strategy, MergingStrategy::Multivalued);
        assert!(config.attribute_repository_ids.is_empty());
        assert!(config.coalesce_misses);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = RepositoryConfig::builder()
            .ttl(100, TtlUnit::Milliseconds)
            .merging_strategy(MergingStrategy::Replace)
            .attribute_repository_ids(["Stub", "ldap"])
            .source_timeout(Duration::from_millis(250))
            .coalesce_misses(false)
            .build()
            .unwrap();

        assert_eq!(config.cache.ttl, Duration::from_millis(100));
        assert_eq!(config.merging_strategy, MergingStrategy::Replace);
        assert!(config.attribute_repository_ids.contains("Stub"));
        assert_eq!(config.source_timeout, Duration::from_millis(250));
        assert!(!config.coalesce_misses);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = RepositoryConfig::builder()
            .ttl(0, TtlUnit::Seconds)
            .build()
            .unwrap_err();
        assert!(matches!(err, AttributeError::ConfigError(_)));

        let err = RepositoryConfig::builder()
            .source_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, AttributeError::ConfigError(_)));
    }

    #[test]
    fn test_from_lookup() {
        let config = RepositoryConfig::from_lookup(lookup_from(&[
            (ENV_CACHE_TTL, "30"),
            (ENV_CACHE_TTL_UNIT, "minutes"),
            (ENV_MERGING_STRATEGY, "add"),
            (ENV_REPOSITORY_IDS, " Stub, ldap ,,"),
            (ENV_SOURCE_TIMEOUT_MS, "1500"),
            (ENV_CLEANUP_INTERVAL_SECS, "60"),
        ]))
        .unwrap();

        assert_eq!(config.cache.ttl, Duration::from_secs(1800));
        assert_eq!(config.cache.cleanup_interval, Duration::from_secs(60));
        assert_eq!(config.merging_strategy, MergingStrategy::Add);
        assert_eq!(
            config.attribute_repository_ids,
            ["Stub".to_string(), "ldap".to_string()].into_iter().collect()
        );
        assert_eq!(config.source_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = RepositoryConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.cache.ttl, CacheConfig::default().ttl);
        assert_eq!(config.source_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_lookup_malformed() {
        let result = RepositoryConfig::from_lookup(lookup_from(&[(ENV_CACHE_TTL, "soon")]));
        assert!(matches!(result, Err(AttributeError::ConfigError(_))));

        let result = RepositoryConfig::from_lookup(lookup_from(&[(ENV_MERGING_STRATEGY, "union")]));
        assert!(matches!(result, Err(AttributeError::ConfigError(_))));

        let result = RepositoryConfig::from_lookup(lookup_from(&[(ENV_CACHE_TTL_UNIT, "weeks")]));
        assert!(matches!(result, Err(AttributeError::ConfigError(_))));
    }

    #[test]
    fn test_serde_roundtrip_keeps_strategy_name() {
        let config = RepositoryConfig::builder()
            .merging_strategy(MergingStrategy::Replace)
            .build()
            .unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["merging_strategy"], "REPLACE");
    }
}
