//! Shared fixtures for integration tests

#![allow(dead_code)]

use principal_attributes::{
    attribute_map, AttributeMap, AttributeSource, CachingAttributeRepository, MergingStrategy,
    Principal, RepositoryConfig, ServiceContext, StaticAttributeSource,
};
use std::sync::{Arc, Once};
use std::time::Duration;

static TRACING: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` controls verbosity
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn stub_attributes() -> AttributeMap {
    attribute_map([
        ("a1", vec!["v1", "v2", "v3"]),
        ("mail", vec!["final@example.com"]),
        ("a6", vec!["v16", "v26", "v63"]),
        ("a2", vec!["v4"]),
        ("username", vec!["uid"]),
    ])
}

pub fn stub_source() -> Arc<StaticAttributeSource> {
    Arc::new(StaticAttributeSource::returning("Stub", stub_attributes()))
}

pub fn principal() -> Principal {
    Principal::new("casuser").attribute("mail", ["final@school.com"])
}

pub fn service() -> ServiceContext {
    ServiceContext::new("https://app.example.org").with_name("Example")
}

pub fn repository_with(
    ttl: Duration,
    strategy: MergingStrategy,
    ids: &[&str],
    sources: Vec<Arc<dyn AttributeSource>>,
) -> CachingAttributeRepository {
    init_tracing();
    let config = RepositoryConfig::builder()
        .cache(
            principal_attributes::CacheConfig::builder()
                .ttl_duration(ttl)
                .enable_auto_cleanup(false)
                .build()
                .expect("valid cache config"),
        )
        .merging_strategy(strategy)
        .attribute_repository_ids(ids.iter().copied())
        .source_timeout(Duration::from_secs(2))
        .build()
        .expect("valid repository config");
    CachingAttributeRepository::new(config, sources).expect("repository")
}
