//! Filtered, timeout-bounded fetching from attribute sources

use crate::attributes::{combine_sources, AttributeMap};
use crate::error::AttributeError;
use crate::source::AttributeSource;
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Result of contacting one source
#[derive(Debug)]
pub enum FetchOutcome {
    /// The source returned attributes
    Fetched(AttributeMap),
    /// The source knows nothing about the principal
    Empty,
    /// The source failed, timed out or returned malformed data
    Failed(AttributeError),
}

impl FetchOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }
}

/// Outcomes of every contacted source, in configuration order
#[derive(Debug, Default)]
pub struct FetchReport {
    pub outcomes: Vec<(String, FetchOutcome)>,
}

impl FetchReport {
    /// Number of sources contacted
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of sources that failed
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_failure()).count()
    }

    /// At least one source was contacted and none succeeded
    pub fn all_failed(&self) -> bool {
        self.attempted() > 0 && self.failures() == self.attempted()
    }

    /// Combine successful results; later sources win on collisions
    pub fn combined(&self) -> AttributeMap {
        combine_sources(self.outcomes.iter().filter_map(|(_, outcome)| match outcome {
            FetchOutcome::Fetched(attributes) => Some(attributes),
            _ => None,
        }))
    }
}

/// Queries the configured sources that pass a source-id filter
pub struct SourceFetcher {
    sources: Vec<Arc<dyn AttributeSource>>,
    timeout: Duration,
}

impl SourceFetcher {
    pub fn new(sources: Vec<Arc<dyn AttributeSource>>, timeout: Duration) -> Self {
        Self { sources, timeout }
    }

    pub fn sources(&self) -> &[Arc<dyn AttributeSource>] {
        &self.sources
    }

    /// Every identifier the configured sources answer to
    pub fn available_ids(&self) -> BTreeSet<String> {
        self.sources.iter().flat_map(|s| s.ids()).collect()
    }

    /// Fetch from every source whose identifier is in `allowed`.
    ///
    /// Sources outside the filter are never contacted; an empty filter
    /// contacts nothing. Allowed sources are queried concurrently.
    pub async fn fetch_allowed(&self, principal_id: &str, allowed: &BTreeSet<String>) -> FetchReport {
        if allowed.is_empty() {
            debug!("Empty source filter, no source queried for {}", principal_id);
            return FetchReport::default();
        }

        let selected: Vec<&Arc<dyn AttributeSource>> = self
            .sources
            .iter()
            .filter(|source| {
                let selected = source.is_allowed(allowed);
                if !selected {
                    debug!("Skipping attribute source not in filter: {}", source.display_id());
                }
                selected
            })
            .collect();

        let outcomes = join_all(
            selected
                .into_iter()
                .map(|source| self.fetch_one(source.as_ref(), principal_id)),
        )
        .await;

        FetchReport { outcomes }
    }

    async fn fetch_one(&self, source: &dyn AttributeSource, principal_id: &str) -> (String, FetchOutcome) {
        let source_id = source.display_id();
        let start = Instant::now();

        let outcome = match tokio::time::timeout(self.timeout, source.fetch(principal_id)).await {
            Ok(Ok(Some(attributes))) => {
                debug!(
                    "Source {} returned {} attributes for {} in {:?}",
                    source_id,
                    attributes.len(),
                    principal_id,
                    start.elapsed()
                );
                FetchOutcome::Fetched(attributes)
            }
            Ok(Ok(None)) => {
                debug!("Source {} has no attributes for {}", source_id, principal_id);
                FetchOutcome::Empty
            }
            Ok(Err(e)) => {
                warn!("Attribute source {} failed for {}: {}", source_id, principal_id, e);
                let e = if e.is_source_failure() {
                    e
                } else {
                    AttributeError::SourceUnavailable {
                        source_id: source_id.clone(),
                        reason: e.to_string(),
                    }
                };
                FetchOutcome::Failed(e)
            }
            Err(_) => {
                let e = AttributeError::SourceTimeout {
                    source_id: source_id.clone(),
                    timeout_ms: self.timeout.as_millis() as u64,
                };
                warn!("{}", e);
                FetchOutcome::Failed(e)
            }
        };

        (source_id, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::attribute_map;
    use crate::error::Result;
    use crate::source::StaticAttributeSource;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingSource;

    #[async_trait]
    impl AttributeSource for FailingSource {
        fn ids(&self) -> Vec<String> {
            vec!["down".to_string()]
        }

        async fn fetch(&self, _principal_id: &str) -> Result<Option<AttributeMap>> {
            Err(AttributeError::SourceUnavailable {
                source_id: "down".to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    struct SlowSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AttributeSource for SlowSource {
        fn ids(&self) -> Vec<String> {
            vec!["slow".to_string()]
        }

        async fn fetch(&self, _principal_id: &str) -> Result<Option<AttributeMap>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Some(attribute_map([("late", vec!["yes"])])))
        }
    }

    fn allow(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_only_allowed_sources_contacted() {
        let first: Arc<dyn AttributeSource> =
            Arc::new(StaticAttributeSource::returning("first", attribute_map([("a", vec!["1"])])));
        let second: Arc<dyn AttributeSource> =
            Arc::new(StaticAttributeSource::returning("second", attribute_map([("b", vec!["2"])])));
        let fetcher = SourceFetcher::new(vec![first, second], Duration::from_secs(1));

        let report = fetcher.fetch_allowed("casuser", &allow(&["second"])).await;
        assert_eq!(report.attempted(), 1);
        assert_eq!(report.combined(), attribute_map([("b", vec!["2"])]));
    }

    #[tokio::test]
    async fn test_empty_filter_contacts_nothing() {
        let slow = Arc::new(SlowSource {
            calls: AtomicUsize::new(0),
        });
        let fetcher = SourceFetcher::new(
            vec![slow.clone() as Arc<dyn AttributeSource>],
            Duration::from_secs(1),
        );

        let report = fetcher.fetch_allowed("casuser", &BTreeSet::new()).await;
        assert_eq!(report.attempted(), 0);
        assert!(!report.all_failed());
        assert_eq!(slow.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_later_sources_win() {
        let first: Arc<dyn AttributeSource> = Arc::new(StaticAttributeSource::returning(
            "first",
            attribute_map([("mail", vec!["first@x"]), ("cn", vec!["First"])]),
        ));
        let second: Arc<dyn AttributeSource> = Arc::new(StaticAttributeSource::returning(
            "second",
            attribute_map([("mail", vec!["second@x"])]),
        ));
        let fetcher = SourceFetcher::new(vec![first, second], Duration::from_secs(1));

        let combined = fetcher
            .fetch_allowed("casuser", &allow(&["first", "second"]))
            .await
            .combined();
        assert_eq!(combined["mail"], vec![json!("second@x")]);
        assert_eq!(combined["cn"], vec![json!("First")]);
    }

    #[tokio::test]
    async fn test_failure_contributes_nothing() {
        let ok: Arc<dyn AttributeSource> =
            Arc::new(StaticAttributeSource::returning("ok", attribute_map([("a", vec!["1"])])));
        let down: Arc<dyn AttributeSource> = Arc::new(FailingSource);
        let fetcher = SourceFetcher::new(vec![ok, down], Duration::from_secs(1));

        let report = fetcher.fetch_allowed("casuser", &allow(&["ok", "down"])).await;
        assert_eq!(report.failures(), 1);
        assert!(!report.all_failed());
        assert_eq!(report.combined(), attribute_map([("a", vec!["1"])]));
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let slow: Arc<dyn AttributeSource> = Arc::new(SlowSource {
            calls: AtomicUsize::new(0),
        });
        let fetcher = SourceFetcher::new(vec![slow], Duration::from_millis(50));

        let report = fetcher.fetch_allowed("casuser", &allow(&["slow"])).await;
        assert!(report.all_failed());
        assert!(matches!(
            report.outcomes[0].1,
            FetchOutcome::Failed(AttributeError::SourceTimeout { timeout_ms: 50, .. })
        ));
        assert!(report.combined().is_empty());
    }

    #[test]
    fn test_available_ids() {
        let fetcher = SourceFetcher::new(
            vec![
                Arc::new(StaticAttributeSource::new("ldap")) as Arc<dyn AttributeSource>,
                Arc::new(StaticAttributeSource::with_ids(vec!["jdbc".to_string(), "db".to_string()]))
                    as Arc<dyn AttributeSource>,
            ],
            Duration::from_secs(1),
        );
        assert_eq!(fetcher.available_ids(), allow(&["db", "jdbc", "ldap"]));
    }
}
