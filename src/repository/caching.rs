//! Principal attribute repository backed by the TTL cache

use crate::attributes::{merge, AttributeMap, MergingStrategy, Principal, ResolvedAttributes, ServiceContext};
use crate::cache::{AttributeCache, CacheStats};
use crate::error::{AttributeError, Result};
use crate::repository::{PrincipalAttributesRepository, RepositoryConfig, ResolutionSettings};
use crate::source::{AttributeSource, SourceFetcher};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Outcome of one miss, shared by every caller that joined it
type Flight = Arc<OnceCell<MissOutcome>>;

#[derive(Debug, Clone)]
enum MissOutcome {
    Resolved(Arc<AttributeMap>),
    /// Every contacted source failed; nothing was cached
    AllFailed {
        attempted: usize,
        degraded: Arc<AttributeMap>,
    },
}

impl MissOutcome {
    fn into_result(self, strict: bool) -> Result<Arc<AttributeMap>> {
        match self {
            MissOutcome::Resolved(attributes) => Ok(attributes),
            MissOutcome::AllFailed { attempted, .. } if strict => {
                Err(AttributeError::AllSourcesFailed { attempted })
            }
            MissOutcome::AllFailed { degraded, .. } => Ok(degraded),
        }
    }
}

/// Resolves principal attributes through a per-principal cache.
///
/// On a miss the allowed sources are queried concurrently, their results
/// merged into the principal's own attributes with the current strategy,
/// and the merged map cached for the configured TTL. A hit is returned as
/// is, even if the strategy or source filter changed since it was stored.
///
/// A miss on which every contacted source failed is never cached, so a
/// later strict call queries the sources again instead of reading the
/// degraded map.
pub struct CachingAttributeRepository {
    cache: AttributeCache,
    fetcher: SourceFetcher,
    settings: RwLock<Arc<ResolutionSettings>>,
    inflight: DashMap<String, Flight>,
    coalesce_misses: bool,
    closed: AtomicBool,
}

impl CachingAttributeRepository {
    pub fn new(config: RepositoryConfig, sources: Vec<Arc<dyn AttributeSource>>) -> Result<Self> {
        config.validate()?;

        let settings = ResolutionSettings::new(
            config.merging_strategy,
            config.attribute_repository_ids.clone(),
        );
        info!(
            "Creating caching attribute repository: {} sources, strategy {}, ttl {:?}",
            sources.len(),
            settings.merging_strategy,
            config.cache.ttl
        );

        Ok(Self {
            cache: AttributeCache::new(config.cache),
            fetcher: SourceFetcher::new(sources, config.source_timeout),
            settings: RwLock::new(Arc::new(settings)),
            inflight: DashMap::new(),
            coalesce_misses: config.coalesce_misses,
            closed: AtomicBool::new(false),
        })
    }

    /// Attributes of `principal` in presentation form.
    ///
    /// Never fails: unreachable sources contribute nothing and a closed
    /// repository answers with the principal's own attributes.
    pub async fn get_attributes(&self, principal: &Principal, _service: &ServiceContext) -> ResolvedAttributes {
        ResolvedAttributes::from(&*self.resolve(principal).await)
    }

    /// Like [`get_attributes`](Self::get_attributes), but reports failure
    /// instead of degrading.
    ///
    /// Errors with [`AttributeError::AllSourcesFailed`] when sources were
    /// queried and none answered, and with
    /// [`AttributeError::RepositoryClosed`] after [`close`](Self::close).
    /// Nothing is cached on error. Concurrent callers for the same
    /// principal share one fetch and therefore one failure.
    pub async fn try_get_attributes(
        &self,
        principal: &Principal,
        _service: &ServiceContext,
    ) -> Result<ResolvedAttributes> {
        let attributes = self.resolve_with(principal, true).await?;
        Ok(ResolvedAttributes::from(&*attributes))
    }

    /// Merged attributes of `principal` in sequence form
    pub async fn resolve(&self, principal: &Principal) -> Arc<AttributeMap> {
        match self.resolve_with(principal, false).await {
            Ok(attributes) => attributes,
            Err(e) => {
                warn!("Attribute resolution failed for {}: {}", principal.id, e);
                Arc::new(principal.attributes.clone())
            }
        }
    }

    /// Current resolution settings
    pub fn settings(&self) -> Arc<ResolutionSettings> {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Strategy used by subsequent cache misses
    pub fn set_merging_strategy(&self, strategy: MergingStrategy) {
        self.update_settings(|current| current.with_merging_strategy(strategy));
        info!("Attribute merging strategy set to {}", strategy);
    }

    /// Source filter used by subsequent cache misses
    pub fn set_attribute_repository_ids<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: BTreeSet<String> = ids.into_iter().map(Into::into).collect();
        info!("Attribute repository ids set to {:?}", ids);
        self.update_settings(move |current| current.with_attribute_repository_ids(ids));
    }

    /// Identifiers of every configured source, allowed or not
    pub fn available_source_ids(&self) -> BTreeSet<String> {
        self.fetcher.available_ids()
    }

    /// Drop the cached attributes of one principal
    pub fn invalidate(&self, principal_id: &str) -> bool {
        self.cache.invalidate(principal_id)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Release the cache. Idempotent; later calls degrade to the
    /// principal's own attributes.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.cache.close();
        self.inflight.clear();
        info!("Closed caching attribute repository");
    }

    fn update_settings<F>(&self, update: F)
    where
        F: FnOnce(&ResolutionSettings) -> ResolutionSettings,
    {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let next = update(&**settings);
        *settings = Arc::new(next);
    }

    async fn resolve_with(&self, principal: &Principal, strict: bool) -> Result<Arc<AttributeMap>> {
        if self.is_closed() {
            if strict {
                return Err(AttributeError::RepositoryClosed);
            }
            debug!("Repository closed, returning own attributes of {}", principal.id);
            return Ok(Arc::new(principal.attributes.clone()));
        }

        if let Some(cached) = self.cache.lookup(&principal.id) {
            return Ok(cached);
        }

        if !self.coalesce_misses {
            return self.run_miss(principal).await.into_result(strict);
        }

        let flight = InflightMiss::join(&self.inflight, &principal.id);
        let outcome = flight
            .cell
            .get_or_init(|| async {
                // Filled by a flight that finished while we joined this one
                if let Some(cached) = self.cache.peek(&principal.id) {
                    debug!("Coalesced miss served from cache: {}", principal.id);
                    return MissOutcome::Resolved(cached);
                }
                self.run_miss(principal).await
            })
            .await
            .clone();

        outcome.into_result(strict)
    }

    async fn run_miss(&self, principal: &Principal) -> MissOutcome {
        // One snapshot for the whole miss
        let settings = self.settings();

        let report = self
            .fetcher
            .fetch_allowed(&principal.id, &settings.attribute_repository_ids)
            .await;

        let fetched = report.combined();
        let merged = Arc::new(merge(&principal.attributes, &fetched, settings.merging_strategy));

        if report.all_failed() {
            warn!(
                "All {} attribute sources failed for {}, result not cached",
                report.attempted(),
                principal.id
            );
            return MissOutcome::AllFailed {
                attempted: report.attempted(),
                degraded: merged,
            };
        }

        debug!(
            "Merged {} fetched attributes into {} for {} using {}",
            fetched.len(),
            merged.len(),
            principal.id,
            settings.merging_strategy
        );
        self.cache.put(&principal.id, Arc::clone(&merged));
        MissOutcome::Resolved(merged)
    }
}

impl Drop for CachingAttributeRepository {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
impl PrincipalAttributesRepository for CachingAttributeRepository {
    async fn get_attributes(&self, principal: &Principal, service: &ServiceContext) -> ResolvedAttributes {
        CachingAttributeRepository::get_attributes(self, principal, service).await
    }

    fn close(&self) {
        CachingAttributeRepository::close(self);
    }
}

/// Membership in the per-principal miss flight; the map entry goes away
/// with the last member.
struct InflightMiss<'a> {
    inflight: &'a DashMap<String, Flight>,
    key: &'a str,
    cell: Flight,
}

impl<'a> InflightMiss<'a> {
    fn join(inflight: &'a DashMap<String, Flight>, key: &'a str) -> Self {
        let cell = Arc::clone(inflight.entry(key.to_string()).or_default().value());
        Self { inflight, key, cell }
    }
}

impl Drop for InflightMiss<'_> {
    fn drop(&mut self) {
        // Held by the map and by us only
        self.inflight.remove_if(self.key, |_, cell| {
            Arc::ptr_eq(cell, &self.cell) && Arc::strong_count(cell) == 2
        });
    }
}
