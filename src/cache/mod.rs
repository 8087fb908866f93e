//! Backend-paged cache.
//!
//! Fronts a remote page-fetch function with two single-entry caches: the
//! last fetched page (keyed over window, filter and sort) and the last known
//! total count (keyed over filter and sort only). Every page fetch also
//! refreshes the count slot, so paging within one filter never pays for a
//! separate count round trip.
//!
//! Slots hold `Arc` snapshots that are swapped whole. Locks guard only the
//! swap, never the backend call, so concurrent callers may race: the last
//! writer owns the slot, but every caller gets the page for its own query.

mod backend;
mod entry;

pub use backend::{backend_fn, count_fn, BackendCount, BackendFetch, FnBackend, FnCount};
pub use entry::{CacheEntry, CacheStats, CountCacheEntry};

use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace, warn};

use crate::error::{GridError, GridResult};
use crate::query::{Query, QueryKeyCodec};
use crate::source::{ChangeListener, DataChange, DataSource, ListenerRegistry, Subscription};
use entry::AtomicCacheStats;

pub struct BackendPagedCache<T, F> {
    backend: Arc<dyn BackendFetch<T, F>>,
    count_backend: Option<Arc<dyn BackendCount<F>>>,
    codec: QueryKeyCodec<F>,
    filter: RwLock<Option<F>>,
    cache: RwLock<Option<Arc<CacheEntry<T>>>>,
    count_cache: RwLock<Option<Arc<CountCacheEntry>>>,
    listeners: ListenerRegistry,
    stats: AtomicCacheStats,
}

impl<T, F> fmt::Debug for BackendPagedCache<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendPagedCache")
            .field("codec", &self.codec)
            .field("count_backend", &self.count_backend.is_some())
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

impl<T, F> BackendPagedCache<T, F>
where
    T: Clone + Send + Sync + 'static,
    F: Clone + fmt::Display + Send + Sync + 'static,
{
    /// Cache keyed with the default `Display`-based codec
    pub fn new<B>(backend: B) -> Self
    where
        B: BackendFetch<T, F> + 'static,
    {
        Self::with_codec(backend, QueryKeyCodec::new())
    }
}

impl<T, F> BackendPagedCache<T, F>
where
    T: Clone + Send + Sync + 'static,
    F: Clone + Send + Sync + 'static,
{
    pub fn with_codec<B>(backend: B, codec: QueryKeyCodec<F>) -> Self
    where
        B: BackendFetch<T, F> + 'static,
    {
        Self {
            backend: Arc::new(backend),
            count_backend: None,
            codec,
            filter: RwLock::new(None),
            cache: RwLock::new(None),
            count_cache: RwLock::new(None),
            listeners: ListenerRegistry::new(),
            stats: AtomicCacheStats::default(),
        }
    }

    /// Serve cold counts through a count-only backend call
    pub fn with_count_backend<C>(mut self, count_backend: C) -> Self
    where
        C: BackendCount<F> + 'static,
    {
        self.count_backend = Some(Arc::new(count_backend));
        self
    }

    pub fn codec(&self) -> &QueryKeyCodec<F> {
        &self.codec
    }

    /// Provider-level default filter
    pub fn filter(&self) -> Option<F> {
        self.filter
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the default filter and drop both cached entries
    pub fn set_filter(&self, filter: Option<F>) {
        *self.filter.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = filter;
        self.clear_cache();
        debug!("Provider filter changed, cache cleared");
        self.listeners.notify(&DataChange::FilterChanged);
    }

    /// Drop both cached entries so the next fetch or count hits the backend
    pub fn refresh_all(&self) {
        self.clear_cache();
        debug!("Cache refreshed");
        self.listeners.notify(&DataChange::Refreshed);
    }

    /// Query filter if present, otherwise the provider-level filter
    pub fn effective_filter(&self, query: &Query<F>) -> Option<F> {
        query.filter.clone().or_else(|| self.filter())
    }

    /// Currently held page entry
    pub fn cached_entry(&self) -> Option<Arc<CacheEntry<T>>> {
        self.cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Currently held count entry
    pub fn cached_count(&self) -> Option<Arc<CountCacheEntry>> {
        self.count_cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Page entry for `query`, from the slot or the backend
    pub async fn page(&self, query: &Query<F>) -> GridResult<Arc<CacheEntry<T>>> {
        let filter = self.effective_filter(query);
        let key = self.codec.result_key(&query.window, filter.as_ref(), &query.sort);

        if let Some(entry) = self.cached_entry() {
            if entry.key() == key {
                AtomicCacheStats::bump(&self.stats.hits);
                trace!("Loading data from cache");
                return Ok(entry);
            }
        }

        AtomicCacheStats::bump(&self.stats.misses);
        AtomicCacheStats::bump(&self.stats.backend_calls);
        debug!(
            "Fetching data from backend (offset {}, limit {})",
            query.window.offset, query.window.limit
        );

        let page = self
            .backend
            .fetch_page(filter.as_ref(), query.window, &query.sort)
            .await
            .map_err(|err| {
                warn!("Backend fetch failed: {}", err);
                GridError::Backend(err)
            })?;

        let entry = Arc::new(CacheEntry::new(key, page));
        let count_key = self.codec.count_key(filter.as_ref(), &query.sort);
        let count_entry = Arc::new(CountCacheEntry::new(count_key, entry.total_count()));

        *self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some(Arc::clone(&entry));
        // Count slot follows from the same backend call
        *self.count_cache.write().unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some(count_entry);

        Ok(entry)
    }

    async fn total_count(&self, query: &Query<F>) -> GridResult<usize> {
        let filter = self.effective_filter(query);
        let count_key = self.codec.count_key(filter.as_ref(), &query.sort);

        if let Some(entry) = self.cached_count() {
            if entry.key() == count_key {
                AtomicCacheStats::bump(&self.stats.count_hits);
                trace!("Loading total count from cache");
                return Ok(entry.total_count());
            }
        }

        AtomicCacheStats::bump(&self.stats.count_misses);

        let Some(count_backend) = &self.count_backend else {
            debug!("Fetching total count from backend");
            let total = self.page(query).await?.total_count();
            // A result-slot hit leaves the count slot as it was
            *self.count_cache.write().unwrap_or_else(|poisoned| poisoned.into_inner()) =
                Some(Arc::new(CountCacheEntry::new(count_key, total)));
            return Ok(total);
        };

        AtomicCacheStats::bump(&self.stats.backend_calls);
        debug!("Fetching total count from count backend");
        let total = count_backend
            .count(filter.as_ref(), &query.sort)
            .await
            .map_err(|err| {
                warn!("Backend count failed: {}", err);
                GridError::Backend(err)
            })?;

        *self.count_cache.write().unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some(Arc::new(CountCacheEntry::new(count_key, total)));
        Ok(total)
    }

    fn clear_cache(&self) {
        *self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        *self.count_cache.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

#[async_trait]
impl<T, F> DataSource<T, F> for BackendPagedCache<T, F>
where
    T: Clone + Send + Sync + 'static,
    F: Clone + Send + Sync + 'static,
{
    async fn fetch(&self, query: &Query<F>) -> GridResult<Vec<T>> {
        Ok(self.page(query).await?.items().to_vec())
    }

    async fn count(&self, query: &Query<F>) -> GridResult<usize> {
        self.total_count(query).await
    }

    fn on_change(&self, listener: ChangeListener) -> Subscription {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, subscription: &Subscription) -> bool {
        self.listeners.remove(subscription)
    }

    fn is_backend_paged(&self) -> bool {
        true
    }
}
