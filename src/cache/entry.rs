//! Immutable cache slot contents and counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::query::ResultPage;

/// Most recently fetched page, keyed by its result key
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    key: String,
    page: ResultPage<T>,
}

impl<T> CacheEntry<T> {
    pub(crate) fn new(key: String, page: ResultPage<T>) -> Self {
        Self { key, page }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn page(&self) -> &ResultPage<T> {
        &self.page
    }

    pub fn items(&self) -> &[T] {
        &self.page.items
    }

    pub fn total_count(&self) -> usize {
        self.page.total_count
    }
}

/// Total count for a filter + sort, keyed by its count key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountCacheEntry {
    key: String,
    total_count: usize,
}

impl CountCacheEntry {
    pub(crate) fn new(key: String, total_count: usize) -> Self {
        Self { key, total_count }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }
}

/// Cache statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Page lookups served from the result slot
    pub hits: u64,
    /// Page lookups that went to the backend
    pub misses: u64,
    /// Count lookups served from the count slot
    pub count_hits: u64,
    /// Count lookups that needed a backend call
    pub count_misses: u64,
    /// Backend calls made, page and count-only
    pub backend_calls: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct AtomicCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub count_hits: AtomicU64,
    pub count_misses: AtomicU64,
    pub backend_calls: AtomicU64,
}

impl AtomicCacheStats {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            count_hits: self.count_hits.load(Ordering::Relaxed),
            count_misses: self.count_misses.load(Ordering::Relaxed),
            backend_calls: self.backend_calls.load(Ordering::Relaxed),
        }
    }
}
