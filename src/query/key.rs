//! Deterministic cache keys for queries.

use base64::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::trace;

use super::{Query, SortOrder, Window};
use crate::error::GridError;

/// How a stable string is reduced to a cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDigest {
    /// SHA-256, URL-safe base64 without padding (43 chars)
    #[default]
    Sha256,
    /// The stable string itself
    Raw,
}

impl KeyDigest {
    pub fn apply(&self, input: &str) -> String {
        match self {
            Self::Sha256 => BASE64_URL_SAFE_NO_PAD.encode(Sha256::digest(input.as_bytes())),
            Self::Raw => input.to_string(),
        }
    }
}

impl FromStr for KeyDigest {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "raw" | "none" => Ok(Self::Raw),
            other => Err(GridError::invalid(format!("unknown key digest '{}'", other))),
        }
    }
}

type FilterRenderer<F> = Arc<dyn Fn(&F) -> String + Send + Sync>;

/// Serializes queries into stable strings and digests them into keys.
///
/// The result key covers window, filter and sort. The count key covers
/// filter and sort only, so queries that differ only by page share it.
pub struct QueryKeyCodec<F> {
    render_filter: FilterRenderer<F>,
    digest: KeyDigest,
}

impl<F> Clone for QueryKeyCodec<F> {
    fn clone(&self) -> Self {
        Self {
            render_filter: Arc::clone(&self.render_filter),
            digest: self.digest,
        }
    }
}

impl<F> fmt::Debug for QueryKeyCodec<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryKeyCodec")
            .field("digest", &self.digest)
            .finish_non_exhaustive()
    }
}

impl<F: fmt::Display> QueryKeyCodec<F> {
    /// Codec rendering filters through `Display`
    pub fn new() -> Self {
        Self::with_renderer(|filter: &F| filter.to_string())
    }
}

impl<F: fmt::Display> Default for QueryKeyCodec<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> QueryKeyCodec<F> {
    /// Codec with a caller-supplied stable-string function for filters
    pub fn with_renderer<R>(render: R) -> Self
    where
        R: Fn(&F) -> String + Send + Sync + 'static,
    {
        Self {
            render_filter: Arc::new(render),
            digest: KeyDigest::default(),
        }
    }

    pub fn with_digest(mut self, digest: KeyDigest) -> Self {
        self.digest = digest;
        self
    }

    pub fn digest(&self) -> KeyDigest {
        self.digest
    }

    /// Absent and empty-rendering filters produce the same string.
    pub fn filter_string(&self, filter: Option<&F>) -> String {
        filter.map(|f| (self.render_filter)(f)).unwrap_or_default()
    }

    pub fn sort_string(sort: &[SortOrder]) -> String {
        sort.iter()
            .map(|order| format!("{}:{}", order.field, order.direction))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn result_string(&self, window: &Window, filter: Option<&F>, sort: &[SortOrder]) -> String {
        format!(
            "o={};l={};f={};sort={}",
            window.offset,
            window.limit,
            self.filter_string(filter),
            Self::sort_string(sort)
        )
    }

    pub fn count_string(&self, filter: Option<&F>, sort: &[SortOrder]) -> String {
        format!("f={};sort={}", self.filter_string(filter), Self::sort_string(sort))
    }

    /// Key over window, filter and sort
    pub fn result_key(&self, window: &Window, filter: Option<&F>, sort: &[SortOrder]) -> String {
        let raw = self.result_string(window, filter, sort);
        trace!("Result key material: {}", raw);
        self.digest.apply(&raw)
    }

    /// Key over filter and sort, never the window
    pub fn count_key(&self, filter: Option<&F>, sort: &[SortOrder]) -> String {
        let raw = self.count_string(filter, sort);
        trace!("Count key material: {}", raw);
        self.digest.apply(&raw)
    }

    /// Result key of a query, using its own filter
    pub fn query_result_key(&self, query: &Query<F>) -> String {
        self.result_key(&query.window, query.filter.as_ref(), &query.sort)
    }

    /// Count key of a query, using its own filter
    pub fn query_count_key(&self, query: &Query<F>) -> String {
        self.count_key(query.filter.as_ref(), &query.sort)
    }
}
