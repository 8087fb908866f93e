//! Backend hooks the page cache fronts.

use async_trait::async_trait;
use std::future::Future;

use crate::query::{ResultPage, SortOrder, SortSpec, Window};

/// Remote page fetch: items for one window plus the total count.
///
/// May be called concurrently and repeatedly with identical arguments.
#[async_trait]
pub trait BackendFetch<T, F>: Send + Sync {
    async fn fetch_page(
        &self,
        filter: Option<&F>,
        window: Window,
        sort: &[SortOrder],
    ) -> anyhow::Result<ResultPage<T>>;
}

/// Optional count-only backend call, used instead of a full page fetch
/// when only a total is needed and the count cache is cold.
#[async_trait]
pub trait BackendCount<F>: Send + Sync {
    async fn count(&self, filter: Option<&F>, sort: &[SortOrder]) -> anyhow::Result<usize>;
}

/// [`BackendFetch`] built from an async closure
pub struct FnBackend<C> {
    call: C,
}

/// Wrap `|filter, window, sort| async move { ... }` as a page backend
pub fn backend_fn<C>(call: C) -> FnBackend<C> {
    FnBackend { call }
}

#[async_trait]
impl<T, F, C, Fut> BackendFetch<T, F> for FnBackend<C>
where
    T: Send,
    F: Clone + Send + Sync,
    C: Fn(Option<F>, Window, SortSpec) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<ResultPage<T>>> + Send,
{
    async fn fetch_page(
        &self,
        filter: Option<&F>,
        window: Window,
        sort: &[SortOrder],
    ) -> anyhow::Result<ResultPage<T>> {
        (self.call)(filter.cloned(), window, sort.to_vec()).await
    }
}

/// [`BackendCount`] built from an async closure
pub struct FnCount<C> {
    call: C,
}

/// Wrap `|filter, sort| async move { ... }` as a count backend
pub fn count_fn<C>(call: C) -> FnCount<C> {
    FnCount { call }
}

#[async_trait]
impl<F, C, Fut> BackendCount<F> for FnCount<C>
where
    F: Clone + Send + Sync,
    C: Fn(Option<F>, SortSpec) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<usize>> + Send,
{
    async fn count(&self, filter: Option<&F>, sort: &[SortOrder]) -> anyhow::Result<usize> {
        (self.call)(filter.cloned(), sort.to_vec()).await
    }
}
