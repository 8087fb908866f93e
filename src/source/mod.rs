//! Data source abstraction consumed by the pagination controller.
//!
//! A data source answers windowed fetches and total counts for a
//! (filter, sort) pair and notifies listeners when its content changes.
//! [`ListSource`] is the in-memory implementation; the backend page cache in
//! [`crate::cache`] is the remote one.

mod list;
mod listeners;

pub use list::{Comparator, ListSource, Predicate};
pub use listeners::{ChangeListener, ListenerRegistry, Subscription};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GridResult;
use crate::query::Query;

/// What changed in a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataChange {
    /// The item set was replaced
    ItemsReplaced,
    /// The provider-level filter was changed
    FilterChanged,
    /// The provider-level sort was changed
    SortChanged,
    /// Cached state was dropped; content may differ on the next fetch
    Refreshed,
}

#[async_trait]
pub trait DataSource<T, F>: Send + Sync {
    /// Items inside `query.window` for the query's filter and sort
    async fn fetch(&self, query: &Query<F>) -> GridResult<Vec<T>>;

    /// Total number of items matching the query's filter; the window is ignored
    async fn count(&self, query: &Query<F>) -> GridResult<usize>;

    /// Register a change listener
    fn on_change(&self, listener: ChangeListener) -> Subscription;

    /// Release a listener; returns false if it was not registered here
    fn remove_listener(&self, subscription: &Subscription) -> bool;

    /// Whether windows are served by a remote backend rather than sliced in memory
    fn is_backend_paged(&self) -> bool {
        false
    }
}
