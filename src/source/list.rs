//! In-memory data source, sliced locally.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

use super::{ChangeListener, DataChange, DataSource, ListenerRegistry, Subscription};
use crate::error::GridResult;
use crate::query::{Query, SortDirection, SortOrder, SortSpec};

/// Decides whether an item passes a filter
pub type Predicate<T, F> = Arc<dyn Fn(&T, &F) -> bool + Send + Sync>;

/// Compares two items by one sort field, ascending
pub type Comparator<T> = Arc<dyn Fn(&T, &T, &str) -> Ordering + Send + Sync>;

/// A collection held in memory.
///
/// Without a predicate the filter is ignored; without a comparator the sort
/// is ignored and items keep their insertion order.
pub struct ListSource<T, F> {
    items: RwLock<Arc<Vec<T>>>,
    filter: RwLock<Option<F>>,
    sort: RwLock<SortSpec>,
    predicate: Option<Predicate<T, F>>,
    comparator: Option<Comparator<T>>,
    listeners: ListenerRegistry,
}

impl<T, F> fmt::Debug for ListSource<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListSource")
            .field(
                "items",
                &self
                    .items
                    .read()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .len(),
            )
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl<T, F> ListSource<T, F>
where
    T: Clone + Send + Sync,
    F: Clone + Send + Sync,
{
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(Arc::new(items)),
            filter: RwLock::new(None),
            sort: RwLock::new(Vec::new()),
            predicate: None,
            comparator: None,
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&T, &F) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn with_comparator<C>(mut self, comparator: C) -> Self
    where
        C: Fn(&T, &T, &str) -> Ordering + Send + Sync + 'static,
    {
        self.comparator = Some(Arc::new(comparator));
        self
    }

    /// Number of items, unfiltered
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current item set
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        self.items
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace all items and notify listeners
    pub fn replace_items(&self, items: Vec<T>) {
        debug!("Replacing list source items ({} items)", items.len());
        *self.items.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(items);
        self.listeners.notify(&DataChange::ItemsReplaced);
    }

    pub fn filter(&self) -> Option<F> {
        self.filter
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Set the provider-level filter, used when a query carries none
    pub fn set_filter(&self, filter: Option<F>) {
        *self.filter.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = filter;
        self.listeners.notify(&DataChange::FilterChanged);
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Set the provider-level sort, used when a query carries none
    pub fn set_sort(&self, sort: SortSpec) {
        debug!("List source sort set to {} criteria", sort.len());
        *self.sort.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = sort;
        self.listeners.notify(&DataChange::SortChanged);
    }

    /// Tell listeners the content should be re-read
    pub fn refresh_all(&self) {
        self.listeners.notify(&DataChange::Refreshed);
    }

    fn matching(&self, query: &Query<F>) -> Vec<T> {
        let items = self.snapshot();
        let filter = query.filter.clone().or_else(|| self.filter());

        let mut matched: Vec<T> = match (&self.predicate, &filter) {
            (Some(predicate), Some(filter)) => items
                .iter()
                .filter(|item| predicate(item, filter))
                .cloned()
                .collect(),
            _ => items.as_ref().clone(),
        };

        if let Some(comparator) = &self.comparator {
            let sort = if query.sort.is_empty() {
                self.sort()
            } else {
                query.sort.clone()
            };
            if !sort.is_empty() {
                matched.sort_by(|a, b| compare_by(comparator, &sort, a, b));
            }
        }

        matched
    }
}

fn compare_by<T>(comparator: &Comparator<T>, sort: &[SortOrder], a: &T, b: &T) -> Ordering {
    for order in sort {
        let ordering = comparator(a, b, &order.field);
        let ordering = match order.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl<T, F> DataSource<T, F> for ListSource<T, F>
where
    T: Clone + Send + Sync,
    F: Clone + Send + Sync,
{
    async fn fetch(&self, query: &Query<F>) -> GridResult<Vec<T>> {
        let matched = self.matching(query);
        let page = query.window.slice(&matched).to_vec();
        trace!(
            "List source window {}+{} -> {} of {} items",
            query.window.offset,
            query.window.limit,
            page.len(),
            matched.len()
        );
        Ok(page)
    }

    async fn count(&self, query: &Query<F>) -> GridResult<usize> {
        match (&self.predicate, query.filter.is_some() || self.filter().is_some()) {
            (Some(_), true) => Ok(self.matching(query).len()),
            _ => Ok(self.len()),
        }
    }

    fn on_change(&self, listener: ChangeListener) -> Subscription {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, subscription: &Subscription) -> bool {
        self.listeners.remove(subscription)
    }
}
