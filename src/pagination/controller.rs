//! Pagination controller binding a data source to the paginator.

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::paginator::{PageChangeEvent, PaginationState, Paginator};
use crate::config::GridConfig;
use crate::error::{GridError, GridResult};
use crate::query::{Query, SortOrder, SortSpec, Window};
use crate::source::{DataChange, DataSource, Subscription};

/// How the attached source reaches the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    /// No source attached
    Unbound,
    /// Source passed through unwindowed
    Direct,
    /// Only the current page is exposed
    Paginated,
}

/// What the presentation layer should display
pub enum GridView<T, F> {
    Unbound,
    /// The whole source, unwindowed
    Direct(Arc<dyn DataSource<T, F>>),
    /// Items of the current page
    Paged(Arc<Vec<T>>),
}

impl<T, F> Clone for GridView<T, F> {
    fn clone(&self) -> Self {
        match self {
            Self::Unbound => Self::Unbound,
            Self::Direct(source) => Self::Direct(Arc::clone(source)),
            Self::Paged(items) => Self::Paged(Arc::clone(items)),
        }
    }
}

impl<T, F> fmt::Debug for GridView<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbound => f.write_str("Unbound"),
            Self::Direct(_) => f.write_str("Direct(..)"),
            Self::Paged(items) => write!(f, "Paged({} items)", items.len()),
        }
    }
}

impl<T, F> GridView<T, F> {
    /// Items of the current page, when paginated
    pub fn items(&self) -> Option<&[T]> {
        match self {
            Self::Paged(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

/// Change tagged with the attachment it came from
type SourceEvent = (u64, DataChange);

/// Pagination position and query inputs, put back when a reload fails
struct Checkpoint<F> {
    page: usize,
    page_size: usize,
    total_items: usize,
    filter: Option<F>,
    sort: SortSpec,
    pagination_enabled: bool,
}

/// Keeps the paginator and the displayed window in sync with a data source.
///
/// Every state-affecting call first applies change notifications queued by
/// the attached source (a change sends the page back to 1), then recomputes
/// the window and re-issues a fetch and a count. On failure the error is
/// returned and both the last successful view and the pagination state that
/// describes it stay in place. On success, page listeners get one
/// [`PageChangeEvent`] if the page or page size moved.
///
/// [`view`](Self::view) and [`state`](Self::state) apply queued changes
/// before answering, so a changed source is never shown with a stale page.
pub struct PaginationController<T, F> {
    source: Option<Arc<dyn DataSource<T, F>>>,
    subscription: Option<Subscription>,

    /// Bumped on every attach and detach; queued events from older
    /// attachments are dropped
    generation: u64,
    changes_tx: mpsc::UnboundedSender<SourceEvent>,
    changes_rx: mpsc::UnboundedReceiver<SourceEvent>,

    /// Source content changed and the current page has not been reset yet
    content_stale: bool,

    paginator: Paginator,
    pagination_enabled: bool,

    filter: Option<F>,
    sort: SortSpec,

    view: GridView<T, F>,
}

impl<T, F> fmt::Debug for PaginationController<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginationController")
            .field("bound", &self.source.is_some())
            .field("generation", &self.generation)
            .field("content_stale", &self.content_stale)
            .field("paginator", &self.paginator)
            .field("pagination_enabled", &self.pagination_enabled)
            .field("sort", &self.sort)
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

impl<T, F> PaginationController<T, F>
where
    T: Send + Sync + 'static,
    F: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_config(&GridConfig::default())
    }

    pub fn with_config(config: &GridConfig) -> Self {
        let (changes_tx, changes_rx) = mpsc::unbounded_channel();
        Self {
            source: None,
            subscription: None,
            generation: 0,
            changes_tx,
            changes_rx,
            content_stale: false,
            paginator: Paginator::with_config(config),
            pagination_enabled: true,
            filter: None,
            sort: Vec::new(),
            view: GridView::Unbound,
        }
    }

    pub fn mode(&self) -> BindingMode {
        match (&self.source, self.pagination_enabled) {
            (None, _) => BindingMode::Unbound,
            (Some(_), false) => BindingMode::Direct,
            (Some(_), true) => BindingMode::Paginated,
        }
    }

    /// Pagination state after applying queued source changes
    pub async fn state(&mut self) -> GridResult<PaginationState> {
        self.process_source_changes().await?;
        Ok(self.paginator.state())
    }

    /// View after applying queued source changes; cheap to clone
    pub async fn view(&mut self) -> GridResult<GridView<T, F>> {
        self.process_source_changes().await?;
        Ok(self.view.clone())
    }

    /// Last published view, without consulting the source
    pub fn last_view(&self) -> GridView<T, F> {
        self.view.clone()
    }

    /// Widget model as last published
    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    pub fn source(&self) -> Option<Arc<dyn DataSource<T, F>>> {
        self.source.clone()
    }

    pub fn filter(&self) -> Option<&F> {
        self.filter.as_ref()
    }

    pub fn sort(&self) -> &[SortOrder] {
        &self.sort
    }

    /// Listen to page and page-size changes
    pub fn add_page_listener<C>(&mut self, callback: C)
    where
        C: Fn(&PageChangeEvent) + Send + Sync + 'static,
    {
        self.paginator.add_listener(callback);
    }

    /// Attach a source, replacing any previous one. The page resets to 1.
    pub async fn attach_source(&mut self, source: Arc<dyn DataSource<T, F>>) -> GridResult<()> {
        self.release_source();
        self.generation += 1;

        let generation = self.generation;
        let tx = self.changes_tx.clone();
        let subscription = source.on_change(Arc::new(move |change: &DataChange| {
            // A closed channel means the controller is gone
            let _ = tx.send((generation, *change));
        }));

        debug!(
            "Attached data source (generation {}, backend paged: {})",
            generation,
            source.is_backend_paged()
        );

        let (page, page_size) = (self.paginator.page(), self.paginator.page_size());

        // Nothing of the outgoing source stays visible, even if the first
        // load fails
        self.view = GridView::Paged(Arc::new(Vec::new()));
        self.source = Some(source);
        self.subscription = Some(subscription);
        self.sync_visibility();
        self.paginator.set_total_items(0);
        self.paginator.set_page(1);

        self.reload().await?;
        self.emit_if_moved(page, page_size);
        Ok(())
    }

    /// Detach the current source and go back to unbound
    pub fn detach_source(&mut self) {
        self.release_source();
        self.generation += 1;
        self.source = None;
        self.paginator.set_total_items(0);
        self.paginator.set_page(1);
        self.sync_visibility();
        self.view = GridView::Unbound;
        debug!("Detached data source");
    }

    /// Show or hide pagination. Hidden pagination passes the source through
    /// unwindowed.
    pub async fn set_pagination_visible(&mut self, visible: bool) -> GridResult<()> {
        self.transition(move |this| {
            this.pagination_enabled = visible;
            this.sync_visibility();
            Ok(())
        })
        .await
    }

    /// Go to a page (1-based), clamped to the available pages
    pub async fn on_page_change(&mut self, page: usize) -> GridResult<()> {
        if page == 0 {
            return Err(GridError::invalid("page numbers start at 1"));
        }
        if self.source.is_none() {
            return Ok(());
        }
        self.transition(move |this| {
            this.paginator.set_page(page);
            Ok(())
        })
        .await
    }

    /// Set the page size and go back to the first page
    pub async fn on_page_size_change(&mut self, size: usize) -> GridResult<()> {
        if size == 0 {
            return Err(GridError::invalid("page size must be positive"));
        }
        self.transition(move |this| {
            this.paginator.set_page_size(size)?;
            this.paginator.set_page(1);
            Ok(())
        })
        .await
    }

    /// Offer an additional page size and make it the active one
    pub async fn register_page_size(&mut self, size: usize) -> GridResult<()> {
        if self.paginator.add_page_size_option(size)? {
            debug!(
                "Registered page size {} (options: {})",
                size,
                self.paginator.page_size_options_string()
            );
        }
        self.on_page_size_change(size).await
    }

    /// Replace the offered page sizes; the active size is kept
    pub fn set_page_sizes(&mut self, sizes: &[usize]) -> GridResult<()> {
        self.paginator.set_page_size_options(sizes.iter().copied())
    }

    pub async fn on_sort_change(&mut self, sort: SortSpec) -> GridResult<()> {
        self.transition(move |this| {
            this.sort = sort;
            this.paginator.set_page(1);
            Ok(())
        })
        .await
    }

    /// Set the query-level filter
    pub async fn set_filter(&mut self, filter: Option<F>) -> GridResult<()> {
        self.transition(move |this| {
            this.filter = filter;
            this.paginator.set_page(1);
            Ok(())
        })
        .await
    }

    /// Apply a page change coming from the pagination widget
    pub async fn handle_page_change(&mut self, event: PageChangeEvent) -> GridResult<()> {
        if event.page_size == 0 {
            return Err(GridError::invalid("page size must be positive"));
        }
        self.transition(move |this| {
            this.paginator.set_page_size(event.page_size)?;
            if this.source.is_some() {
                this.paginator.set_page(event.page);
            }
            Ok(())
        })
        .await
    }

    pub async fn next_page(&mut self) -> GridResult<()> {
        self.navigate(|page, _| page + 1).await
    }

    pub async fn previous_page(&mut self) -> GridResult<()> {
        self.navigate(|page, _| page.saturating_sub(1)).await
    }

    pub async fn first_page(&mut self) -> GridResult<()> {
        self.navigate(|_, _| 1).await
    }

    pub async fn last_page(&mut self) -> GridResult<()> {
        self.navigate(|_, last| last).await
    }

    /// The attached source changed; start over from the first page
    pub async fn on_source_content_changed(&mut self) -> GridResult<()> {
        if self.source.is_none() {
            return Ok(());
        }
        self.content_stale = true;
        self.transition(|_| Ok(())).await
    }

    /// Apply queued change notifications from the attached source. Any
    /// number of queued changes results in a single reload from page 1.
    /// Returns how many changes were taken from the queue.
    pub async fn process_source_changes(&mut self) -> GridResult<usize> {
        let drained = self.drain_source_changes();
        if self.content_stale {
            self.transition(|_| Ok(())).await?;
        }
        Ok(drained)
    }

    /// Recompute the window and count and publish the result
    pub async fn refresh(&mut self) -> GridResult<()> {
        self.transition(|_| Ok(())).await
    }

    /// Apply queued source changes and `change`, then reload. A failure
    /// puts the pagination state back where it was.
    async fn transition<C>(&mut self, change: C) -> GridResult<()>
    where
        C: FnOnce(&mut Self) -> GridResult<()>,
    {
        let checkpoint = self.checkpoint();

        self.drain_source_changes();
        if self.content_stale {
            debug!("Source content changed, back to page 1");
            self.paginator.set_page(1);
        }

        let result = match change(self) {
            Ok(()) => self.reload().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.content_stale = false;
                self.emit_if_moved(checkpoint.page, checkpoint.page_size);
                Ok(())
            }
            Err(e) => {
                self.restore(checkpoint);
                Err(e)
            }
        }
    }

    async fn navigate(&mut self, target: fn(usize, usize) -> usize) -> GridResult<()> {
        if self.source.is_none() || !self.paginator.is_enabled() {
            return Ok(());
        }
        self.transition(move |this| {
            let page = target(this.paginator.page(), this.paginator.max_page());
            this.paginator.set_page(page);
            Ok(())
        })
        .await
    }

    /// Fetch and count for the current state and publish the view
    async fn reload(&mut self) -> GridResult<()> {
        let Some(source) = self.source.clone() else {
            self.view = GridView::Unbound;
            return Ok(());
        };

        if !self.pagination_enabled {
            let total = self.count(source.as_ref()).await?;
            self.paginator.set_total_items(total);
            self.view = GridView::Direct(source);
            return Ok(());
        }

        // Fetch first so a caching source can answer the count from the
        // same backend call.
        let mut items = self.fetch(source.as_ref()).await?;
        let total = self.count(source.as_ref()).await?;

        if self.paginator.set_total_items(total) {
            debug!(
                "Page clamped to {} of {} after recount",
                self.paginator.page(),
                self.paginator.max_page()
            );
            items = self.fetch(source.as_ref()).await?;
        }

        trace!(
            "Page {} ({} items, {} total)",
            self.paginator.page(),
            items.len(),
            total
        );
        self.view = GridView::Paged(Arc::new(items));
        Ok(())
    }

    fn current_query(&self) -> Query<F> {
        Query::new(self.paginator.window())
            .with_filter(self.filter.clone())
            .with_sort(self.sort.clone())
    }

    async fn fetch(&self, source: &dyn DataSource<T, F>) -> GridResult<Vec<T>> {
        let query = self.current_query();
        source.fetch(&query).await.map_err(|e| {
            warn!("Page fetch failed at offset {}: {}", query.window.offset, e);
            e
        })
    }

    async fn count(&self, source: &dyn DataSource<T, F>) -> GridResult<usize> {
        let query = Query::new(Window {
            offset: 0,
            limit: self.paginator.page_size(),
        })
        .with_filter(self.filter.clone())
        .with_sort(self.sort.clone());

        source.count(&query).await.map_err(|e| {
            warn!("Count failed: {}", e);
            e
        })
    }

    /// Take queued changes of the current attachment off the channel
    fn drain_source_changes(&mut self) -> usize {
        let mut drained = 0;
        while let Ok((generation, change)) = self.changes_rx.try_recv() {
            if generation == self.generation && self.source.is_some() {
                trace!("Source change: {:?}", change);
                drained += 1;
            }
        }
        if drained > 0 {
            self.content_stale = true;
        }
        drained
    }

    fn checkpoint(&self) -> Checkpoint<F> {
        Checkpoint {
            page: self.paginator.page(),
            page_size: self.paginator.page_size(),
            total_items: self.paginator.total_items(),
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            pagination_enabled: self.pagination_enabled,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint<F>) {
        self.paginator
            .restore(checkpoint.page, checkpoint.page_size, checkpoint.total_items);
        self.filter = checkpoint.filter;
        self.sort = checkpoint.sort;
        self.pagination_enabled = checkpoint.pagination_enabled;
        self.sync_visibility();
    }

    fn emit_if_moved(&self, page: usize, page_size: usize) {
        if self.source.is_none() {
            return;
        }
        if self.paginator.page() != page || self.paginator.page_size() != page_size {
            self.paginator.emit_change();
        }
    }

    fn release_source(&mut self) {
        if let (Some(source), Some(subscription)) = (&self.source, self.subscription.take()) {
            if !source.remove_listener(&subscription) {
                warn!("Listener {} was already removed", subscription.id());
            }
        }
        // Discard anything queued by the outgoing source
        while self.changes_rx.try_recv().is_ok() {}
        self.content_stale = false;
    }

    fn sync_visibility(&mut self) {
        self.paginator
            .set_visible(self.pagination_enabled && self.source.is_some());
    }
}

impl<T, F> Default for PaginationController<T, F>
where
    T: Send + Sync + 'static,
    F: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, F> Drop for PaginationController<T, F> {
    fn drop(&mut self) {
        if let (Some(source), Some(subscription)) = (&self.source, self.subscription.take()) {
            source.remove_listener(&subscription);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{backend_fn, BackendPagedCache};
    use crate::query::ResultPage;
    use crate::source::{ChangeListener, ListSource, ListenerRegistry};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Mutex, RwLock};

    #[derive(Debug, thiserror::Error)]
    #[error("backend offline")]
    struct Offline;

    fn numbers(n: u32) -> Arc<ListSource<u32, u32>> {
        Arc::new(
            ListSource::new((0..n).collect())
                .with_predicate(|item: &u32, modulus: &u32| item % modulus == 0)
                .with_comparator(|a: &u32, b: &u32, _field: &str| a.cmp(b)),
        )
    }

    async fn paged_items(controller: &mut PaginationController<u32, u32>) -> Vec<u32> {
        controller
            .view()
            .await
            .unwrap()
            .items()
            .map(<[u32]>::to_vec)
            .unwrap_or_default()
    }

    async fn page_of(controller: &mut PaginationController<u32, u32>) -> usize {
        controller.state().await.unwrap().page
    }

    struct RemoteNumbers {
        cache: Arc<BackendPagedCache<u32, u32>>,
        calls: Arc<AtomicUsize>,
        failing: Arc<AtomicBool>,
    }

    fn remote_numbers(total: u32) -> RemoteNumbers {
        let calls = Arc::new(AtomicUsize::new(0));
        let failing = Arc::new(AtomicBool::new(false));

        let backend_calls = Arc::clone(&calls);
        let backend_failing = Arc::clone(&failing);
        let backend = backend_fn(move |_filter: Option<u32>, window: Window, _sort: SortSpec| {
            let calls = Arc::clone(&backend_calls);
            let failing = Arc::clone(&backend_failing);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if failing.load(Ordering::SeqCst) {
                    return Err(anyhow::Error::new(Offline));
                }
                let end = (window.offset + window.limit).min(total as usize);
                let items: Vec<u32> = (window.offset.min(end)..end).map(|i| i as u32).collect();
                Ok::<_, anyhow::Error>(ResultPage::new(items, total as usize))
            }
        });

        RemoteNumbers {
            cache: Arc::new(BackendPagedCache::new(backend)),
            calls,
            failing,
        }
    }

    /// Numbers that change without telling anyone
    struct SilentNumbers {
        items: RwLock<Vec<u32>>,
        listeners: ListenerRegistry,
    }

    impl SilentNumbers {
        fn new(n: u32) -> Self {
            Self {
                items: RwLock::new((0..n).collect()),
                listeners: ListenerRegistry::new(),
            }
        }

        fn truncate(&self, len: usize) {
            self.items.write().unwrap().truncate(len);
        }
    }

    #[async_trait::async_trait]
    impl DataSource<u32, u32> for SilentNumbers {
        async fn fetch(&self, query: &Query<u32>) -> GridResult<Vec<u32>> {
            let items = self.items.read().unwrap();
            Ok(query.window.slice(items.as_slice()).to_vec())
        }

        async fn count(&self, _query: &Query<u32>) -> GridResult<usize> {
            Ok(self.items.read().unwrap().len())
        }

        fn on_change(&self, listener: ChangeListener) -> Subscription {
            self.listeners.add(listener)
        }

        fn remove_listener(&self, subscription: &Subscription) -> bool {
            self.listeners.remove(subscription)
        }
    }

    fn record_events(
        controller: &mut PaginationController<u32, u32>,
    ) -> Arc<Mutex<Vec<PageChangeEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        controller.add_page_listener(move |event| sink.lock().unwrap().push(*event));
        events
    }

    #[tokio::test]
    async fn test_unbound_operations_are_no_ops() {
        let mut controller: PaginationController<u32, u32> = PaginationController::new();

        controller.on_page_change(3).await.unwrap();
        controller.next_page().await.unwrap();
        controller.on_source_content_changed().await.unwrap();

        assert_eq!(controller.mode(), BindingMode::Unbound);
        assert!(matches!(controller.view().await.unwrap(), GridView::Unbound));
        let state = controller.state().await.unwrap();
        assert_eq!(state.page, 1);
        assert!(!state.visible);
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_rejected() {
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(numbers(100)).await.unwrap();

        assert!(matches!(
            controller.on_page_change(0).await,
            Err(GridError::InvalidArgument(_))
        ));
        assert!(matches!(
            controller.on_page_size_change(0).await,
            Err(GridError::InvalidArgument(_))
        ));
        assert!(controller.register_page_size(0).await.is_err());
        assert!(controller.set_page_sizes(&[]).is_err());
        assert_eq!(controller.state().await.unwrap().page_size, 25);
    }

    #[tokio::test]
    async fn test_window_follows_page() {
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(numbers(200)).await.unwrap();
        assert_eq!(controller.mode(), BindingMode::Paginated);
        assert_eq!(paged_items(&mut controller).await, (0..25).collect::<Vec<_>>());

        controller.on_page_change(3).await.unwrap();
        let state = controller.state().await.unwrap();
        assert_eq!(state.window(), Window { offset: 50, limit: 25 });
        assert_eq!(state.total_items, 200);
        assert_eq!(state.total_pages, 8);
        assert_eq!(paged_items(&mut controller).await, (50..75).collect::<Vec<_>>());

        controller.on_page_change(1).await.unwrap();
        assert_eq!(controller.state().await.unwrap().window().offset, 0);
    }

    #[tokio::test]
    async fn test_content_change_resets_page() {
        let source = numbers(200);
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(source.clone()).await.unwrap();
        controller.on_page_change(4).await.unwrap();

        source.replace_items((0..120).collect());
        source.refresh_all();
        assert_eq!(controller.process_source_changes().await.unwrap(), 2);

        let state = controller.state().await.unwrap();
        assert_eq!(state.page, 1);
        assert_eq!(state.total_items, 120);
        assert_eq!(paged_items(&mut controller).await, (0..25).collect::<Vec<_>>());
        assert_eq!(controller.process_source_changes().await.unwrap(), 0);

        controller.on_page_change(2).await.unwrap();
        controller.on_source_content_changed().await.unwrap();
        assert_eq!(page_of(&mut controller).await, 1);
    }

    #[tokio::test]
    async fn test_view_reflects_replaced_items_without_polling() {
        let source = numbers(200);
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(source.clone()).await.unwrap();
        controller.on_page_change(4).await.unwrap();

        source.replace_items((1000..1030).collect());

        let view = controller.view().await.unwrap();
        assert_eq!(view.items().unwrap(), (1000..1025).collect::<Vec<_>>().as_slice());
        let state = controller.state().await.unwrap();
        assert_eq!(state.page, 1);
        assert_eq!(state.total_items, 30);
        assert_eq!(state.window().offset, 0);
    }

    #[tokio::test]
    async fn test_queued_change_applies_before_navigation() {
        let source = numbers(200);
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(source.clone()).await.unwrap();
        controller.on_page_change(2).await.unwrap();

        // The change resets to page 1 first; next then lands on page 2
        source.replace_items((500..600).collect());
        controller.next_page().await.unwrap();

        assert_eq!(page_of(&mut controller).await, 2);
        assert_eq!(paged_items(&mut controller).await, (525..550).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_toggle_pagination_restores_window() {
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(numbers(200)).await.unwrap();
        controller.on_page_change(2).await.unwrap();
        let before = paged_items(&mut controller).await;

        controller.set_pagination_visible(false).await.unwrap();
        assert_eq!(controller.mode(), BindingMode::Direct);
        assert!(matches!(controller.view().await.unwrap(), GridView::Direct(_)));
        let state = controller.state().await.unwrap();
        assert!(!state.visible);
        assert_eq!(state.total_items, 200);

        controller.set_pagination_visible(true).await.unwrap();
        assert_eq!(page_of(&mut controller).await, 2);
        assert_eq!(paged_items(&mut controller).await, before);
    }

    #[tokio::test]
    async fn test_register_page_size() {
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(numbers(200)).await.unwrap();
        controller.on_page_change(3).await.unwrap();

        controller.register_page_size(10).await.unwrap();

        assert_eq!(controller.paginator().page_size_options_string(), "10,25,50,100");
        let state = controller.state().await.unwrap();
        assert_eq!(state.page_size, 10);
        assert_eq!(state.page, 1);
        assert_eq!(paged_items(&mut controller).await, (0..10).collect::<Vec<_>>());

        // Registering an offered size only switches to it
        controller.register_page_size(50).await.unwrap();
        assert_eq!(controller.paginator().page_size_options(), vec![10, 25, 50, 100]);
        assert_eq!(controller.state().await.unwrap().page_size, 50);
    }

    #[tokio::test]
    async fn test_filter_and_sort_reset_page() {
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(numbers(200)).await.unwrap();
        controller.on_page_change(3).await.unwrap();

        controller.set_filter(Some(10)).await.unwrap();
        let state = controller.state().await.unwrap();
        assert_eq!(state.page, 1);
        assert_eq!(state.total_items, 20);
        assert_eq!(paged_items(&mut controller).await[..3], [0, 10, 20]);

        controller.next_page().await.unwrap();
        controller.on_sort_change(vec![SortOrder::desc("value")]).await.unwrap();
        assert_eq!(page_of(&mut controller).await, 1);
        assert_eq!(paged_items(&mut controller).await[..3], [190, 180, 170]);
    }

    #[tokio::test]
    async fn test_page_clamped_after_recount() {
        let source = Arc::new(SilentNumbers::new(100));
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(source.clone()).await.unwrap();
        controller.last_page().await.unwrap();
        assert_eq!(page_of(&mut controller).await, 4);

        source.truncate(30);
        controller.refresh().await.unwrap();

        assert_eq!(page_of(&mut controller).await, 2);
        assert_eq!(paged_items(&mut controller).await, (25..30).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_widget_page_change() {
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(numbers(200)).await.unwrap();

        controller
            .handle_page_change(PageChangeEvent {
                page: 2,
                page_size: 50,
                total_pages: 4,
                offset: 50,
                limit: 50,
            })
            .await
            .unwrap();

        let state = controller.state().await.unwrap();
        assert_eq!(state.page, 2);
        assert_eq!(state.page_size, 50);
        assert_eq!(paged_items(&mut controller).await, (50..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_navigation_emits_page_events() {
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        let last_page = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&last_page);
        controller.add_page_listener(move |event| seen.store(event.page, Ordering::SeqCst));

        controller.attach_source(numbers(100)).await.unwrap();
        controller.next_page().await.unwrap();
        controller.next_page().await.unwrap();
        assert_eq!(last_page.load(Ordering::SeqCst), 3);

        controller.previous_page().await.unwrap();
        assert_eq!(page_of(&mut controller).await, 2);
        controller.first_page().await.unwrap();
        assert_eq!(last_page.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_programmatic_changes_emit_page_events() {
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(numbers(200)).await.unwrap();
        let events = record_events(&mut controller);

        controller.on_page_change(3).await.unwrap();
        controller.on_page_size_change(50).await.unwrap();
        controller.register_page_size(10).await.unwrap();

        {
            let events = events.lock().unwrap();
            assert_eq!(events.len(), 3);
            assert_eq!((events[0].page, events[0].page_size), (3, 25));
            assert_eq!((events[1].page, events[1].page_size), (1, 50));
            assert_eq!((events[2].page, events[2].page_size), (1, 10));
            assert_eq!(events[2].total_pages, 20);
        }

        // Nothing moved, nothing emitted
        controller.on_page_change(1).await.unwrap();
        controller.on_page_size_change(10).await.unwrap();
        assert_eq!(events.lock().unwrap().len(), 3);

        controller
            .handle_page_change(PageChangeEvent {
                page: 4,
                page_size: 10,
                total_pages: 20,
                offset: 30,
                limit: 10,
            })
            .await
            .unwrap();
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[3].offset, 30);
    }

    #[tokio::test]
    async fn test_attach_resets_to_first_page() {
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(numbers(200)).await.unwrap();
        controller.on_page_change(3).await.unwrap();
        let events = record_events(&mut controller);

        controller.attach_source(numbers(90)).await.unwrap();

        let state = controller.state().await.unwrap();
        assert_eq!(state.page, 1);
        assert_eq!(state.window().offset, 0);
        assert_eq!(state.total_items, 90);
        assert_eq!(paged_items(&mut controller).await, (0..25).collect::<Vec<_>>());
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_swapping_sources_releases_listener() {
        let first = numbers(100);
        let second = numbers(60);
        let mut controller: PaginationController<u32, u32> = PaginationController::new();

        controller.attach_source(first.clone()).await.unwrap();
        first.refresh_all();
        controller.attach_source(second.clone()).await.unwrap();
        controller.on_page_change(2).await.unwrap();

        // Events from the detached source are neither queued nor replayed
        first.replace_items(Vec::new());
        assert_eq!(controller.process_source_changes().await.unwrap(), 0);
        let state = controller.state().await.unwrap();
        assert_eq!(state.page, 2);
        assert_eq!(state.total_items, 60);

        second.refresh_all();
        assert_eq!(controller.process_source_changes().await.unwrap(), 1);
        assert_eq!(page_of(&mut controller).await, 1);

        controller.detach_source();
        second.refresh_all();
        assert_eq!(controller.process_source_changes().await.unwrap(), 0);
        assert_eq!(controller.mode(), BindingMode::Unbound);
        assert_eq!(controller.state().await.unwrap().total_items, 0);
    }

    #[tokio::test]
    async fn test_backend_cache_count_reuse() {
        let remote = remote_numbers(500);
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(remote.cache.clone()).await.unwrap();

        // Count answered by the page fetch
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state().await.unwrap().total_items, 500);

        controller.on_page_change(2).await.unwrap();
        assert_eq!(remote.calls.load(Ordering::SeqCst), 2);
        assert_eq!(paged_items(&mut controller).await, (25..50).collect::<Vec<_>>());

        controller.refresh().await.unwrap();
        assert_eq!(remote.calls.load(Ordering::SeqCst), 2);

        remote.cache.refresh_all();
        controller.process_source_changes().await.unwrap();
        assert_eq!(remote.calls.load(Ordering::SeqCst), 3);
        assert_eq!(page_of(&mut controller).await, 1);
    }

    #[tokio::test]
    async fn test_backend_error_keeps_last_view() {
        let remote = remote_numbers(500);
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(remote.cache.clone()).await.unwrap();
        let before = paged_items(&mut controller).await;
        let events = record_events(&mut controller);

        remote.failing.store(true, Ordering::SeqCst);
        let err = controller.on_page_change(5).await.unwrap_err();

        assert!(err.backend().unwrap().downcast_ref::<Offline>().is_some());
        assert_eq!(controller.last_view().items().unwrap(), before.as_slice());
        let state = controller.state().await.unwrap();
        assert_eq!(state.page, 1);
        assert_eq!(state.window().offset, 0);
        assert_eq!(state.total_items, 500);

        assert!(controller
            .on_sort_change(vec![SortOrder::desc("value")])
            .await
            .is_err());
        assert!(controller.sort().is_empty());
        assert!(events.lock().unwrap().is_empty());

        remote.failing.store(false, Ordering::SeqCst);
        controller.refresh().await.unwrap();
        assert_eq!(paged_items(&mut controller).await, (0..25).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failed_attach_hides_previous_source() {
        let remote = remote_numbers(500);
        remote.failing.store(true, Ordering::SeqCst);
        let mut controller: PaginationController<u32, u32> = PaginationController::new();
        controller.attach_source(numbers(200)).await.unwrap();
        controller.on_page_change(2).await.unwrap();

        assert!(controller.attach_source(remote.cache.clone()).await.is_err());

        assert!(controller.source().is_some());
        assert_eq!(controller.mode(), BindingMode::Paginated);
        let view = controller.view().await.unwrap();
        assert!(view.items().unwrap().is_empty());
        let state = controller.state().await.unwrap();
        assert_eq!(state.page, 1);
        assert_eq!(state.total_items, 0);

        remote.failing.store(false, Ordering::SeqCst);
        controller.refresh().await.unwrap();
        assert_eq!(paged_items(&mut controller).await, (0..25).collect::<Vec<_>>());
    }
}
