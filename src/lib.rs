//! Paginated, cache-coherent data virtualization.
//!
//! A [`PaginationController`] presents a large, possibly remote collection
//! through a fixed-size window. Data comes from any [`DataSource`]: either an
//! in-memory [`ListSource`] that is sliced locally, or a [`BackendPagedCache`]
//! that fronts a remote page-fetch function with a single-entry result cache
//! and an independent single-entry total-count cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod pagination;
pub mod query;
pub mod source;

pub use cache::{backend_fn, count_fn, BackendCount, BackendFetch, BackendPagedCache, CacheStats};
pub use config::GridConfig;
pub use error::{GridError, GridResult};
pub use pagination::{
    BindingMode, GridView, PageButton, PageChangeEvent, PageRange, PaginationController,
    PaginationState, Paginator,
};
pub use query::{KeyDigest, Query, QueryKeyCodec, ResultPage, SortDirection, SortOrder, SortSpec, Window};
pub use source::{ChangeListener, DataChange, DataSource, ListSource, ListenerRegistry, Subscription};
