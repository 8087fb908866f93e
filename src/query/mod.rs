//! Query model shared by data sources, the backend cache and the controller.
//!
//! A [`Query`] is the unit of request to a data source: a [`Window`] into the
//! collection, an optional opaque filter and an ordered [`SortSpec`].

mod key;

pub use key::{KeyDigest, QueryKeyCodec};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{GridError, GridResult};

/// Contiguous slice request: `limit` items starting at `offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

impl Window {
    /// Create a window, rejecting a zero limit
    pub fn new(offset: usize, limit: usize) -> GridResult<Self> {
        if limit == 0 {
            return Err(GridError::invalid("window limit must be positive"));
        }
        Ok(Self { offset, limit })
    }

    /// Window for a 1-based page: `offset = (page - 1) * page_size`
    pub fn for_page(page: usize, page_size: usize) -> GridResult<Self> {
        if page == 0 {
            return Err(GridError::invalid("page numbers start at 1"));
        }
        if page_size == 0 {
            return Err(GridError::invalid("page size must be positive"));
        }
        Ok(Self {
            offset: (page - 1).saturating_mul(page_size),
            limit: page_size,
        })
    }

    /// Index range covered by this window, clipped to a collection of `len` items
    pub fn range_within(&self, len: usize) -> std::ops::Range<usize> {
        let start = self.offset.min(len);
        let end = self.offset.saturating_add(self.limit).min(len);
        start..end
    }

    /// Slice `items` at `[offset, offset + limit)`, clipped to bounds
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.range_within(items.len())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("ASC"),
            Self::Desc => f.write_str("DESC"),
        }
    }
}

/// One sort criterion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

impl FromStr for SortOrder {
    type Err = GridError;

    /// Parses `field`, `field:asc` or `field:desc`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.split_once(':') {
            Some((field, dir)) => {
                let direction = match dir.trim().to_ascii_lowercase().as_str() {
                    "asc" => SortDirection::Asc,
                    "desc" => SortDirection::Desc,
                    other => {
                        return Err(GridError::invalid(format!(
                            "unknown sort direction '{}'",
                            other
                        )))
                    }
                };
                (field.trim(), direction)
            }
            None => (s.trim(), SortDirection::Asc),
        };

        if field.is_empty() {
            return Err(GridError::invalid("sort field must not be empty"));
        }
        Ok(Self::new(field, direction))
    }
}

/// Ordered sort criteria; primary first. Empty means unsorted.
pub type SortSpec = Vec<SortOrder>;

/// Request to a data source
#[derive(Debug, Clone, PartialEq)]
pub struct Query<F> {
    pub window: Window,
    pub filter: Option<F>,
    pub sort: SortSpec,
}

impl<F> Query<F> {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            filter: None,
            sort: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Option<F>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }
}

/// Items for one window plus the total size of the filtered collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPage<T> {
    pub items: Vec<T>,
    pub total_count: usize,
}

impl<T> ResultPage<T> {
    pub fn new(items: Vec<T>, total_count: usize) -> Self {
        Self { items, total_count }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
        }
    }
}
