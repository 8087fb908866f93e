//! Pagination widget model with page navigation and page-size selection.
//!
//! This holds the state a pagination widget displays and the rules it
//! follows when the user navigates: pages are 1-based, navigation clamps to
//! the available pages, and page-size changes keep the user anchored at the
//! same offset. Rendering is left to the presentation layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::config::GridConfig;
use crate::error::{GridError, GridResult};
use crate::query::Window;

/// Smallest number of page buttons the button model produces
const MIN_BUTTONS: usize = 5;

/// Page-change event emitted whenever the page or page size changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageChangeEvent {
    /// New page (1-based)
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub offset: usize,
    pub limit: usize,
}

/// One entry in the page button strip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageButton {
    /// Button jumping to a page
    Page(usize),
    /// Elided run of pages
    Gap,
}

/// Range of items shown on the current page, 1-based and inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageRange {
    pub from: usize,
    pub to: usize,
    pub total: usize,
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} of {}", self.from, self.to, self.total)
    }
}

/// Snapshot of pagination state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    /// Current page (1-based)
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    /// `ceil(total_items / page_size)`
    pub total_pages: usize,
    pub visible: bool,
}

impl PaginationState {
    /// Window selected by this state
    pub fn window(&self) -> Window {
        Window {
            offset: (self.page.max(1) - 1).saturating_mul(self.page_size),
            limit: self.page_size,
        }
    }
}

type PageChangeCallback = Box<dyn Fn(&PageChangeEvent) + Send + Sync>;

/// Pagination widget model
pub struct Paginator {
    /// Current page (1-based)
    page: usize,

    /// Items per page
    page_size: usize,

    /// Total number of items
    total_items: usize,

    /// Total pages supplied by the caller, overriding the computed value
    explicit_total_pages: Option<usize>,

    /// Page sizes offered for selection
    page_size_options: BTreeSet<usize>,

    /// Maximum number of page buttons
    max_buttons: usize,

    hide_edges: bool,
    show_page_size: bool,
    show_summary_text: bool,
    show_page_jump: bool,
    disabled: bool,
    visible: bool,

    /// Page-change listeners
    callbacks: Vec<PageChangeCallback>,
}

impl fmt::Debug for Paginator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paginator")
            .field("page", &self.page)
            .field("page_size", &self.page_size)
            .field("total_items", &self.total_items)
            .field("page_size_options", &self.page_size_options)
            .field("visible", &self.visible)
            .field("disabled", &self.disabled)
            .field("callbacks", &self.callbacks.len())
            .finish_non_exhaustive()
    }
}

impl Paginator {
    /// Create a paginator with default configuration
    pub fn new() -> Self {
        Self::with_config(&GridConfig::default())
    }

    /// Create a paginator from configuration
    pub fn with_config(config: &GridConfig) -> Self {
        let mut page_size_options: BTreeSet<usize> =
            config.page_sizes.iter().copied().filter(|size| *size > 0).collect();
        let page_size = config.default_page_size.max(1);
        page_size_options.insert(page_size);

        Self {
            page: 1,
            page_size,
            total_items: 0,
            explicit_total_pages: None,
            page_size_options,
            max_buttons: config.max_buttons.max(MIN_BUTTONS),
            hide_edges: config.hide_edges,
            show_page_size: config.show_page_size,
            show_summary_text: config.show_summary_text,
            show_page_jump: config.show_page_jump,
            disabled: false,
            visible: false,
            callbacks: Vec::new(),
        }
    }

    /// Get the current page (1-based)
    pub fn page(&self) -> usize {
        self.page
    }

    /// Get the current page size
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Get the total number of items
    pub fn total_items(&self) -> usize {
        self.total_items
    }

    /// Get the total number of pages; 0 when there are no items
    pub fn total_pages(&self) -> usize {
        match self.explicit_total_pages {
            Some(pages) if pages > 0 => pages,
            _ => self.total_items.div_ceil(self.page_size),
        }
    }

    /// Last page navigation may reach; at least 1
    pub fn max_page(&self) -> usize {
        self.total_pages().max(1)
    }

    /// Offset of the first item on the current page
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Window for the current page
    pub fn window(&self) -> Window {
        Window {
            offset: self.offset(),
            limit: self.page_size,
        }
    }

    pub fn state(&self) -> PaginationState {
        PaginationState {
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages(),
            visible: self.visible,
        }
    }

    /// Set the page without emitting an event; clamped to the available pages
    pub fn set_page(&mut self, page: usize) {
        self.page = self.clamp_page(page);
    }

    /// Set the page size without emitting an event
    pub fn set_page_size(&mut self, size: usize) -> GridResult<()> {
        if size == 0 {
            return Err(GridError::invalid("page size must be positive"));
        }
        self.page_size = size;
        self.page = self.clamp_page(self.page);
        Ok(())
    }

    /// Set the total number of items. Returns true if the current page had
    /// to be clamped.
    pub fn set_total_items(&mut self, total: usize) -> bool {
        self.total_items = total;
        let clamped = self.clamp_page(self.page);
        let changed = clamped != self.page;
        self.page = clamped;
        changed
    }

    /// Override the computed page count; `None` restores it
    pub fn set_total_pages(&mut self, total_pages: Option<usize>) {
        self.explicit_total_pages = total_pages;
        self.page = self.clamp_page(self.page);
    }

    /// Page sizes offered for selection, ascending
    pub fn page_size_options(&self) -> Vec<usize> {
        self.page_size_options.iter().copied().collect()
    }

    /// Page sizes as a comma-joined ascending list
    pub fn page_size_options_string(&self) -> String {
        self.page_size_options
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Replace the offered page sizes
    pub fn set_page_size_options<I>(&mut self, sizes: I) -> GridResult<()>
    where
        I: IntoIterator<Item = usize>,
    {
        let sizes: BTreeSet<usize> = sizes.into_iter().collect();
        if sizes.is_empty() {
            return Err(GridError::invalid("at least one page size must be offered"));
        }
        if sizes.contains(&0) {
            return Err(GridError::invalid("page sizes must be positive"));
        }
        self.page_size_options = sizes;
        Ok(())
    }

    /// Replace the offered page sizes from a comma-separated list, skipping
    /// entries that are not positive integers
    pub fn set_page_size_options_str(&mut self, sizes: &str) -> GridResult<()> {
        let parsed = sizes
            .split(',')
            .filter_map(|s| s.trim().parse::<usize>().ok())
            .filter(|size| *size > 0);
        self.set_page_size_options(parsed)
    }

    /// Offer an additional page size. Returns false if it was already offered.
    pub fn add_page_size_option(&mut self, size: usize) -> GridResult<bool> {
        if size == 0 {
            return Err(GridError::invalid("page size must be positive"));
        }
        Ok(self.page_size_options.insert(size))
    }

    pub fn max_buttons(&self) -> usize {
        self.max_buttons
    }

    pub fn set_max_buttons(&mut self, max_buttons: usize) {
        self.max_buttons = max_buttons.max(MIN_BUTTONS);
    }

    pub fn hide_edges(&self) -> bool {
        self.hide_edges
    }

    pub fn set_hide_edges(&mut self, hide_edges: bool) {
        self.hide_edges = hide_edges;
    }

    pub fn show_page_size(&self) -> bool {
        self.show_page_size
    }

    pub fn set_show_page_size(&mut self, show: bool) {
        self.show_page_size = show;
    }

    pub fn show_summary_text(&self) -> bool {
        self.show_summary_text
    }

    pub fn set_show_summary_text(&mut self, show: bool) {
        self.show_summary_text = show;
    }

    pub fn show_page_jump(&self) -> bool {
        self.show_page_jump
    }

    pub fn set_show_page_jump(&mut self, show: bool) {
        self.show_page_jump = show;
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    /// A disabled paginator ignores navigation
    pub fn set_enabled(&mut self, enabled: bool) {
        self.disabled = !enabled;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Add a page-change listener
    pub fn add_listener<F>(&mut self, callback: F)
    where
        F: Fn(&PageChangeEvent) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Go to a specific page. Returns the emitted event, or `None` when
    /// disabled or already on the (clamped) target page.
    pub fn goto_page(&mut self, page: usize) -> Option<PageChangeEvent> {
        if self.disabled {
            return None;
        }
        let clamped = self.clamp_page(page);
        if clamped == self.page {
            return None;
        }
        self.page = clamped;
        Some(self.emit_change())
    }

    /// Go to the first page
    pub fn first_page(&mut self) -> Option<PageChangeEvent> {
        self.goto_page(1)
    }

    /// Go to the previous page
    pub fn previous_page(&mut self) -> Option<PageChangeEvent> {
        self.goto_page(self.page.saturating_sub(1))
    }

    /// Go to the next page
    pub fn next_page(&mut self) -> Option<PageChangeEvent> {
        self.goto_page(self.page + 1)
    }

    /// Go to the last page
    pub fn last_page(&mut self) -> Option<PageChangeEvent> {
        self.goto_page(self.max_page())
    }

    /// Change the page size the way a user selection does: the first item
    /// of the current page stays on screen.
    pub fn change_page_size(&mut self, size: usize) -> GridResult<Option<PageChangeEvent>> {
        if size == 0 {
            return Err(GridError::invalid("page size must be positive"));
        }
        if self.disabled || size == self.page_size {
            return Ok(None);
        }

        let old_offset = self.offset();
        self.page_size = size;
        self.page = self.clamp_page(old_offset / size + 1);
        Ok(Some(self.emit_change()))
    }

    /// Page buttons to display: every page when they fit, otherwise the
    /// first and last page around a window centred on the current page.
    pub fn page_buttons(&self) -> Vec<PageButton> {
        let total = self.max_page();
        let current = self.page;
        let max = self.max_buttons.max(MIN_BUTTONS);

        if total <= max {
            return (1..=total).map(PageButton::Page).collect();
        }

        let window_size = max - 2;
        let half = window_size / 2;

        let mut start = current.saturating_sub(half).max(2);
        let mut end = (current + half).min(total - 1);

        let actual = end + 1 - start;
        if actual < window_size {
            start = start.saturating_sub(window_size - actual).max(2);
            let widened = end + 1 - start;
            if widened < window_size {
                end = (end + window_size - widened).min(total - 1);
            }
        }

        let mut buttons = Vec::with_capacity(max + 2);
        buttons.push(PageButton::Page(1));
        if start > 2 {
            buttons.push(PageButton::Gap);
        }
        buttons.extend((start..=end).map(PageButton::Page));
        if end < total - 1 {
            buttons.push(PageButton::Gap);
        }
        buttons.push(PageButton::Page(total));
        buttons
    }

    /// Items shown on the current page
    pub fn summary(&self) -> PageRange {
        let total = self.total_items;
        if total == 0 {
            return PageRange::default();
        }
        let offset = self.offset();
        PageRange {
            from: total.min(offset + 1),
            to: total.min(offset + self.page_size),
            total,
        }
    }

    /// Put page, size and total back exactly as they were
    pub(crate) fn restore(&mut self, page: usize, page_size: usize, total_items: usize) {
        self.page_size = page_size.max(1);
        self.total_items = total_items;
        self.page = self.clamp_page(page);
    }

    fn clamp_page(&self, page: usize) -> usize {
        page.clamp(1, self.max_page())
    }

    pub(crate) fn emit_change(&self) -> PageChangeEvent {
        let event = PageChangeEvent {
            page: self.page,
            page_size: self.page_size,
            total_pages: self.max_page(),
            offset: self.offset(),
            limit: self.page_size,
        };
        for callback in &self.callbacks {
            callback(&event);
        }
        event
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new()
    }
}
