//! Pagination state and the controller that drives it.
//!
//! [`Paginator`] is the widget-facing model: current page, page size,
//! offered sizes and the button strip. [`PaginationController`] binds a
//! [`DataSource`](crate::source::DataSource) to it and keeps the displayed
//! window in sync.

mod controller;
mod paginator;

pub use controller::{BindingMode, GridView, PaginationController};
pub use paginator::{PageButton, PageChangeEvent, PageRange, PaginationState, Paginator};
