//! Pagination types
//!
//! The grid pages by a zero-based page index; remote sources page by offset.

use serde::{Deserialize, Serialize};

use crate::types::Row;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Pagination cursor of the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationSpec {
    /// Page index (0-indexed)
    pub page_index: u32,
    /// Rows per page, always greater than 0
    pub page_size: u32,
}

impl Default for PaginationSpec {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationSpec {
    pub fn new(page_index: u32, page_size: u32) -> Self {
        Self {
            page_index,
            page_size: page_size.max(1),
        }
    }

    /// Same page size, first page
    pub fn first_page(self) -> Self {
        Self {
            page_index: 0,
            ..self
        }
    }

    /// Offset window for a bounded query
    pub fn window(&self) -> PageWindow {
        PageWindow {
            skip: u64::from(self.page_index) * u64::from(self.page_size),
            limit: u64::from(self.page_size),
        }
    }

    /// Number of pages needed for `total` rows (at least one)
    pub fn page_count(&self, total: u64) -> u32 {
        let pages = total.div_ceil(u64::from(self.page_size)).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Pull the page index back onto the last page for `total` rows
    pub fn clamped(self, total: u64) -> Self {
        let last = self.page_count(total) - 1;
        Self {
            page_index: self.page_index.min(last),
            ..self
        }
    }
}

/// Offset/limit window sent to a remote source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub skip: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Slice bounds of this window over `len` items
    pub fn bounds(&self, len: usize) -> (usize, usize) {
        let start = usize::try_from(self.skip).unwrap_or(usize::MAX).min(len);
        let end = start
            .saturating_add(usize::try_from(self.limit).unwrap_or(usize::MAX))
            .min(len);
        (start, end)
    }
}

/// One page of rows as returned by a fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub rows: Vec<Row>,
    /// Total rows matching the query, across all pages
    pub total_count: u64,
}

impl PageResult {
    pub fn new(rows: Vec<Row>, total_count: u64) -> Self {
        Self { rows, total_count }
    }
}
