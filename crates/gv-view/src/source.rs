//! Fetch sources
//!
//! A fetch source answers a query descriptor with one page of rows. The
//! orchestrator never looks behind this seam.

use async_trait::async_trait;
use parking_lot::Mutex;

use gv_core::{GridResult, PageResult, Row};
use gv_queries::{local, FilterSet, QueryDescriptor, SortSpec};

/// Something that can answer a query with rows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FetchSource: Send + Sync {
    /// Fetch the rows for `query`; bounded queries return one window
    async fn fetch(&self, query: &QueryDescriptor) -> GridResult<PageResult>;
}

/// In-memory source for development/testing.
///
/// Answers queries the way a remote endpoint would: search, filters and
/// sort are applied to the whole dataset before the window is cut.
#[derive(Debug, Default)]
pub struct MemorySource {
    rows: Vec<Row>,
    queries: Mutex<Vec<QueryDescriptor>>,
}

impl MemorySource {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            queries: Mutex::new(vec![]),
        }
    }

    /// Every query answered so far, oldest first
    pub fn queries(&self) -> Vec<QueryDescriptor> {
        self.queries.lock().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.queries.lock().len()
    }

    /// Answer a query synchronously
    pub fn answer(&self, query: &QueryDescriptor) -> PageResult {
        let filters = FilterSet::parse_fragment(&query.filter_token);
        let sort = SortSpec::parse_token(&query.sort_token);
        let selected = local::select(&self.rows, &query.search_term, &filters, &sort);
        let total_count = selected.len() as u64;

        let rows = match query.pagination {
            Some(window) => local::slice(&selected, window),
            None => selected,
        };
        PageResult::new(rows, total_count)
    }
}

#[async_trait]
impl FetchSource for MemorySource {
    async fn fetch(&self, query: &QueryDescriptor) -> GridResult<PageResult> {
        self.queries.lock().push(query.clone());
        Ok(self.answer(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gv_core::PageWindow;
    use serde_json::Value;

    fn source() -> MemorySource {
        MemorySource::new(
            (1..=25)
                .map(|i| {
                    Row::new()
                        .with("id", i)
                        .with("title", format!("Item {i}"))
                        .with("price", i * 10)
                })
                .collect(),
        )
    }

    fn query(search: &str, sort: &str, filters: &str, window: Option<PageWindow>) -> QueryDescriptor {
        QueryDescriptor {
            search_term: search.to_string(),
            sort_token: sort.to_string(),
            filter_token: filters.to_string(),
            pagination: window,
        }
    }

    #[tokio::test]
    async fn test_bounded_fetch_returns_window_and_total() {
        let source = source();
        let page = source
            .fetch(&query("", "price:desc", "", Some(PageWindow { skip: 10, limit: 10 })))
            .await
            .unwrap();

        assert_eq!(page.total_count, 25);
        assert_eq!(page.rows.len(), 10);
        assert_eq!(page.rows[0].get("id").and_then(Value::as_i64), Some(15));
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_unbounded_fetch_returns_everything_matching() {
        let source = source();
        let page = source
            .fetch(&query("item 1", "", "price:lt:150", None))
            .await
            .unwrap();

        // "Item 1", "Item 10".."Item 14"
        assert_eq!(page.total_count, 6);
        assert_eq!(page.rows.len(), 6);
        assert!(!source.queries()[0].is_bounded());
    }
}
