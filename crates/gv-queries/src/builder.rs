//! Query Builder
//!
//! Turns the query-relevant part of a view into the descriptor handed to a
//! fetch source. Building is pure: equal inputs give equal descriptors.

use serde::Serialize;

use gv_core::{GridMode, PageWindow, PaginationSpec};

use crate::filters::FilterSet;
use crate::sorts::SortSpec;

/// Whether a query asks for one page or for everything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    /// Bounded by the pagination window
    Page,
    /// Unbounded ("fetch all")
    All,
}

impl QueryScope {
    /// Client mode loads everything once; server mode loads a page at a time
    pub fn for_mode(mode: GridMode) -> Self {
        match mode {
            GridMode::Server => Self::Page,
            GridMode::Client => Self::All,
        }
    }
}

/// Borrowed view of everything a query depends on
#[derive(Debug, Clone, Copy)]
pub struct QueryState<'a> {
    pub search_term: &'a str,
    pub sort: &'a SortSpec,
    pub filters: &'a FilterSet,
    pub pagination: PaginationSpec,
}

/// Canonical description of a fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    pub search_term: String,
    pub sort_token: String,
    pub filter_token: String,
    /// Present only for bounded queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageWindow>,
}

impl QueryDescriptor {
    pub fn is_bounded(&self) -> bool {
        self.pagination.is_some()
    }

    /// Request parameters in wire order
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", self.search_term.clone()),
            ("sort", self.sort_token.clone()),
            ("filters", self.filter_token.clone()),
        ];
        if let Some(window) = self.pagination {
            params.push(("skip", window.skip.to_string()));
            params.push(("limit", window.limit.to_string()));
        }
        params
    }
}

/// Build the descriptor for a view
pub fn build(state: &QueryState<'_>, scope: QueryScope) -> QueryDescriptor {
    QueryDescriptor {
        search_term: state.search_term.to_string(),
        sort_token: state.sort.to_token(),
        filter_token: state.filters.to_query_fragment(),
        pagination: match scope {
            QueryScope::Page => Some(state.pagination.window()),
            QueryScope::All => None,
        },
    }
}
