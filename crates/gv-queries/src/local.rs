//! In-memory evaluation of a query.
//!
//! Client mode pages a cached dataset with this; [`select`] also lets an
//! in-memory source answer queries the way a server would.

use std::cmp::Ordering;

use serde_json::Value;

use gv_core::{value_text, PageWindow, PaginationSpec, Row};

use crate::builder::QueryState;
use crate::filters::FilterSet;
use crate::sorts::{SortDirection, SortSpec};

/// Case-insensitive substring match of `term` against any field
pub fn matches_search(row: &Row, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    row.values()
        .any(|value| value_text(value).to_lowercase().contains(&needle))
}

/// Order two cells: numbers numerically, text case-insensitively, missing last
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            Some(Value::Number(_)) => 0,
            Some(Value::String(_)) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Array(_)) | Some(Value::Object(_)) => 3,
            Some(Value::Null) | None => 4,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x @ (Value::Array(_) | Value::Object(_))), Some(y @ (Value::Array(_) | Value::Object(_)))) => {
            x.to_string().cmp(&y.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Order two rows by every criterion of `sort`, first criterion first.
///
/// Missing cells sort last in either direction.
pub fn compare_rows(a: &Row, b: &Row, sort: &SortSpec) -> Ordering {
    fn is_missing(value: Option<&Value>) -> bool {
        value.map_or(true, Value::is_null)
    }

    for criterion in sort.criteria() {
        let (x, y) = (a.get(&criterion.field_id), b.get(&criterion.field_id));
        let ordering = match (is_missing(x), is_missing(y), criterion.direction) {
            (false, false, SortDirection::Desc) => compare_values(x, y).reverse(),
            _ => compare_values(x, y),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Rows matching search and filters, stably sorted
pub fn select(dataset: &[Row], search_term: &str, filters: &FilterSet, sort: &SortSpec) -> Vec<Row> {
    let mut rows: Vec<Row> = dataset
        .iter()
        .filter(|row| matches_search(row, search_term) && filters.matches(row))
        .cloned()
        .collect();

    if !sort.is_empty() {
        rows.sort_by(|a, b| compare_rows(a, b, sort));
    }
    rows
}

/// Cut one window out of selected rows
pub fn slice(rows: &[Row], window: PageWindow) -> Vec<Row> {
    let (start, end) = window.bounds(rows.len());
    rows[start..end].to_vec()
}

/// One locally computed page
#[derive(Debug, Clone, PartialEq)]
pub struct LocalPage {
    pub rows: Vec<Row>,
    /// Rows matching search and filters
    pub total_count: u64,
    /// Pagination after clamping onto the last page
    pub pagination: PaginationSpec,
}

/// Evaluate a whole view over a cached dataset
pub fn page(dataset: &[Row], state: &QueryState<'_>) -> LocalPage {
    let selected = select(dataset, state.search_term, state.filters, state.sort);
    let total_count = selected.len() as u64;
    let pagination = state.pagination.clamped(total_count);

    LocalPage {
        rows: slice(&selected, pagination.window()),
        total_count,
        pagination,
    }
}
