//! # gv-queries
//!
//! Query layer for Gridview RS: turning view state into a canonical query.
//!
//! ## Structure
//!
//! - `filters` - Per-column filters, unique by column
//! - `sorts` - Sort criteria and directions
//! - `columns` - Configured columns and the visibility mask
//! - `builder` - Pure mapping from view state to a query descriptor
//! - `local` - In-memory evaluation of a query over a cached dataset
//!
//! ## Example
//!
//! ```
//! use gv_core::PaginationSpec;
//! use gv_queries::builder::{build, QueryScope, QueryState};
//! use gv_queries::{FilterOperator, FilterSet, SortDirection, SortSpec};
//!
//! let mut filters = FilterSet::new();
//! filters.upsert("title", FilterOperator::Contains, "phone");
//! let sort = SortSpec::by("price", SortDirection::Desc);
//!
//! let query = build(
//!     &QueryState {
//!         search_term: "apple",
//!         sort: &sort,
//!         filters: &filters,
//!         pagination: PaginationSpec::new(1, 10),
//!     },
//!     QueryScope::Page,
//! );
//!
//! assert_eq!(query.filter_token, "title:contains:phone");
//! assert_eq!(query.sort_token, "price:desc");
//! ```

pub mod filters;
pub mod sorts;
pub mod columns;
pub mod builder;
pub mod local;

// Re-exports for convenience
pub use filters::{FilterChange, FilterItem, FilterOperator, FilterSet};
pub use sorts::{SortCriterion, SortDirection, SortSpec};
pub use columns::{ColumnSet, ColumnVisibility};
pub use builder::{build, QueryDescriptor, QueryScope, QueryState};
