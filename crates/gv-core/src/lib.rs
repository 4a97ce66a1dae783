//! # gv-core
//!
//! Core types, errors, and configuration for Gridview RS.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - Common error types and the `GridResult` alias
//! - Row and column descriptors
//! - Pagination types (page cursor, bounded window, fetched page)
//! - Grid configuration

pub mod error;
pub mod types;
pub mod pagination;
pub mod config;

pub use error::*;
pub use types::*;
pub use pagination::*;
pub use config::{GridConfig, GridMode};
