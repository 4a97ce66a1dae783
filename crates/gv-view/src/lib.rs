//! View state and fetch orchestration for Gridview RS
//!
//! A [`GridController`] owns one grid. Interactions are applied to the
//! [`ViewStore`] as commands; the [`FetchOrchestrator`] reacts to the
//! resulting changes by debouncing a remote fetch (server mode) or re-paging
//! the cached dataset (client mode).
//!
//! ```no_run
//! use std::sync::Arc;
//! use gv_core::{ColumnDescriptor, GridConfig, GridMode, Row};
//! use gv_view::{GridController, MemorySource};
//!
//! # async fn run() -> gv_core::GridResult<()> {
//! let rows = vec![Row::new().with("id", 1).with("title", "iPhone 9")];
//! let config = GridConfig::new(
//!     GridMode::Client,
//!     "",
//!     vec![ColumnDescriptor::text("title", "Title")],
//! );
//! let grid = GridController::new(config, Arc::new(MemorySource::new(rows)))?;
//! grid.mount();
//! grid.settled().await;
//! assert_eq!(grid.snapshot().total_count, 1);
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod export;
pub mod orchestrator;
pub mod schedule;
pub mod source;
pub mod state;

pub use controller::GridController;
pub use export::{project, ExportArtifact, ExportEncoder, ExportFormat, ExportRecord};
pub use orchestrator::{FetchOrchestrator, FetchPhase};
pub use schedule::ScheduledTask;
pub use source::{FetchSource, MemorySource};
pub use state::{ViewChange, ViewCommand, ViewEvent, ViewState, ViewStore};
