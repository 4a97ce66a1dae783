//! Grid controller
//!
//! The single entry point a host uses to drive one grid: interaction
//! handlers become [`ViewCommand`]s, committed changes are forwarded to the
//! [`FetchOrchestrator`], and the current page can be exported.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use gv_core::{ColumnDescriptor, GridConfig, GridError, GridResult, PaginationSpec};
use gv_queries::{ColumnSet, FilterOperator, SortSpec};

use crate::export::{self, ExportArtifact, ExportEncoder, ExportRecord};
use crate::orchestrator::{FetchOrchestrator, FetchPhase};
use crate::source::FetchSource;
use crate::state::{ViewCommand, ViewEvent, ViewState, ViewStore};

pub struct GridController {
    config: GridConfig,
    columns: ColumnSet,
    store: Arc<ViewStore>,
    orchestrator: FetchOrchestrator,
}

impl GridController {
    /// Build a controller; the configuration is validated and then frozen
    pub fn new(config: GridConfig, source: Arc<dyn FetchSource>) -> GridResult<Self> {
        config.validate()?;

        let store = Arc::new(ViewStore::new(config.mode, config.page_size));
        let orchestrator = FetchOrchestrator::new(Arc::clone(&store), source, config.debounce());

        Ok(Self {
            columns: ColumnSet::new(config.columns.clone()),
            config,
            store,
            orchestrator,
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Start loading rows. Must be called inside a Tokio runtime.
    pub fn mount(&self) {
        debug!(mode = self.config.mode.as_str(), title = %self.config.title, "grid mounted");
        self.orchestrator.mount();
    }

    pub fn unmount(&self) {
        self.orchestrator.unmount();
        debug!(title = %self.config.title, "grid unmounted");
    }

    /// Apply a command; returns whether anything changed
    pub fn dispatch(&self, command: ViewCommand) -> bool {
        match self.store.apply(command) {
            Some(change) => {
                self.orchestrator.on_change(change);
                true
            }
            None => false,
        }
    }

    pub fn set_pagination(&self, pagination: PaginationSpec) -> bool {
        self.dispatch(ViewCommand::SetPagination(pagination))
    }

    pub fn set_page(&self, page_index: u32) -> bool {
        self.dispatch(ViewCommand::SetPage(page_index))
    }

    pub fn set_page_size(&self, page_size: u32) -> bool {
        self.dispatch(ViewCommand::SetPageSize(page_size))
    }

    pub fn set_sort(&self, sort: SortSpec) -> bool {
        self.dispatch(ViewCommand::SetSort(sort))
    }

    pub fn set_search(&self, term: impl Into<String>) -> bool {
        self.dispatch(ViewCommand::SetSearch(term.into()))
    }

    pub fn clear_filters(&self) -> bool {
        self.dispatch(ViewCommand::ClearFilters)
    }

    /// Raw input typed into a column's filter box.
    ///
    /// The operator follows from the column's value kind; it is never chosen
    /// by the caller. An empty value removes the column's filter. In server
    /// mode the grid always goes back to the first page, even when the
    /// filter set is unchanged.
    pub fn on_column_filter_input(&self, column: &ColumnDescriptor, raw_value: &str) -> bool {
        let operator = FilterOperator::for_column(column);
        debug!(field = %column.field_id, operator = operator.as_str(), "column filter input");

        self.dispatch(ViewCommand::UpsertFilter {
            field_id: column.field_id.clone(),
            operator,
            value: raw_value.to_string(),
        })
    }

    /// Like [`Self::on_column_filter_input`], looking the column up by id.
    /// Non-filterable columns are left alone.
    pub fn filter_column(&self, field_id: &str, raw_value: &str) -> GridResult<bool> {
        let column = self
            .columns
            .get(field_id)
            .cloned()
            .ok_or_else(|| GridError::unknown_column(field_id))?;

        if !column.is_filterable {
            debug!(field = field_id, "column is not filterable");
            return Ok(false);
        }
        Ok(self.on_column_filter_input(&column, raw_value))
    }

    pub fn set_column_visible(&self, field_id: &str, visible: bool) -> GridResult<bool> {
        if self.columns.get(field_id).is_none() {
            return Err(GridError::unknown_column(field_id));
        }
        Ok(self.dispatch(ViewCommand::SetColumnVisibility {
            field_id: field_id.to_string(),
            visible,
        }))
    }

    pub fn snapshot(&self) -> ViewState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.store.subscribe()
    }

    pub fn phase(&self) -> FetchPhase {
        self.orchestrator.phase()
    }

    /// Resolve once no fetch is scheduled or in flight
    pub async fn settled(&self) {
        self.orchestrator.settled().await
    }

    /// Configured columns not hidden by the visibility mask
    pub fn visible_columns(&self) -> Vec<ColumnDescriptor> {
        self.store.read(|state| self.columns.visible(&state.column_visibility))
    }

    /// The materialized rows projected onto the visible columns
    pub fn export_records(&self) -> Vec<ExportRecord> {
        let columns = self.visible_columns();
        self.store.read(|state| export::project(&state.rows, &columns))
    }

    /// Encode the materialized rows with `encoder`
    pub fn export(&self, encoder: &dyn ExportEncoder) -> GridResult<ExportArtifact> {
        let columns = self.visible_columns();
        let rows = self.store.read(|state| state.rows.clone());
        export::export(&rows, &columns, &self.config.title, encoder)
    }
}

impl Drop for GridController {
    fn drop(&mut self) {
        self.orchestrator.unmount();
    }
}
