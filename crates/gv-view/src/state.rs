//! View State Store
//!
//! The single owner of a grid's view state. Interaction handlers mutate it
//! through [`ViewCommand`]s; only the fetch orchestrator writes rows, the
//! total count and the loading flag.

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use gv_core::{GridMode, PageResult, PaginationSpec, Row};
use gv_queries::{
    build, local, ColumnVisibility, FilterOperator, FilterSet, QueryDescriptor, QueryScope, QueryState,
    SortSpec,
};

const EVENT_CAPACITY: usize = 64;

/// Everything a render collaborator needs to draw the grid
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Rows of the current page
    pub rows: Vec<Row>,
    /// Rows matching the current query across all pages
    pub total_count: u64,
    pub pagination: PaginationSpec,
    pub sort: SortSpec,
    pub filters: FilterSet,
    pub search_term: String,
    pub column_visibility: ColumnVisibility,
    /// A fetch is in flight
    pub loading: bool,
}

impl ViewState {
    /// Empty view as created at mount
    pub fn new(page_size: u32) -> Self {
        Self {
            rows: vec![],
            total_count: 0,
            pagination: PaginationSpec::new(0, page_size),
            sort: SortSpec::new(),
            filters: FilterSet::new(),
            search_term: String::new(),
            column_visibility: ColumnVisibility::new(),
            loading: false,
        }
    }

    /// The query-relevant part of the view
    pub fn query_state(&self) -> QueryState<'_> {
        QueryState {
            search_term: &self.search_term,
            sort: &self.sort,
            filters: &self.filters,
            pagination: self.pagination,
        }
    }
}

/// Mutations a user interaction can request
#[derive(Debug, Clone, PartialEq)]
pub enum ViewCommand {
    SetPagination(PaginationSpec),
    SetPage(u32),
    SetPageSize(u32),
    SetSort(SortSpec),
    SetSearch(String),
    UpsertFilter {
        field_id: String,
        operator: FilterOperator,
        value: String,
    },
    ClearFilters,
    SetColumnVisibility { field_id: String, visible: bool },
}

/// What part of the view a command changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewChange {
    Pagination,
    Sort,
    Filter,
    Search,
    Columns,
}

impl ViewChange {
    /// Whether the change affects which rows are shown
    pub fn affects_rows(&self) -> bool {
        !matches!(self, Self::Columns)
    }

    /// Whether the change invalidates the current page offset
    pub fn resets_page(&self) -> bool {
        matches!(self, Self::Sort | Self::Filter)
    }
}

/// Notifications for whoever renders the grid
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Changed(ViewChange),
    Loading(bool),
    RowsReplaced { rows: usize, total: u64 },
}

struct StoreInner {
    state: ViewState,
    /// Full dataset cached in client mode; `None` until the first load
    dataset: Option<Vec<Row>>,
}

/// Process-local owner of one grid's [`ViewState`]
pub struct ViewStore {
    mode: GridMode,
    inner: Mutex<StoreInner>,
    events: broadcast::Sender<ViewEvent>,
}

impl ViewStore {
    pub fn new(mode: GridMode, page_size: u32) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            mode,
            inner: Mutex::new(StoreInner {
                state: ViewState::new(page_size),
                dataset: None,
            }),
            events,
        }
    }

    pub fn mode(&self) -> GridMode {
        self.mode
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ViewState {
        self.inner.lock().state.clone()
    }

    /// Read the state without copying it
    pub fn read<R>(&self, f: impl FnOnce(&ViewState) -> R) -> R {
        f(&self.inner.lock().state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    /// Build the query for the current state
    pub fn query(&self, scope: QueryScope) -> QueryDescriptor {
        self.read(|state| build(&state.query_state(), scope))
    }

    /// Apply a command atomically. Returns `None` when nothing changed.
    ///
    /// In server mode a sort or filter change also moves back to the first
    /// page, and filter input returns to it even when the filter set ends up
    /// unchanged.
    pub fn apply(&self, command: ViewCommand) -> Option<ViewChange> {
        let change = {
            let mut inner = self.inner.lock();
            let state = &mut inner.state;

            let first_page = state.pagination.first_page();
            let page_reset = self.mode.is_server()
                && matches!(command, ViewCommand::UpsertFilter { .. })
                && replace(&mut state.pagination, first_page);
            let change = Self::mutate(state, command).or(page_reset.then_some(ViewChange::Pagination))?;

            if change.resets_page() && self.mode.is_server() {
                state.pagination = state.pagination.first_page();
            }
            change
        };

        debug!(?change, mode = self.mode.as_str(), "view changed");
        self.publish(ViewEvent::Changed(change));
        Some(change)
    }

    fn mutate(state: &mut ViewState, command: ViewCommand) -> Option<ViewChange> {
        match command {
            ViewCommand::SetPagination(pagination) => {
                let pagination = PaginationSpec::new(pagination.page_index, pagination.page_size);
                replace(&mut state.pagination, pagination).then_some(ViewChange::Pagination)
            }
            ViewCommand::SetPage(page_index) => {
                let pagination = PaginationSpec {
                    page_index,
                    ..state.pagination
                };
                replace(&mut state.pagination, pagination).then_some(ViewChange::Pagination)
            }
            ViewCommand::SetPageSize(page_size) => {
                let pagination = PaginationSpec::new(state.pagination.page_index, page_size);
                replace(&mut state.pagination, pagination).then_some(ViewChange::Pagination)
            }
            ViewCommand::SetSort(sort) => replace(&mut state.sort, sort).then_some(ViewChange::Sort),
            ViewCommand::SetSearch(term) => {
                replace(&mut state.search_term, term).then_some(ViewChange::Search)
            }
            ViewCommand::UpsertFilter {
                field_id,
                operator,
                value,
            } => state
                .filters
                .upsert(&field_id, operator, value)
                .is_changed()
                .then_some(ViewChange::Filter),
            ViewCommand::ClearFilters => {
                let had_filters = !state.filters.is_empty();
                state.filters.clear();
                had_filters.then_some(ViewChange::Filter)
            }
            ViewCommand::SetColumnVisibility { field_id, visible } => state
                .column_visibility
                .set(field_id, visible)
                .then_some(ViewChange::Columns),
        }
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        let changed = replace(&mut self.inner.lock().state.loading, loading);
        if changed {
            self.publish(ViewEvent::Loading(loading));
        }
    }

    /// Replace the current page with a fetched one
    pub(crate) fn replace_page(&self, page: PageResult) {
        let (rows, total) = {
            let mut inner = self.inner.lock();
            inner.state.rows = page.rows;
            inner.state.total_count = page.total_count;
            (inner.state.rows.len(), inner.state.total_count)
        };
        self.publish(ViewEvent::RowsReplaced { rows, total });
    }

    /// Cache a full dataset and page it locally
    pub(crate) fn replace_dataset(&self, rows: Vec<Row>) {
        self.inner.lock().dataset = Some(rows);
        self.refresh_local();
    }

    /// Recompute the current page from the cached dataset.
    ///
    /// A no-op until the dataset has loaded, so pagination requested before
    /// then is not clamped against an empty set.
    pub(crate) fn refresh_local(&self) {
        let (rows, total) = {
            let mut inner = self.inner.lock();
            let Some(dataset) = inner.dataset.as_deref() else {
                debug!("dataset not loaded yet, local refresh skipped");
                return;
            };
            let page = local::page(dataset, &inner.state.query_state());
            let state = &mut inner.state;
            state.rows = page.rows;
            state.total_count = page.total_count;
            state.pagination = page.pagination;
            (state.rows.len(), state.total_count)
        };
        self.publish(ViewEvent::RowsReplaced { rows, total });
    }

    fn publish(&self, event: ViewEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Assign if different, reporting whether it was
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gv_queries::SortDirection;

    fn filter(field: &str, value: &str) -> ViewCommand {
        ViewCommand::UpsertFilter {
            field_id: field.to_string(),
            operator: FilterOperator::Contains,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_initial_state() {
        let store = ViewStore::new(GridMode::Server, 10);
        let state = store.snapshot();
        assert_eq!(state.pagination, PaginationSpec::new(0, 10));
        assert!(state.rows.is_empty());
        assert!(state.filters.is_empty());
        assert!(state.sort.is_empty());
        assert!(!state.loading);
    }

    #[test]
    fn test_unchanged_commands_report_nothing() {
        let store = ViewStore::new(GridMode::Server, 10);
        assert_eq!(store.apply(ViewCommand::SetPage(0)), None);
        assert_eq!(store.apply(ViewCommand::SetSearch(String::new())), None);
        assert_eq!(store.apply(ViewCommand::SetSort(SortSpec::new())), None);
        assert_eq!(store.apply(filter("title", "")), None);
        assert_eq!(store.apply(ViewCommand::ClearFilters), None);
    }

    #[test]
    fn test_sort_and_filter_reset_page_in_server_mode() {
        let store = ViewStore::new(GridMode::Server, 10);

        store.apply(ViewCommand::SetPage(4));
        assert_eq!(
            store.apply(ViewCommand::SetSort(SortSpec::by("price", SortDirection::Desc))),
            Some(ViewChange::Sort)
        );
        assert_eq!(store.snapshot().pagination.page_index, 0);

        store.apply(ViewCommand::SetPage(3));
        assert_eq!(store.apply(filter("title", "ph")), Some(ViewChange::Filter));
        assert_eq!(store.snapshot().pagination.page_index, 0);

        store.apply(ViewCommand::SetPage(2));
        assert_eq!(
            store.apply(ViewCommand::SetSearch("x".into())),
            Some(ViewChange::Search)
        );
        assert_eq!(store.snapshot().pagination.page_index, 2);
    }

    #[test]
    fn test_client_mode_keeps_page_on_sort() {
        let store = ViewStore::new(GridMode::Client, 10);
        store.apply(ViewCommand::SetPage(2));
        store.apply(ViewCommand::SetSort(SortSpec::by("price", SortDirection::Asc)));
        assert_eq!(store.snapshot().pagination.page_index, 2);
    }

    #[test]
    fn test_page_size_change() {
        let store = ViewStore::new(GridMode::Server, 10);
        assert_eq!(store.apply(ViewCommand::SetPageSize(25)), Some(ViewChange::Pagination));
        assert_eq!(store.snapshot().pagination.page_size, 25);
        assert_eq!(store.apply(ViewCommand::SetPageSize(25)), None);
    }

    #[test]
    fn test_query_reflects_state() {
        let store = ViewStore::new(GridMode::Server, 10);
        store.apply(ViewCommand::SetSearch("app".into()));
        store.apply(filter("title", "ph"));
        store.apply(ViewCommand::SetPage(1));

        let query = store.query(QueryScope::Page);
        assert_eq!(query.search_term, "app");
        assert_eq!(query.filter_token, "title:contains:ph");
        assert_eq!(query.pagination.unwrap().skip, 10);
    }

    #[test]
    fn test_events_are_published() {
        let store = ViewStore::new(GridMode::Server, 10);
        let mut events = store.subscribe();

        store.apply(ViewCommand::SetColumnVisibility {
            field_id: "sku".into(),
            visible: false,
        });
        store.set_loading(true);
        store.set_loading(true);
        store.replace_page(PageResult::new(vec![Row::new().with("id", 1)], 40));

        assert_eq!(events.try_recv().unwrap(), ViewEvent::Changed(ViewChange::Columns));
        assert_eq!(events.try_recv().unwrap(), ViewEvent::Loading(true));
        assert_eq!(
            events.try_recv().unwrap(),
            ViewEvent::RowsReplaced { rows: 1, total: 40 }
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_local_refresh_pages_cached_dataset() {
        let store = ViewStore::new(GridMode::Client, 2);
        store.replace_dataset((1..=5).map(|i| Row::new().with("id", i)).collect());
        let state = store.snapshot();
        assert_eq!(state.total_count, 5);
        assert_eq!(state.rows.len(), 2);

        store.apply(ViewCommand::SetPage(2));
        store.refresh_local();
        assert_eq!(store.snapshot().rows.len(), 1);
    }

    #[test]
    fn test_page_requested_before_dataset_loads_is_kept() {
        let store = ViewStore::new(GridMode::Client, 2);
        store.apply(ViewCommand::SetPage(2));
        store.refresh_local();
        assert_eq!(store.snapshot().pagination.page_index, 2);

        store.replace_dataset((1..=5).map(|i| Row::new().with("id", i)).collect());
        let state = store.snapshot();
        assert_eq!(state.pagination.page_index, 2);
        assert_eq!(state.rows[0].get("id").and_then(serde_json::Value::as_i64), Some(5));
    }

    #[test]
    fn test_filter_input_returns_to_first_page_in_server_mode() {
        let store = ViewStore::new(GridMode::Server, 10);
        store.apply(ViewCommand::SetPage(2));

        // Clearing a filter that was never set still leaves page 2
        assert_eq!(store.apply(filter("sku", "")), Some(ViewChange::Pagination));
        assert_eq!(store.snapshot().pagination.page_index, 0);
        assert!(store.snapshot().filters.is_empty());

        assert_eq!(store.apply(filter("sku", "")), None);
    }

    #[test]
    fn test_filter_input_keeps_page_in_client_mode() {
        let store = ViewStore::new(GridMode::Client, 10);
        store.apply(ViewCommand::SetPage(2));
        assert_eq!(store.apply(filter("sku", "")), None);
        assert_eq!(store.snapshot().pagination.page_index, 2);
    }
}
