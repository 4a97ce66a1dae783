//! Fetch Orchestrator
//!
//! Decides when the view needs rows, issues fetches through a
//! [`FetchSource`] and merges the results into the [`ViewStore`].
//!
//! Server mode debounces every row-affecting change (trailing edge) and
//! issues one bounded fetch per quiet period. Client mode issues one
//! unbounded fetch at mount and pages the cached dataset locally afterwards.
//!
//! In-flight fetches are never cancelled. Each fetch is tagged with a ticket
//! and a response only merges if no newer fetch has completed yet, whether
//! that newer fetch succeeded or failed. A slow, older response can't
//! overwrite the outcome of a fresher query.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use gv_core::{GridMode, GridResult, PageResult};
use gv_queries::QueryScope;

use crate::schedule::ScheduledTask;
use crate::source::FetchSource;
use crate::state::{ViewChange, ViewStore};

/// Lifecycle of the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    /// Nothing in flight
    Idle,
    /// At least one fetch in flight
    Pending,
    /// A response is being committed
    Merging,
    /// A fetch was rejected
    Failed,
}

#[derive(Debug)]
struct Tracker {
    /// Ticket of the most recently issued fetch
    issued: u64,
    /// Newest ticket that completed, successfully or not
    completed: u64,
    in_flight: usize,
    /// A debounce timer is waiting to fire
    armed: bool,
    phase: FetchPhase,
    unmounted: bool,
}

impl Tracker {
    fn outstanding(&self) -> usize {
        self.in_flight + usize::from(self.armed)
    }

    fn transition(&mut self, phase: FetchPhase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "fetch phase");
            self.phase = phase;
        }
    }
}

struct Shared {
    mode: GridMode,
    store: Arc<ViewStore>,
    source: Arc<dyn FetchSource>,
    tracker: Mutex<Tracker>,
    outstanding: watch::Sender<usize>,
}

/// Owns the debounce timer and the fetch lifecycle of one grid
pub struct FetchOrchestrator {
    shared: Arc<Shared>,
    debounce: Duration,
    timer: Mutex<Option<ScheduledTask>>,
}

impl FetchOrchestrator {
    pub fn new(store: Arc<ViewStore>, source: Arc<dyn FetchSource>, debounce: Duration) -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                mode: store.mode(),
                store,
                source,
                tracker: Mutex::new(Tracker {
                    issued: 0,
                    completed: 0,
                    in_flight: 0,
                    armed: false,
                    phase: FetchPhase::Idle,
                    unmounted: false,
                }),
                outstanding,
            }),
            debounce,
            timer: Mutex::new(None),
        }
    }

    /// Start loading rows. Must be called inside a Tokio runtime.
    pub fn mount(&self) {
        match QueryScope::for_mode(self.shared.mode) {
            QueryScope::All => self.shared.issue(QueryScope::All),
            QueryScope::Page => self.schedule(),
        }
    }

    /// React to a committed view change
    pub fn on_change(&self, change: ViewChange) {
        if !change.affects_rows() {
            return;
        }

        match self.shared.mode {
            GridMode::Server => self.schedule(),
            GridMode::Client => self.shared.store.refresh_local(),
        }
    }

    /// Cancel the pending timer and ignore every response still in flight
    pub fn unmount(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.cancel();
        }

        let mut tracker = self.shared.tracker.lock();
        tracker.unmounted = true;
        tracker.armed = false;
        let outstanding = tracker.outstanding();
        drop(tracker);
        self.shared.outstanding.send_replace(outstanding);
        debug!("orchestrator unmounted");
    }

    pub fn phase(&self) -> FetchPhase {
        self.shared.tracker.lock().phase
    }

    /// Resolve once no timer is armed and no fetch is in flight
    pub async fn settled(&self) {
        let mut outstanding = self.shared.outstanding.subscribe();
        let _ = outstanding.wait_for(|n| *n == 0).await;
    }

    /// (Re)start the trailing-edge debounce timer
    fn schedule(&self) {
        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            previous.cancel();
        }

        {
            let mut tracker = self.shared.tracker.lock();
            if tracker.unmounted {
                return;
            }
            tracker.armed = true;
            let outstanding = tracker.outstanding();
            drop(tracker);
            self.shared.outstanding.send_replace(outstanding);
        }

        let shared = Arc::clone(&self.shared);
        *timer = Some(ScheduledTask::after(self.debounce, move || {
            shared.tracker.lock().armed = false;
            shared.issue(QueryScope::Page);
        }));
        debug!(delay_ms = self.debounce.as_millis() as u64, "fetch scheduled");
    }
}

impl Shared {
    /// Build the query from the current state and fetch it in the background
    fn issue(self: &Arc<Self>, scope: QueryScope) {
        let query = self.store.query(scope);

        let ticket = {
            let mut tracker = self.tracker.lock();
            if tracker.unmounted {
                return;
            }
            tracker.issued += 1;
            tracker.in_flight += 1;
            tracker.transition(FetchPhase::Pending);
            self.store.set_loading(true);
            tracker.issued
        };
        self.publish_outstanding();

        debug!(
            ticket,
            bounded = query.is_bounded(),
            search = %query.search_term,
            sort = %query.sort_token,
            filters = %query.filter_token,
            "fetch issued"
        );

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let result = shared.source.fetch(&query).await;
            shared.complete(ticket, scope, result);
        });
    }

    /// Merge or drop a response
    fn complete(&self, ticket: u64, scope: QueryScope, result: GridResult<PageResult>) {
        let mut tracker = self.tracker.lock();
        tracker.in_flight = tracker.in_flight.saturating_sub(1);
        let newest = tracker.completed;
        tracker.completed = newest.max(ticket);

        match result {
            Ok(_) if tracker.unmounted => {
                debug!(ticket, "response after unmount dropped");
            }
            Ok(_) if ticket <= newest => {
                warn!(ticket, completed = newest, "stale response dropped");
            }
            Ok(page) => {
                tracker.transition(FetchPhase::Merging);
                let (rows, total) = (page.rows.len(), page.total_count);
                match scope {
                    QueryScope::Page => self.store.replace_page(page),
                    QueryScope::All => self.store.replace_dataset(page.rows),
                }
                info!(ticket, rows, total, "fetch merged");
            }
            Err(e) => {
                tracker.transition(FetchPhase::Failed);
                error!(ticket, error = %e, code = e.error_code(), "Error fetching data");
            }
        }

        let busy = tracker.in_flight > 0;
        tracker.transition(if busy { FetchPhase::Pending } else { FetchPhase::Idle });
        self.store.set_loading(busy);
        drop(tracker);
        self.publish_outstanding();
    }

    fn publish_outstanding(&self) {
        let outstanding = self.tracker.lock().outstanding();
        self.outstanding.send_replace(outstanding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, MockFetchSource};
    use crate::state::ViewCommand;
    use async_trait::async_trait;
    use gv_core::{GridError, Row};
    use gv_queries::QueryDescriptor;
    use serde_json::Value;

    const DEBOUNCE: Duration = Duration::from_millis(300);

    /// Answers from memory after a per-call latency
    struct ScriptedSource {
        inner: MemorySource,
        latencies: Mutex<Vec<Duration>>,
        /// Search term answered with a transport error
        failing_term: Option<String>,
    }

    impl ScriptedSource {
        fn new(rows: Vec<Row>, latencies: Vec<Duration>) -> Self {
            Self {
                inner: MemorySource::new(rows),
                latencies: Mutex::new(latencies),
                failing_term: None,
            }
        }

        fn failing_on(mut self, term: &str) -> Self {
            self.failing_term = Some(term.to_string());
            self
        }
    }

    #[async_trait]
    impl FetchSource for ScriptedSource {
        async fn fetch(&self, query: &QueryDescriptor) -> GridResult<PageResult> {
            let latency = {
                let mut latencies = self.latencies.lock();
                if latencies.is_empty() {
                    Duration::ZERO
                } else {
                    latencies.remove(0)
                }
            };
            tokio::time::sleep(latency).await;
            if self.failing_term.as_deref() == Some(query.search_term.as_str()) {
                return Err(GridError::transport("503 Service Unavailable"));
            }
            self.inner.fetch(query).await
        }
    }

    fn products() -> Vec<Row> {
        vec![
            Row::new().with("id", 1).with("title", "apple pie"),
            Row::new().with("id", 2).with("title", "banana bread"),
            Row::new().with("id", 3).with("title", "apricot jam"),
        ]
    }

    fn titles(store: &ViewStore) -> Vec<String> {
        store.read(|s| {
            s.rows
                .iter()
                .filter_map(|r| r.get("title").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
    }

    fn change(store: &ViewStore, orchestrator: &FetchOrchestrator, command: ViewCommand) {
        if let Some(change) = store.apply(command) {
            orchestrator.on_change(change);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_mount_issues_one_unbounded_fetch() {
        let store = Arc::new(ViewStore::new(GridMode::Client, 10));
        let source = Arc::new(MemorySource::new(products()));
        let orchestrator = FetchOrchestrator::new(store.clone(), source.clone(), DEBOUNCE);

        orchestrator.mount();
        assert!(store.snapshot().loading);
        orchestrator.settled().await;

        let queries = source.queries();
        assert_eq!(queries.len(), 1);
        assert!(!queries[0].is_bounded());

        let state = store.snapshot();
        assert_eq!(state.rows.len(), 3);
        assert_eq!(state.total_count, 3);
        assert!(!state.loading);
        assert_eq!(orchestrator.phase(), FetchPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_changes_stay_local() {
        let store = Arc::new(ViewStore::new(GridMode::Client, 10));
        let source = Arc::new(MemorySource::new(products()));
        let orchestrator = FetchOrchestrator::new(store.clone(), source.clone(), DEBOUNCE);

        orchestrator.mount();
        orchestrator.settled().await;

        change(&store, &orchestrator, ViewCommand::SetSearch("ap".into()));
        assert_eq!(titles(&store), vec!["apple pie", "apricot jam"]);
        assert_eq!(store.snapshot().total_count, 2);

        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_mount_fetches_after_debounce() {
        let store = Arc::new(ViewStore::new(GridMode::Server, 2));
        let source = Arc::new(MemorySource::new(products()));
        let orchestrator = FetchOrchestrator::new(store.clone(), source.clone(), DEBOUNCE);

        orchestrator.mount();
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(source.fetch_count(), 0);

        orchestrator.settled().await;
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(store.snapshot().rows.len(), 2);
        assert_eq!(store.snapshot().total_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_changes_issues_one_fetch_with_last_state() {
        let store = Arc::new(ViewStore::new(GridMode::Server, 10));
        let source = Arc::new(MemorySource::new(products()));
        let orchestrator = FetchOrchestrator::new(store.clone(), source.clone(), DEBOUNCE);

        for term in ["a", "ap", "app"] {
            change(&store, &orchestrator, ViewCommand::SetSearch(term.into()));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(source.fetch_count(), 0);

        orchestrator.settled().await;
        let queries = source.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].search_term, "app");
        assert_eq!(titles(&store), vec!["apple pie"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_column_visibility_does_not_fetch() {
        let store = Arc::new(ViewStore::new(GridMode::Server, 10));
        let source = Arc::new(MemorySource::new(products()));
        let orchestrator = FetchOrchestrator::new(store.clone(), source.clone(), DEBOUNCE);

        change(
            &store,
            &orchestrator,
            ViewCommand::SetColumnVisibility {
                field_id: "title".into(),
                visible: false,
            },
        );
        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_dropped() {
        let store = Arc::new(ViewStore::new(GridMode::Server, 10));
        // First fetch is slow, second is fast
        let source = Arc::new(ScriptedSource::new(
            products(),
            vec![Duration::from_millis(1000), Duration::from_millis(10)],
        ));
        let orchestrator = FetchOrchestrator::new(store.clone(), source, DEBOUNCE);

        change(&store, &orchestrator, ViewCommand::SetSearch("banana".into()));
        tokio::time::sleep(DEBOUNCE + Duration::from_millis(1)).await;
        assert!(store.snapshot().loading);

        change(&store, &orchestrator, ViewCommand::SetSearch("apricot".into()));
        tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;
        assert_eq!(titles(&store), vec!["apricot jam"]);
        // The slow fetch is still out
        assert!(store.snapshot().loading);

        orchestrator.settled().await;
        assert_eq!(titles(&store), vec!["apricot jam"]);
        assert!(!store.snapshot().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_success_after_newer_failure_is_dropped() {
        let store = Arc::new(ViewStore::new(GridMode::Server, 10));
        // Slow success for "banana", fast failure for "apricot"
        let source = Arc::new(
            ScriptedSource::new(products(), vec![Duration::from_millis(1000), Duration::from_millis(10)])
                .failing_on("apricot"),
        );
        let orchestrator = FetchOrchestrator::new(store.clone(), source, DEBOUNCE);

        change(&store, &orchestrator, ViewCommand::SetSearch("banana".into()));
        tokio::time::sleep(DEBOUNCE + Duration::from_millis(1)).await;
        change(&store, &orchestrator, ViewCommand::SetSearch("apricot".into()));
        tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;
        assert!(titles(&store).is_empty());

        orchestrator.settled().await;
        let state = store.snapshot();
        assert_eq!(state.search_term, "apricot");
        assert!(state.rows.is_empty());
        assert!(!state.loading);
        assert_eq!(orchestrator.phase(), FetchPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_keeps_previous_rows() {
        let store = Arc::new(ViewStore::new(GridMode::Server, 10));
        let mut mock = MockFetchSource::new();
        let mut calls = 0;
        mock.expect_fetch().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(PageResult::new(products(), 3))
            } else {
                Err(GridError::transport("connection refused"))
            }
        });
        let orchestrator = FetchOrchestrator::new(store.clone(), Arc::new(mock), DEBOUNCE);

        orchestrator.mount();
        orchestrator.settled().await;
        assert_eq!(store.snapshot().rows.len(), 3);

        change(&store, &orchestrator, ViewCommand::SetPage(1));
        orchestrator.settled().await;

        let state = store.snapshot();
        assert_eq!(state.rows.len(), 3);
        assert_eq!(state.total_count, 3);
        assert!(!state.loading);
        assert_eq!(orchestrator.phase(), FetchPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_cancels_timer_and_drops_responses() {
        let store = Arc::new(ViewStore::new(GridMode::Server, 10));
        let source = Arc::new(ScriptedSource::new(products(), vec![Duration::from_millis(500)]));
        let orchestrator = FetchOrchestrator::new(store.clone(), source, DEBOUNCE);

        orchestrator.mount();
        tokio::time::sleep(DEBOUNCE + Duration::from_millis(1)).await;
        change(&store, &orchestrator, ViewCommand::SetSearch("x".into()));
        orchestrator.unmount();

        orchestrator.settled().await;
        assert!(store.snapshot().rows.is_empty());
    }
}
