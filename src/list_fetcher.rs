//! List-aware fetcher
//!
//! A [`ListItemFetcher`] wraps one [`DocumentFetcher`] per fetch cycle and
//! expands every fetched document into zero or more [`ListItem`]s through the
//! list record's item factory. One `run()` call fetches a single page, or —
//! in fetch-all mode — keeps resuming the underlying fetcher until it is
//! finished.
//!
//! An underlying failure does not propagate as fatal: the cycle completes
//! with whatever items were collected, and the failed state stays observable
//! through [`has_failed`](ListItemFetcher::has_failed). Downstream consumers
//! rely on always receiving the completion callback.

use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::document::Document;
use crate::fetcher::{DocumentFetcher, FetcherState};
use crate::list::{FilterSet, ListItem, ListRecord};
use crate::types::{FetchProgress, WorkerActivity};
use std::sync::Arc;

/// State of a list fetch cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListFetchState {
    /// Cycle created, nothing fetched yet
    Ready,
    /// The underlying fetcher is working on a page
    Fetching,
    /// A page has been expanded and delivered; more may follow
    Standby,
    /// The cycle is over; the completion observer has fired
    Done,
}

impl ListFetchState {
    /// Transition allow-list; anything else is an ignored no-op
    pub fn can_transition(from: ListFetchState, to: ListFetchState) -> bool {
        use ListFetchState::*;
        matches!(
            (from, to),
            (_, Ready)
                | (Ready, Fetching)
                | (Fetching, Standby)
                | (Standby, Fetching)
                | (Fetching, Done)
                | (Standby, Done)
        )
    }
}

/// Observers notified as a cycle progresses
pub struct ListFetcherObservers<D: Document> {
    /// Fired with each page's expanded items, in arrival order
    pub on_items: Option<Box<dyn FnMut(&[ListItem<D>]) + Send>>,
    /// Fired exactly once per cycle with every item collected
    pub on_complete: Option<Box<dyn FnMut(&[ListItem<D>]) + Send>>,
    /// Fired when the cycle starts and stops working
    pub on_activity: Option<Box<dyn FnMut(WorkerActivity) + Send>>,
}

impl<D: Document> Default for ListFetcherObservers<D> {
    fn default() -> Self {
        Self {
            on_items: None,
            on_complete: None,
            on_activity: None,
        }
    }
}

/// What one `run()` call produced, for callers that drive the cycle directly
#[derive(Debug)]
pub struct CycleOutcome<D: Document> {
    /// Item batches processed during this call, one per page
    pub batches: Vec<Vec<ListItem<D>>>,
    /// Every item collected this cycle, set when the cycle finished
    pub completed: Option<Vec<ListItem<D>>>,
}

impl<D: Document> Default for CycleOutcome<D> {
    fn default() -> Self {
        Self {
            batches: Vec::new(),
            completed: None,
        }
    }
}

enum PageStep<D> {
    Page { documents: Vec<D>, terminal: bool },
    Failed,
    Idle,
}

/// Fetches a list's items by expanding paginated document results
pub struct ListItemFetcher<L: ListRecord<D>, D: Document> {
    backend: Arc<dyn SearchBackend>,
    config: Arc<SearchConfig>,
    list: L,
    filters: Box<dyn FilterSet>,
    sort_field: Option<String>,
    sort_ascending: bool,
    fetch_all: bool,
    state: ListFetchState,
    fetcher: Option<DocumentFetcher<D>>,
    /// Generation counter; pages carrying an older value are discarded
    cycle: u64,
    items: Vec<ListItem<D>>,
    observers: ListFetcherObservers<D>,
}

impl<L: ListRecord<D>, D: Document> ListItemFetcher<L, D> {
    /// Create a fetcher for one list's items
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        config: Arc<SearchConfig>,
        list: L,
        filters: Box<dyn FilterSet>,
        sort_field: Option<&str>,
        sort_ascending: bool,
    ) -> Self {
        Self {
            backend,
            config,
            list,
            filters,
            sort_field: sort_field.map(str::to_string),
            sort_ascending,
            fetch_all: false,
            state: ListFetchState::Ready,
            fetcher: None,
            cycle: 0,
            items: Vec::new(),
            observers: ListFetcherObservers::default(),
        }
    }

    /// Current cycle state
    pub fn state(&self) -> ListFetchState {
        self.state
    }

    /// True once the cycle has delivered its completion callback
    pub fn is_done(&self) -> bool {
        self.state == ListFetchState::Done
    }

    /// True when the underlying document fetch failed
    pub fn has_failed(&self) -> bool {
        self.fetcher
            .as_ref()
            .is_some_and(DocumentFetcher::has_failed)
    }

    /// Documents fetched so far by the underlying fetcher
    pub fn fetched_count(&self) -> usize {
        self.fetcher
            .as_ref()
            .map(DocumentFetcher::fetched_count)
            .unwrap_or(0)
    }

    /// Total hits reported for the underlying query, once known
    pub fn total_hits(&self) -> Option<usize> {
        self.fetcher.as_ref().and_then(DocumentFetcher::total_hits)
    }

    /// Pagination progress of the underlying fetcher, once one exists
    pub fn progress(&self) -> Option<FetchProgress> {
        self.fetcher.as_ref().map(DocumentFetcher::progress)
    }

    /// Items collected so far this cycle
    pub fn items(&self) -> &[ListItem<D>] {
        &self.items
    }

    /// Drain every page before completing instead of stopping per page
    pub fn set_fetch_all(&mut self, fetch_all: bool) {
        self.fetch_all = fetch_all;
    }

    /// Replace the list record after a remote mutation
    pub fn update_list(&mut self, list: L) {
        self.list = list;
    }

    /// Mutable access to the cycle's observers
    pub fn observers_mut(&mut self) -> &mut ListFetcherObservers<D> {
        &mut self.observers
    }

    /// Abandon the current cycle and return to `ready`
    ///
    /// The superseded cycle's pages are rejected by the generation counter
    /// if they surface afterwards.
    pub fn reset(&mut self) {
        self.transition(ListFetchState::Ready);
        self.cycle += 1;
        self.fetcher = None;
        self.items.clear();
    }

    /// Start or resume the cycle
    ///
    /// Fetches one page, or every remaining page in fetch-all mode. No-op
    /// when the cycle cannot enter `fetching` (e.g., already done).
    pub async fn run(&mut self) -> CycleOutcome<D> {
        let mut outcome = CycleOutcome::default();
        if !self.transition(ListFetchState::Fetching) {
            return outcome;
        }

        loop {
            if self.fetcher.is_none() {
                self.start_cycle();
            }

            let step = match self.fetcher.as_mut() {
                Some(fetcher) => {
                    fetcher.run().await;
                    match fetcher.state() {
                        FetcherState::PartialResultsFetched(response) => PageStep::Page {
                            documents: response.documents(),
                            terminal: false,
                        },
                        FetcherState::Done(response) => PageStep::Page {
                            documents: response.documents(),
                            terminal: true,
                        },
                        FetcherState::Failure(_) => PageStep::Failed,
                        _ => PageStep::Idle,
                    }
                }
                None => PageStep::Idle,
            };

            match step {
                PageStep::Page {
                    documents,
                    terminal,
                } => {
                    let cycle = self.cycle;
                    if let Some(batch) = self.process_page(cycle, &documents) {
                        outcome.batches.push(batch);
                    }
                    if terminal {
                        outcome.completed = Some(self.finish());
                        break;
                    }
                    if self.fetch_all && self.transition(ListFetchState::Fetching) {
                        continue;
                    }
                    break;
                }
                PageStep::Failed => {
                    tracing::warn!(
                        collected = self.items.len(),
                        "underlying document fetch failed; completing with partial results"
                    );
                    outcome.completed = Some(self.finish());
                    break;
                }
                PageStep::Idle => break,
            }
        }

        outcome
    }

    fn start_cycle(&mut self) {
        self.cycle += 1;
        let mut filters = self.filters.clone();
        filters.set_list_scope(self.list.item_query_condition());

        let mut fetcher = DocumentFetcher::with_sort(
            self.backend.clone(),
            self.config.clone(),
            filters.as_ref(),
            self.sort_field.as_deref(),
            self.sort_ascending,
        );
        fetcher.set_fetch_all(self.fetch_all);
        self.fetcher = Some(fetcher);
    }

    /// Expand one page into items and deliver the batch
    ///
    /// Pages from a superseded cycle are discarded.
    fn process_page(&mut self, cycle: u64, documents: &[D]) -> Option<Vec<ListItem<D>>> {
        if cycle != self.cycle {
            tracing::debug!(
                stale_cycle = cycle,
                current_cycle = self.cycle,
                "discarding page from a superseded fetch cycle"
            );
            return None;
        }

        let mut batch = Vec::new();
        for document in documents {
            batch.extend(self.list.create_list_items(document));
        }

        self.items.extend(batch.iter().cloned());
        self.transition(ListFetchState::Standby);
        if let Some(on_items) = &mut self.observers.on_items {
            on_items(&batch);
        }
        Some(batch)
    }

    fn finish(&mut self) -> Vec<ListItem<D>> {
        self.transition(ListFetchState::Done);
        let items = self.items.clone();
        if let Some(on_complete) = &mut self.observers.on_complete {
            on_complete(&items);
        }
        items
    }

    fn transition(&mut self, to: ListFetchState) -> bool {
        if !ListFetchState::can_transition(self.state, to) {
            tracing::debug!(from = ?self.state, to = ?to, "ignoring illegal list-fetch transition");
            return false;
        }

        let was_fetching = self.state == ListFetchState::Fetching;
        let now_fetching = to == ListFetchState::Fetching;
        self.state = to;

        if now_fetching && !was_fetching {
            self.emit_activity(WorkerActivity::Active);
        } else if was_fetching && !now_fetching {
            self.emit_activity(WorkerActivity::Idle);
        }
        true
    }

    fn emit_activity(&mut self, activity: WorkerActivity) {
        if let Some(on_activity) = &mut self.observers.on_activity {
            on_activity(activity);
        }
    }
}
