//! Single-query paginating document fetcher
//!
//! One [`DocumentFetcher`] runs one paginated query against one
//! (index, type) resource and tracks the session's progress. The machine is
//! a tagged-union state with an explicit transition allow-list; requesting
//! an illegal transition is an ignored no-op, which is what makes `run()`
//! idempotent while a page is in flight and terminal after `done`/`failure`.
//!
//! Each `run()` call issues at most one page (`from = fetched_count`,
//! `size = page_size`). The first page pins `total_hits` for the whole
//! session. In fetch-all mode the page size is raised to the configured
//! large batch after the first page; the caller (typically a
//! [`ListItemFetcher`](crate::list_fetcher::ListItemFetcher)) re-runs the
//! fetcher until it is finished.

use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::list::FilterSet;
use crate::query::{self, Query};
use crate::response::SearchResponse;
use crate::types::{FetchProgress, WorkerActivity};
use std::sync::Arc;

/// State of a fetch session
///
/// Page-carrying states own the response that produced them, so a caller
/// inspecting the state after `run()` sees the page that drove the
/// transition.
#[derive(Debug)]
pub enum FetcherState<D> {
    /// Session created, nothing issued yet
    Ready,
    /// A page request is in flight
    Fetching,
    /// A page arrived and more hits remain
    PartialResultsFetched(SearchResponse<D>),
    /// The terminal page arrived
    Done(SearchResponse<D>),
    /// The session failed; no further paging
    Failure(Error),
}

/// Discriminant of [`FetcherState`], for comparisons and logging
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetcherStateKind {
    /// Session created, nothing issued yet
    Ready,
    /// A page request is in flight
    Fetching,
    /// A page arrived and more hits remain
    PartialResultsFetched,
    /// The terminal page arrived
    Done,
    /// The session failed
    Failure,
}

impl<D> FetcherState<D> {
    /// The state's discriminant
    pub fn kind(&self) -> FetcherStateKind {
        match self {
            FetcherState::Ready => FetcherStateKind::Ready,
            FetcherState::Fetching => FetcherStateKind::Fetching,
            FetcherState::PartialResultsFetched(_) => FetcherStateKind::PartialResultsFetched,
            FetcherState::Done(_) => FetcherStateKind::Done,
            FetcherState::Failure(_) => FetcherStateKind::Failure,
        }
    }

    /// Transition allow-list
    ///
    /// Anything not listed is illegal and ignored by the machine.
    pub fn can_transition(from: &Self, to: &Self) -> bool {
        use FetcherStateKind::*;
        matches!(
            (from.kind(), to.kind()),
            (_, Ready)
                | (Ready, Fetching)
                | (Fetching, PartialResultsFetched)
                | (PartialResultsFetched, Fetching)
                | (Fetching, Done)
                | (_, Failure)
        )
    }
}

/// Observers notified as the session progresses
///
/// The documents observer fires once per page, before any terminal
/// bookkeeping; the failure observer fires once on entering `failure`; the
/// activity observer brackets every in-flight page.
pub struct FetcherObservers<D> {
    /// Fired with each page's documents, in arrival order
    pub on_documents: Option<Box<dyn FnMut(&[D]) + Send>>,
    /// Fired when the session fails
    pub on_failure: Option<Box<dyn FnMut(&Error) + Send>>,
    /// Fired when a page request starts and ends
    pub on_activity: Option<Box<dyn FnMut(WorkerActivity) + Send>>,
}

impl<D> Default for FetcherObservers<D> {
    fn default() -> Self {
        Self {
            on_documents: None,
            on_failure: None,
            on_activity: None,
        }
    }
}

/// Runs one paginated query against one (index, type) resource
pub struct DocumentFetcher<D: Document> {
    backend: Arc<dyn SearchBackend>,
    config: Arc<SearchConfig>,
    state: FetcherState<D>,
    query: Query,
    page_size: usize,
    fetch_all: bool,
    fetched_count: usize,
    total_hits: Option<usize>,
    indices: Vec<String>,
    types: Vec<String>,
    excluded_fields: Vec<String>,
    observers: FetcherObservers<D>,
}

impl<D: Document> DocumentFetcher<D> {
    /// Create a fetch session from filter input
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        config: Arc<SearchConfig>,
        filters: &dyn FilterSet,
    ) -> Self {
        Self::with_sort(backend, config, filters, None, true)
    }

    /// Create a fetch session with a server-side sort
    pub fn with_sort(
        backend: Arc<dyn SearchBackend>,
        config: Arc<SearchConfig>,
        filters: &dyn FilterSet,
        sort_field: Option<&str>,
        sort_ascending: bool,
    ) -> Self {
        let mut session_query = D::build_query(filters);
        if let Some(field) = sort_field {
            let physical = D::mapped_sort_field(field).unwrap_or(field);
            session_query.set_sort(query::sort_clause(physical, sort_ascending));
        }

        let page_size = config.default_page_size;
        let excluded_fields = D::excluded_search_fields()
            .iter()
            .map(|field| field.to_string())
            .collect();

        Self {
            backend,
            config,
            state: FetcherState::Ready,
            query: session_query,
            page_size,
            fetch_all: false,
            fetched_count: 0,
            total_hits: None,
            indices: Vec::new(),
            types: Vec::new(),
            excluded_fields,
            observers: FetcherObservers::default(),
        }
    }

    /// Current state
    pub fn state(&self) -> &FetcherState<D> {
        &self.state
    }

    /// Current state discriminant
    pub fn state_kind(&self) -> FetcherStateKind {
        self.state.kind()
    }

    /// True once the session has failed
    pub fn has_failed(&self) -> bool {
        self.state_kind() == FetcherStateKind::Failure
    }

    /// True once the terminal page has arrived
    pub fn is_done(&self) -> bool {
        self.state_kind() == FetcherStateKind::Done
    }

    /// True once the session is over, successfully or not
    pub fn is_finished(&self) -> bool {
        self.is_done() || self.has_failed()
    }

    /// Documents fetched so far this session
    pub fn fetched_count(&self) -> usize {
        self.fetched_count
    }

    /// Total hits reported by the first page, once known
    pub fn total_hits(&self) -> Option<usize> {
        self.total_hits
    }

    /// Snapshot of the session's pagination progress
    pub fn progress(&self) -> FetchProgress {
        FetchProgress {
            fetched_count: self.fetched_count,
            total_hits: self.total_hits,
            page_size: self.page_size,
            fetch_all: self.fetch_all,
        }
    }

    /// Switch the session into fetch-all mode
    pub fn set_fetch_all(&mut self, fetch_all: bool) {
        self.fetch_all = fetch_all;
    }

    /// Override the page size for subsequent requests
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
    }

    /// Restrict the session to explicit indices
    pub fn set_indices(&mut self, indices: Vec<String>) {
        self.indices = indices;
    }

    /// Restrict the session to explicit type names
    pub fn set_types(&mut self, types: Vec<String>) {
        self.types = types;
    }

    /// Override the fields excluded from returned sources
    pub fn set_excluded_fields(&mut self, fields: Vec<String>) {
        self.excluded_fields = fields;
    }

    /// Mutable access to the session's observers
    pub fn observers_mut(&mut self) -> &mut FetcherObservers<D> {
        &mut self.observers
    }

    /// Start the session over: back to `ready` with counts cleared
    pub fn reset(&mut self) {
        self.transition(FetcherState::Ready);
        self.fetched_count = 0;
        self.total_hits = None;
        self.page_size = self.config.default_page_size;
    }

    /// Issue the next page
    ///
    /// No-op unless the machine can enter `fetching` (i.e., from `ready` or
    /// `partialResultsFetched`). Failures are reported through the failure
    /// observer and leave the machine in `failure`; nothing is thrown from
    /// here.
    pub async fn run(&mut self) {
        if !self.transition(FetcherState::Fetching) {
            return;
        }

        match self.fetch_page().await {
            Ok(response) => self.handle_page(response),
            Err(error) => {
                self.transition(FetcherState::Failure(error));
            }
        }
    }

    async fn fetch_page(&mut self) -> Result<SearchResponse<D>> {
        let (index, type_name) = self.target()?;

        self.query.set_page(self.fetched_count, self.page_size);
        self.query.set_source_excludes(&self.excluded_fields);
        if self.config.log_queries {
            tracing::debug!(query = %self.query.to_value(), "issuing search query");
        }

        let raw = self
            .backend
            .search(&index, &type_name, &self.query.to_value())
            .await?;
        let response: SearchResponse<D> = serde_json::from_value(raw)?;

        let hits = response.hits.as_ref().ok_or(Error::EmptyResponse)?;
        if self.total_hits.is_none() {
            self.total_hits = hits.total.map(|total| total as usize);
        }
        self.fetched_count += hits.hits.len();

        tracing::debug!(
            index = %index,
            type_name = %type_name,
            fetched = self.fetched_count,
            total = ?self.total_hits,
            page_size = self.page_size,
            "page fetched"
        );
        Ok(response)
    }

    fn handle_page(&mut self, response: SearchResponse<D>) {
        let documents = response.documents();
        let complete = self
            .total_hits
            .is_some_and(|total| self.fetched_count >= total);
        // A page that returns nothing while hits remain cannot make
        // progress; end the session instead of re-requesting the same
        // offset forever.
        let stalled = response.returned_count() == 0 && !complete;
        if stalled {
            tracing::warn!(
                fetched = self.fetched_count,
                total = ?self.total_hits,
                "backend returned an empty page before the reported total was reached"
            );
        }

        if complete || stalled {
            self.transition(FetcherState::Done(response));
        } else {
            self.transition(FetcherState::PartialResultsFetched(response));
            if self.fetch_all {
                self.page_size = self.config.fetch_all_page_size;
            }
        }

        self.emit_documents(&documents);
    }

    fn emit_documents(&mut self, documents: &[D]) {
        if let Some(on_documents) = &mut self.observers.on_documents {
            on_documents(documents);
        }
    }

    fn transition(&mut self, to: FetcherState<D>) -> bool {
        if !FetcherState::can_transition(&self.state, &to) {
            tracing::debug!(
                from = ?self.state.kind(),
                to = ?to.kind(),
                "ignoring illegal fetcher transition"
            );
            return false;
        }

        let was_fetching = self.state.kind() == FetcherStateKind::Fetching;
        let now_fetching = to.kind() == FetcherStateKind::Fetching;
        self.state = to;

        if now_fetching && !was_fetching {
            self.emit_activity(WorkerActivity::Active);
        } else if was_fetching && !now_fetching {
            self.emit_activity(WorkerActivity::Idle);
        }

        if let FetcherState::Failure(error) = &self.state {
            tracing::warn!(error = %error, "document fetch session failed");
            let mut failure = self.observers.on_failure.take();
            match &mut failure {
                Some(on_failure) => on_failure(error),
                None => tracing::warn!(
                    "a fetch failure occurred but no failure observer is registered"
                ),
            }
            self.observers.on_failure = failure;
        }

        true
    }

    fn emit_activity(&mut self, activity: WorkerActivity) {
        if let Some(on_activity) = &mut self.observers.on_activity {
            on_activity(activity);
        }
    }

    /// Resolve the (index, type) pair the session queries
    ///
    /// Explicit indices/types win; otherwise both derive from the document
    /// type and the config's index aliases.
    fn target(&self) -> Result<(String, String)> {
        let mut types = self.types.clone();
        if types.is_empty() && !D::type_name().is_empty() {
            types.push(D::type_name().to_string());
        }

        let mut indices = self.indices.clone();
        if indices.is_empty() {
            for type_name in &types {
                let index = self.config.index_for_type(type_name);
                if !indices.contains(&index) {
                    indices.push(index);
                }
            }
        }

        let index = indices.join(",");
        let type_name = types.join(",");
        if index.is_empty() || type_name.is_empty() {
            return Err(Error::MissingTarget {
                message:
                    "at least one index and one type name must be provided; request cannot be performed"
                        .into(),
            });
        }
        Ok((index, type_name))
    }
}
