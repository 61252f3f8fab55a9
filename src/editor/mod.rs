//! List editor
//!
//! The [`ListEditor`] is the top-level façade of the engine: it fetches the
//! parent list record, drives a [`ListItemFetcher`] over the list's items,
//! owns the authoritative ordered item buffer, computes the edit options
//! available for a selection, and executes them against the list record
//! while keeping the buffer consistent.
//!
//! The editor is a state machine with payload-carrying states and an
//! explicit transition allow-list; illegal transitions are ignored no-ops.
//! Failures surface asynchronously through the failure observer — trigger
//! methods never return errors themselves.

pub mod options;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::document::{self, Document};
use crate::error::Error;
use crate::list::{FilterSet, ListItem, ListRecord, index_set_of};
use crate::list_fetcher::{CycleOutcome, ListItemFetcher};
use crate::types::{IndexSet, ListId, WorkerActivity};
use options::{EditAction, EditMonitor, EditOption};
use std::sync::Arc;

/// State of a list editor
#[derive(Debug)]
pub enum EditorState<L, D: Document> {
    /// Editor created; nothing loaded yet
    Ready,
    /// The parent list record is being fetched
    FetchingList,
    /// The parent list record arrived
    ListFetched(L),
    /// List items are being fetched
    FetchingDocuments,
    /// A batch of items arrived; more may follow
    PartialDocumentsFetched(Vec<ListItem<D>>),
    /// Every item of the session arrived (sorted when a local sort applies)
    AllDocumentsFetched(Vec<ListItem<D>>),
    /// The editor failed; observers have been notified
    Failure(Error),
}

/// Discriminant of [`EditorState`], for comparisons and logging
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorStateKind {
    /// Editor created; nothing loaded yet
    Ready,
    /// The parent list record is being fetched
    FetchingList,
    /// The parent list record arrived
    ListFetched,
    /// List items are being fetched
    FetchingDocuments,
    /// A batch of items arrived; more may follow
    PartialDocumentsFetched,
    /// Every item of the session arrived
    AllDocumentsFetched,
    /// The editor failed
    Failure,
}

impl<L, D: Document> EditorState<L, D> {
    /// The state's discriminant
    pub fn kind(&self) -> EditorStateKind {
        match self {
            EditorState::Ready => EditorStateKind::Ready,
            EditorState::FetchingList => EditorStateKind::FetchingList,
            EditorState::ListFetched(_) => EditorStateKind::ListFetched,
            EditorState::FetchingDocuments => EditorStateKind::FetchingDocuments,
            EditorState::PartialDocumentsFetched(_) => EditorStateKind::PartialDocumentsFetched,
            EditorState::AllDocumentsFetched(_) => EditorStateKind::AllDocumentsFetched,
            EditorState::Failure(_) => EditorStateKind::Failure,
        }
    }

    /// Transition allow-list; anything else is an ignored no-op
    pub fn can_transition(from: &Self, to: &Self) -> bool {
        use EditorStateKind::*;
        matches!(
            (from.kind(), to.kind()),
            (_, Ready)
                | (_, Failure)
                | (Ready, FetchingDocuments)
                | (Ready, FetchingList)
                | (FetchingList, ListFetched)
                | (ListFetched, FetchingDocuments)
                | (FetchingDocuments, PartialDocumentsFetched)
                | (FetchingDocuments, AllDocumentsFetched)
                | (PartialDocumentsFetched, FetchingDocuments)
                | (PartialDocumentsFetched, PartialDocumentsFetched)
                | (PartialDocumentsFetched, AllDocumentsFetched)
        )
    }
}

/// Observers notified as the editor progresses
pub struct EditorObservers<L, D: Document> {
    /// Fired when the parent list record arrives
    pub on_list_fetched: Option<Box<dyn FnMut(&L) + Send>>,
    /// Fired with each batch of items, in arrival order
    pub on_partial_items: Option<Box<dyn FnMut(&[ListItem<D>]) + Send>>,
    /// Fired once per fetch session with the complete (possibly locally
    /// sorted) item list
    pub on_all_items: Option<Box<dyn FnMut(&[ListItem<D>]) + Send>>,
    /// Fired when background fetch work starts and stops
    pub on_activity: Option<Box<dyn FnMut(WorkerActivity) + Send>>,
    /// Fired after a removal with the removed positions (as they were
    /// before the mutation)
    pub on_items_removed: Option<Box<dyn FnMut(&IndexSet) + Send>>,
    /// Fired when a move begins with the captured positions
    pub on_will_move_items: Option<Box<dyn FnMut(&IndexSet) + Send>>,
    /// Fired after a finished move with the origin and destination positions
    pub on_items_moved: Option<Box<dyn FnMut(&IndexSet, &IndexSet) + Send>>,
    /// Fired when a move is cancelled with the captured positions
    pub on_move_cancelled: Option<Box<dyn FnMut(&IndexSet) + Send>>,
    /// Fired after a list-specific option updated items in place
    pub on_items_updated: Option<Box<dyn FnMut(&[ListItem<D>], &IndexSet) + Send>>,
    /// Fired on terminal failure; without one, failures are only logged
    pub on_failure: Option<Box<dyn FnMut(&Error) + Send>>,
}

impl<L, D: Document> Default for EditorObservers<L, D> {
    fn default() -> Self {
        Self {
            on_list_fetched: None,
            on_partial_items: None,
            on_all_items: None,
            on_activity: None,
            on_items_removed: None,
            on_will_move_items: None,
            on_items_moved: None,
            on_move_cancelled: None,
            on_items_updated: None,
            on_failure: None,
        }
    }
}

/// Fetches, paginates, and edits one searchable list
pub struct ListEditor<L: ListRecord<D>, D: Document> {
    backend: Arc<dyn SearchBackend>,
    config: Arc<SearchConfig>,
    list_id: ListId,
    filters: Box<dyn FilterSet>,
    sort_field: Option<String>,
    sort_ascending: bool,
    state: EditorState<L, D>,
    list: Option<L>,
    items: Vec<ListItem<D>>,
    items_fetcher: Option<ListItemFetcher<L, D>>,
    moving: Option<IndexSet>,
    observers: EditorObservers<L, D>,
    monitor: EditMonitor,
}

impl<L: ListRecord<D>, D: Document> ListEditor<L, D> {
    /// Create an editor for the list with the given id
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        config: Arc<SearchConfig>,
        list_id: ListId,
        filters: Box<dyn FilterSet>,
    ) -> Self {
        Self::with_sort(backend, config, list_id, filters, None, true)
    }

    /// Create an editor with an initial sort
    pub fn with_sort(
        backend: Arc<dyn SearchBackend>,
        config: Arc<SearchConfig>,
        list_id: ListId,
        filters: Box<dyn FilterSet>,
        sort_field: Option<&str>,
        sort_ascending: bool,
    ) -> Self {
        Self {
            backend,
            config,
            list_id,
            filters,
            sort_field: sort_field.map(str::to_string),
            sort_ascending,
            state: EditorState::Ready,
            list: None,
            items: Vec::new(),
            items_fetcher: None,
            moving: None,
            observers: EditorObservers::default(),
            monitor: EditMonitor::new(),
        }
    }

    /// Id of the list this editor works on
    pub fn list_id(&self) -> ListId {
        self.list_id
    }

    /// Current state
    pub fn state(&self) -> &EditorState<L, D> {
        &self.state
    }

    /// Current state discriminant
    pub fn state_kind(&self) -> EditorStateKind {
        self.state.kind()
    }

    /// The parent list record, once fetched
    pub fn list(&self) -> Option<&L> {
        self.list.as_ref()
    }

    /// The ordered item buffer fetched so far
    pub fn items(&self) -> &[ListItem<D>] {
        &self.items
    }

    /// Documents fetched so far in the current session
    pub fn fetched_count(&self) -> usize {
        self.items_fetcher
            .as_ref()
            .map(ListItemFetcher::fetched_count)
            .unwrap_or(0)
    }

    /// Documents matching the item query, once the first page arrived
    pub fn query_count(&self) -> Option<usize> {
        self.items_fetcher
            .as_ref()
            .and_then(ListItemFetcher::total_hits)
    }

    /// Total items the editor will hold once everything is fetched
    ///
    /// Prefers the list record's own count (which can exceed the document
    /// count when documents repeat), falling back to the query total.
    pub fn total_items_count(&self) -> Option<usize> {
        self.list
            .as_ref()
            .and_then(ListRecord::item_count)
            .or_else(|| self.query_count())
    }

    /// The monitor aggregating running edit options
    pub fn monitor(&self) -> &EditMonitor {
        &self.monitor
    }

    /// Positions captured by an in-progress move, when one is active
    pub fn moving_indexes(&self) -> Option<&IndexSet> {
        self.moving.as_ref()
    }

    /// True while exclusive move mode is active
    pub fn is_moving(&self) -> bool {
        self.moving.is_some()
    }

    /// Mutable access to the editor's observers
    pub fn observers_mut(&mut self) -> &mut EditorObservers<L, D> {
        &mut self.observers
    }

    /// Return the editor to `ready`, dropping the session
    pub fn reset(&mut self) {
        self.transition(EditorState::Ready);
        self.items.clear();
        self.items_fetcher = None;
        self.moving = None;
    }

    /// Fetch the parent list record, then start fetching its items
    pub async fn load_list_and_items(&mut self) {
        if !self.transition(EditorState::FetchingList) {
            return;
        }

        match document::fetch_by_id::<L>(self.backend.as_ref(), &self.config, self.list_id.get())
            .await
        {
            Ok(list) => {
                self.transition(EditorState::ListFetched(list.clone()));
                tracing::debug!(list_id = %self.list_id, "fetched list record");
                if let Some(on_list_fetched) = &mut self.observers.on_list_fetched {
                    on_list_fetched(&list);
                }
                self.list = Some(list);
                if self.transition(EditorState::FetchingDocuments) {
                    self.fetch_documents().await;
                }
            }
            Err(error) => {
                tracing::warn!(list_id = %self.list_id, error = %error, "cannot fetch list record");
                self.transition(EditorState::Failure(Error::ListNotFound {
                    id: self.list_id.get(),
                }));
            }
        }
    }

    /// Fetch the next batch of items
    ///
    /// Resumes the current session from `partialDocumentsFetched`, or starts
    /// a fresh one when the list record is already loaded. No-op once
    /// everything is fetched.
    pub async fn load_more_items(&mut self) {
        let from = self.state_kind();
        if from == EditorStateKind::Ready && self.list.is_none() {
            tracing::debug!("no list record loaded; ignoring load_more_items");
            return;
        }
        if !self.transition(EditorState::FetchingDocuments) {
            return;
        }

        if from == EditorStateKind::PartialDocumentsFetched && self.items_fetcher.is_some() {
            self.resume_fetch().await;
        } else {
            self.fetch_documents().await;
        }
    }

    /// Change the sort order
    ///
    /// When everything is already fetched and the key sorts locally, the
    /// buffer is re-sorted and re-delivered without a network round-trip.
    /// Otherwise the fetch session restarts with the new sort.
    pub async fn sort_items(&mut self, field: &str, ascending: bool) {
        self.sort_field = Some(field.to_string());
        self.sort_ascending = ascending;

        let fetch_done = self
            .items_fetcher
            .as_ref()
            .is_some_and(ListItemFetcher::is_done);
        let local = self
            .list
            .as_ref()
            .is_some_and(|list| list.local_sort_required(field));

        if fetch_done && local {
            if let Some(list) = &self.list {
                let sorted = list.sorted_items(&self.items, field, ascending);
                self.handle_all_items(sorted);
            }
            return;
        }

        self.transition(EditorState::Ready);
        if self.transition(EditorState::FetchingDocuments) {
            self.fetch_documents().await;
        }
    }

    /// Start a fresh fetch session for the current list
    async fn fetch_documents(&mut self) {
        let Some(list) = self.list.clone() else {
            self.transition(EditorState::Ready);
            return;
        };

        self.items.clear();
        // Keep the editor's own copy of the filters in step with the
        // session's scope; edit-option gating reads it.
        self.filters.set_list_scope(list.item_query_condition());

        let local_sort = self
            .sort_field
            .as_deref()
            .is_some_and(|field| list.local_sort_required(field));
        let server_sort = if local_sort {
            None
        } else {
            self.sort_field.clone()
        };

        let mut fetcher = ListItemFetcher::new(
            self.backend.clone(),
            self.config.clone(),
            list.clone(),
            self.filters.clone(),
            server_sort.as_deref(),
            self.sort_ascending,
        );
        fetcher.set_fetch_all(list.requires_all_documents() || local_sort);
        self.items_fetcher = Some(fetcher);

        self.resume_fetch().await;
    }

    async fn resume_fetch(&mut self) {
        let outcome = match self.items_fetcher.as_mut() {
            Some(fetcher) => fetcher.run().await,
            None => {
                self.transition(EditorState::Ready);
                return;
            }
        };
        self.apply_outcome(outcome);
    }

    fn apply_outcome(&mut self, outcome: CycleOutcome<D>) {
        for batch in outcome.batches {
            if !self.transition(EditorState::PartialDocumentsFetched(batch.clone())) {
                continue;
            }
            self.items.extend(batch.iter().cloned());
            tracing::debug!(
                batch = batch.len(),
                fetched = self.fetched_count(),
                total = ?self.total_items_count(),
                "fetched a batch of list items"
            );
            if let Some(on_partial_items) = &mut self.observers.on_partial_items {
                on_partial_items(&batch);
            }
        }

        if let Some(all) = outcome.completed {
            if self
                .items_fetcher
                .as_ref()
                .is_some_and(ListItemFetcher::has_failed)
            {
                tracing::warn!(
                    collected = all.len(),
                    "item fetch finished with a failed document session"
                );
            } else {
                tracing::debug!(count = all.len(), "fetched all list items");
            }

            let sorted = match (&self.sort_field, &self.list) {
                (Some(field), Some(list)) if list.local_sort_required(field) => {
                    list.sorted_items(&all, field, self.sort_ascending)
                }
                _ => all,
            };
            self.transition(EditorState::AllDocumentsFetched(sorted.clone()));
            self.handle_all_items(sorted);
        }
    }

    /// Replace the buffer with the session's complete item list
    fn handle_all_items(&mut self, items: Vec<ListItem<D>>) {
        self.items = items;
        if let Some(on_all_items) = &mut self.observers.on_all_items {
            // Field-level borrow: the observer sees the buffer just stored.
            on_all_items(&self.items);
        }
    }

    fn transition(&mut self, to: EditorState<L, D>) -> bool {
        if !EditorState::can_transition(&self.state, &to) {
            tracing::debug!(
                from = ?self.state.kind(),
                to = ?to.kind(),
                "ignoring illegal editor transition"
            );
            return false;
        }

        let entering_fetch = matches!(
            to.kind(),
            EditorStateKind::FetchingList | EditorStateKind::FetchingDocuments
        );
        self.state = to;

        if let Some(on_activity) = &mut self.observers.on_activity {
            on_activity(if entering_fetch {
                WorkerActivity::Active
            } else {
                WorkerActivity::Idle
            });
        }

        if let EditorState::Failure(error) = &self.state {
            match &mut self.observers.on_failure {
                Some(on_failure) => on_failure(error),
                None => tracing::warn!(
                    error = %error,
                    "editor failed but no failure observer is registered"
                ),
            }
        }

        true
    }

    fn update_mutated_list(&mut self, list: L) {
        if let Some(fetcher) = &mut self.items_fetcher {
            fetcher.update_list(list.clone());
        }
        self.list = Some(list);
    }

    fn items_at(&self, indexes: &IndexSet) -> Vec<ListItem<D>> {
        indexes
            .iter()
            .filter_map(|&index| self.items.get(index).cloned())
            .collect()
    }

    /// Compute the context-sensitive set of edit options for a selection
    ///
    /// While a move is in progress only the move-lifecycle options are
    /// offered. Otherwise: remove and begin-move (when the fetch is scoped
    /// to the list), plus whatever options the list record contributes.
    /// Option index sets are captured now and go stale if the buffer
    /// mutates before execution.
    pub fn create_edit_options(&self, selection: &[ListItem<D>]) -> Vec<EditOption<L, D>> {
        let mut edit_options = Vec::new();

        if self.moving.is_some() {
            if let Some(option) = self.cancel_move_option() {
                edit_options.push(option);
            }
            if let Some(option) = self.finish_move_as_remove_option() {
                edit_options.push(option);
            }
            if let Some(option) = self.finish_move_option(0) {
                edit_options.push(option);
            }
            return edit_options;
        }

        if let Some(option) = self.remove_option(selection) {
            edit_options.push(option);
        }
        if let Some(option) = self.begin_move_option(selection) {
            edit_options.push(option);
        }
        if let Some(list) = &self.list {
            edit_options.extend(list.custom_edit_options(selection, &self.items));
        }

        edit_options
    }

    fn remove_option(&self, selection: &[ListItem<D>]) -> Option<EditOption<L, D>> {
        let list = self.list.as_ref()?;
        if selection.is_empty() || !self.filters.is_list_scoped() {
            return None;
        }

        let title = format!("Remove {}", list.title_for_items(selection));
        let indexes = index_set_of(selection, &self.items);
        let action = EditAction::Remove {
            items: selection.to_vec(),
            indexes,
        };

        if !list.can_remove_items(selection) {
            return Some(EditOption::new(title, false, false, action));
        }
        Some(EditOption::new(title, false, true, action))
    }

    fn begin_move_option(&self, selection: &[ListItem<D>]) -> Option<EditOption<L, D>> {
        let list = self.list.as_ref()?;
        if selection.is_empty()
            || !self.filters.is_list_scoped()
            || !list.can_move_items(selection)
        {
            return None;
        }

        let title = format!("Will move {}", list.title_for_items(selection));
        let indexes = index_set_of(selection, &self.items);
        Some(EditOption::new(
            title,
            true,
            true,
            EditAction::BeginMove { indexes },
        ))
    }

    fn cancel_move_option(&self) -> Option<EditOption<L, D>> {
        let list = self.list.as_ref()?;
        let indexes = self.moving.clone()?;
        let origin = *indexes.iter().next()?;

        let moving_items = self.items_at(&indexes);
        let mut title = format!("Cancel moving {}", list.title_for_items(&moving_items));
        if origin != 0 {
            title = format!("{title} from position {origin}");
        }

        Some(EditOption::new(
            title,
            true,
            true,
            EditAction::CancelMove { indexes },
        ))
    }

    fn finish_move_as_remove_option(&self) -> Option<EditOption<L, D>> {
        let list = self.list.as_ref()?;
        let indexes = self.moving.clone()?;
        let origin = *indexes.iter().next()?;

        let moving_items = self.items_at(&indexes);
        let title = format!(
            "Remove {} moving from position {origin}",
            list.title_for_items(&moving_items)
        );

        Some(EditOption::new(
            title,
            true,
            true,
            EditAction::FinishMoveAsRemove {
                items: moving_items,
                indexes,
            },
        ))
    }

    /// Option finishing the in-progress move at a specific position
    pub fn finish_move_option(&self, position: usize) -> Option<EditOption<L, D>> {
        let list = self.list.as_ref()?;
        let indexes = self.moving.clone()?;
        let origin = *indexes.iter().next()?;

        let moving_items = self.items_at(&indexes);
        let title = format!(
            "Finish moving {} from position {origin} to {position}",
            list.title_for_items(&moving_items)
        );

        Some(EditOption::new(
            title,
            true,
            true,
            EditAction::FinishMoveTo {
                items: moving_items,
                indexes,
                position,
            },
        ))
    }

    /// Execute an edit option
    ///
    /// Marks the option running, registers it with the monitor, performs
    /// its action, records any error on both the option and the monitor,
    /// and unregisters it. Disabled options are ignored. Errors are not
    /// returned; inspect [`EditOption::errors`] and the monitor.
    pub async fn execute_option(&mut self, option: &mut EditOption<L, D>) {
        if !option.is_enabled {
            tracing::debug!(title = %option.title, "ignoring disabled edit option");
            return;
        }

        option.set_running(true);
        self.monitor.option_started(option.id(), &option.title);

        let result = self.perform_action(&mut option.action).await;
        if let Err(error) = result {
            tracing::warn!(title = %option.title, error = %error, "edit option failed");
            self.monitor.record_error(&option.title, &error);
            option.record_error(error);
        }

        option.set_running(false);
        self.monitor.option_finished(option.id());
    }

    async fn perform_action(&mut self, action: &mut EditAction<L, D>) -> crate::error::Result<()> {
        match action {
            EditAction::Remove { items, indexes } => {
                let indexes = indexes.clone();
                self.remove_items_remotely(items, &indexes).await
            }
            EditAction::BeginMove { indexes } => {
                self.moving = Some(indexes.clone());
                if let Some(on_will_move_items) = &mut self.observers.on_will_move_items {
                    on_will_move_items(indexes);
                }
                Ok(())
            }
            EditAction::CancelMove { indexes } => {
                self.moving = None;
                if let Some(on_move_cancelled) = &mut self.observers.on_move_cancelled {
                    on_move_cancelled(indexes);
                }
                Ok(())
            }
            EditAction::FinishMoveAsRemove { items, indexes } => {
                self.moving = None;
                let indexes = indexes.clone();
                self.remove_items_remotely(items, &indexes).await
            }
            EditAction::FinishMoveTo {
                items,
                indexes,
                position,
            } => {
                self.moving = None;
                let Some(mut list) = self.list.clone() else {
                    return Err(Error::Other("no list record loaded".into()));
                };
                let new_items = list.move_items(items, *position, &self.items).await?;
                self.update_mutated_list(list);
                self.items = new_items;

                let destination = index_set_of(items, &self.items);
                if let Some(on_items_moved) = &mut self.observers.on_items_moved {
                    on_items_moved(indexes, &destination);
                }
                Ok(())
            }
            EditAction::Custom { items, action } => {
                let Some(mut list) = self.list.clone() else {
                    return Err(Error::Other("no list record loaded".into()));
                };
                let outcome = action.execute(&mut list, items).await?;
                self.update_mutated_list(list);

                let indexes = index_set_of(&outcome.updated_items, &self.items);
                if let Some(on_items_updated) = &mut self.observers.on_items_updated {
                    on_items_updated(&outcome.updated_items, &indexes);
                }
                Ok(())
            }
        }
    }

    /// Remove items through the list record and reconcile the buffer
    ///
    /// The reported index set is the one captured when the option was
    /// created, i.e. the positions before the mutation.
    async fn remove_items_remotely(
        &mut self,
        items: &[ListItem<D>],
        indexes: &IndexSet,
    ) -> crate::error::Result<()> {
        let Some(mut list) = self.list.clone() else {
            return Err(Error::Other("no list record loaded".into()));
        };
        let new_items = list.remove_items(items, &self.items).await?;
        self.update_mutated_list(list);
        self.items = new_items;

        if let Some(on_items_removed) = &mut self.observers.on_items_removed {
            on_items_removed(indexes);
        }
        Ok(())
    }
}
