//! Edit options and the edit monitor
//!
//! An [`EditOption`] is a titled, optionally internal unit of editing work
//! offered by a [`ListEditor`](crate::editor::ListEditor). The option carries
//! everything it needs captured at creation time — including the index
//! positions it will affect. Captured positions are not re-resolved against
//! the live list before execution, so an option created before a concurrent
//! edit operates on stale indexes; callers are expected to rebuild options
//! after every mutation.
//!
//! The [`EditMonitor`] aggregates which options are currently running and the
//! errors they produced, for application-level "background work" signaling.
//! It does not serialize or queue anything.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::list::ListItem;
use crate::types::{IndexSet, WorkerActivity};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

static NEXT_OPTION_ID: AtomicU64 = AtomicU64::new(1);

/// The mutation an edit option performs when executed
pub enum EditAction<L, D: Document> {
    /// Remove the captured items from the list
    Remove {
        /// Items to remove, captured at creation
        items: Vec<ListItem<D>>,
        /// Their positions at creation time
        indexes: IndexSet,
    },
    /// Enter exclusive move mode for the captured positions
    BeginMove {
        /// Positions of the items being moved
        indexes: IndexSet,
    },
    /// Leave exclusive move mode without mutating anything
    CancelMove {
        /// Positions captured when the move began
        indexes: IndexSet,
    },
    /// Leave exclusive move mode by removing the moving items
    FinishMoveAsRemove {
        /// The moving items, captured at creation
        items: Vec<ListItem<D>>,
        /// Their positions when the move began
        indexes: IndexSet,
    },
    /// Leave exclusive move mode by relocating the moving items
    FinishMoveTo {
        /// The moving items, captured at creation
        items: Vec<ListItem<D>>,
        /// Their positions when the move began
        indexes: IndexSet,
        /// Target position the items will occupy
        position: usize,
    },
    /// A list-specific mutation contributed by the list record
    Custom {
        /// The selection the action applies to
        items: Vec<ListItem<D>>,
        /// The mutation itself
        action: Box<dyn CustomEditAction<L, D>>,
    },
}

impl<L, D: Document> std::fmt::Debug for EditAction<L, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditAction::Remove { indexes, .. } => {
                f.debug_struct("Remove").field("indexes", indexes).finish()
            }
            EditAction::BeginMove { indexes } => {
                f.debug_struct("BeginMove").field("indexes", indexes).finish()
            }
            EditAction::CancelMove { indexes } => {
                f.debug_struct("CancelMove").field("indexes", indexes).finish()
            }
            EditAction::FinishMoveAsRemove { indexes, .. } => f
                .debug_struct("FinishMoveAsRemove")
                .field("indexes", indexes)
                .finish(),
            EditAction::FinishMoveTo {
                indexes, position, ..
            } => f
                .debug_struct("FinishMoveTo")
                .field("indexes", indexes)
                .field("position", position)
                .finish(),
            EditAction::Custom { items, .. } => {
                f.debug_struct("Custom").field("items", &items.len()).finish()
            }
        }
    }
}

/// Outcome of a custom edit action
pub struct CustomEditOutcome<D: Document> {
    /// The items the mutation touched, for change notification
    pub updated_items: Vec<ListItem<D>>,
}

/// A list-specific asynchronous mutation
///
/// The action receives the list record to mutate (written back by the editor
/// on success) and the selection it was created for.
#[async_trait]
pub trait CustomEditAction<L, D: Document>: Send {
    /// Perform the mutation
    async fn execute(
        &mut self,
        list: &mut L,
        items: &[ListItem<D>],
    ) -> Result<CustomEditOutcome<D>>;
}

/// A titled, optionally internal unit of editing work
pub struct EditOption<L, D: Document> {
    id: u64,
    /// Human-readable title derived from the selection
    pub title: String,
    /// False when the option is offered but cannot currently run
    pub is_enabled: bool,
    /// True when the option is not meant for end users (internal lifecycle
    /// steps such as begin-move)
    pub is_internal: bool,
    is_running: bool,
    errors: Vec<Error>,
    pub(crate) action: EditAction<L, D>,
}

impl<L, D: Document> EditOption<L, D> {
    /// Create an option
    pub fn new(
        title: impl Into<String>,
        is_internal: bool,
        is_enabled: bool,
        action: EditAction<L, D>,
    ) -> Self {
        Self {
            id: NEXT_OPTION_ID.fetch_add(1, Ordering::Relaxed),
            title: title.into(),
            is_enabled,
            is_internal,
            is_running: false,
            errors: Vec::new(),
            action,
        }
    }

    /// Process-unique identity of this option
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True while the option's executor is running
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Errors produced by previous executions of this option
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        self.is_running = running;
    }

    pub(crate) fn record_error(&mut self, error: Error) {
        self.errors.push(error);
    }
}

impl<L, D: Document> std::fmt::Debug for EditOption<L, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditOption")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("is_enabled", &self.is_enabled)
            .field("is_internal", &self.is_internal)
            .field("is_running", &self.is_running)
            .field("errors", &self.errors.len())
            .field("action", &self.action)
            .finish()
    }
}

#[derive(Default)]
struct MonitorInner {
    running: HashMap<u64, String>,
    errors: Vec<String>,
    on_activity: Option<Box<dyn FnMut(WorkerActivity) + Send>>,
}

/// Aggregates currently running edit options and their errors
///
/// Cloning shares the monitor; an editor and the application observe the
/// same aggregate.
#[derive(Clone, Default)]
pub struct EditMonitor {
    inner: Arc<Mutex<MonitorInner>>,
}

impl EditMonitor {
    /// Create an empty monitor
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MonitorInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register the activity observer, replacing any previous one
    ///
    /// Notified on every option start/finish with the aggregate busy state.
    pub fn set_activity_observer(&self, observer: Box<dyn FnMut(WorkerActivity) + Send>) {
        self.lock().on_activity = Some(observer);
    }

    /// True while at least one option is running
    pub fn is_busy(&self) -> bool {
        !self.lock().running.is_empty()
    }

    /// Titles of the currently running options
    pub fn running_titles(&self) -> Vec<String> {
        self.lock().running.values().cloned().collect()
    }

    /// Descriptions of every error recorded so far
    pub fn errors(&self) -> Vec<String> {
        self.lock().errors.clone()
    }

    pub(crate) fn option_started(&self, id: u64, title: &str) {
        let mut inner = self.lock();
        inner.running.insert(id, title.to_string());
        Self::notify(&mut inner);
    }

    pub(crate) fn option_finished(&self, id: u64) {
        let mut inner = self.lock();
        inner.running.remove(&id);
        Self::notify(&mut inner);
    }

    pub(crate) fn record_error(&self, title: &str, error: &Error) {
        self.lock().errors.push(format!("{title}: {error}"));
    }

    fn notify(inner: &mut MonitorInner) {
        let activity = if inner.running.is_empty() {
            WorkerActivity::Idle
        } else {
            WorkerActivity::Active
        };
        if let Some(on_activity) = &mut inner.on_activity {
            on_activity(activity);
        }
    }
}

impl std::fmt::Debug for EditMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("EditMonitor")
            .field("running", &inner.running.len())
            .field("errors", &inner.errors.len())
            .finish()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{PlaylistDoc, TrackDoc, track_item};

    fn remove_option(enabled: bool) -> EditOption<PlaylistDoc, TrackDoc> {
        EditOption::new(
            "Remove \"x\"",
            false,
            enabled,
            EditAction::Remove {
                items: vec![track_item(1, "x")],
                indexes: IndexSet::from([0]),
            },
        )
    }

    #[test]
    fn options_get_unique_ids() {
        let first = remove_option(true);
        let second = remove_option(true);
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn new_option_is_not_running_and_has_no_errors() {
        let option = remove_option(true);
        assert!(!option.is_running());
        assert!(option.errors().is_empty());
        assert!(option.is_enabled);
        assert!(!option.is_internal);
    }

    #[test]
    fn monitor_tracks_running_options() {
        let monitor = EditMonitor::new();
        assert!(!monitor.is_busy());

        monitor.option_started(1, "Remove \"a\"");
        monitor.option_started(2, "Will move \"b\"");
        assert!(monitor.is_busy());
        let mut titles = monitor.running_titles();
        titles.sort();
        assert_eq!(titles, vec!["Remove \"a\"", "Will move \"b\""]);

        monitor.option_finished(1);
        assert!(monitor.is_busy());
        monitor.option_finished(2);
        assert!(!monitor.is_busy());
    }

    #[test]
    fn monitor_notifies_activity_on_every_change() {
        let monitor = EditMonitor::new();
        let events: Arc<Mutex<Vec<WorkerActivity>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        monitor.set_activity_observer(Box::new(move |activity| {
            sink.lock().unwrap().push(activity);
        }));

        monitor.option_started(1, "a");
        monitor.option_started(2, "b");
        monitor.option_finished(1);
        monitor.option_finished(2);

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                WorkerActivity::Active,
                WorkerActivity::Active,
                WorkerActivity::Active,
                WorkerActivity::Idle
            ]
        );
    }

    #[test]
    fn monitor_aggregates_error_descriptions() {
        let monitor = EditMonitor::new();
        monitor.record_error("Remove \"a\"", &Error::EmptyResponse);

        let errors = monitor.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Remove \"a\""));
        assert!(errors[0].contains("empty search response"));
    }

    #[test]
    fn clones_share_the_same_aggregate() {
        let monitor = EditMonitor::new();
        let clone = monitor.clone();

        monitor.option_started(7, "x");
        assert!(clone.is_busy());
        clone.option_finished(7);
        assert!(!monitor.is_busy());
    }
}
