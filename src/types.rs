//! Core types for searchlist

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Set of positions into an ordered item list, used for change notifications
/// (insert/remove/move). Ordered so callers can apply removals back-to-front.
pub type IndexSet = BTreeSet<usize>;

/// Logical identifier of a remote document
///
/// Multiple list items may share the same `DocumentId` when one document
/// expands to several entries; item identity is [`ItemKey`], not this id.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DocumentId(pub i64);

impl DocumentId {
    /// Sentinel id for documents whose source reported no id
    pub const UNKNOWN: DocumentId = DocumentId(-1);

    /// Create a new DocumentId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for DocumentId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<DocumentId> for i64 {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for DocumentId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Identifier of a parent list record
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ListId(pub i64);

impl ListId {
    /// Create a new ListId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ListId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ListId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable surrogate identity for a list item
///
/// Two items created from the same document (or carrying the same
/// [`DocumentId`]) are still distinct entries in the list; equality of list
/// items is defined by this key. Keys are unique within the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey(u64);

static NEXT_ITEM_KEY: AtomicU64 = AtomicU64::new(1);

impl ItemKey {
    /// Allocate the next process-unique key
    pub fn next() -> Self {
        Self(NEXT_ITEM_KEY.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw key value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Background-activity signal raised around network work
///
/// Observers receive `Active` when a machine enters a fetching state and
/// `Idle` when it leaves it, suitable for driving a spinner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerActivity {
    /// A fetch is in flight
    Active,
    /// No fetch is in flight
    Idle,
}

/// Snapshot of a fetch session's pagination progress
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchProgress {
    /// Documents fetched so far in this session (monotonically non-decreasing)
    pub fetched_count: usize,
    /// Total hits reported by the first page, once known
    ///
    /// Captured once per session; the backend's true total may drift under
    /// concurrent writes. That staleness window is accepted, not corrected.
    pub total_hits: Option<usize>,
    /// Page size the next request will use
    pub page_size: usize,
    /// Whether the session drains all pages before reporting completion
    pub fetch_all: bool,
}

impl FetchProgress {
    /// True once every reported hit has been fetched
    pub fn is_complete(&self) -> bool {
        match self.total_hits {
            Some(total) => self.fetched_count >= total,
            None => false,
        }
    }

    /// Hits still to fetch, when the total is known
    pub fn remaining(&self) -> Option<usize> {
        self.total_hits
            .map(|total| total.saturating_sub(self.fetched_count))
    }
}
