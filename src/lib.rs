//! # searchlist
//!
//! Client-side engine for incrementally fetching, paginating, and editing
//! remote searchable document lists.
//!
//! ## Design Philosophy
//!
//! searchlist is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Explicit** - State machines with payload-carrying states and an
//!   explicit transition allow-list; illegal transitions are ignored no-ops
//! - **Observable** - Consumers register observers for batches, progress,
//!   background activity, and index-level change notifications
//! - **Backend-agnostic at the seams** - The HTTP transport, request
//!   signing, and document mapping are narrow collaborators behind traits
//!
//! ## Architecture
//!
//! Three layers stack bottom-up:
//!
//! - [`DocumentFetcher`] runs one paginated query against one
//!   (index, type) resource and tracks the session's progress.
//! - [`ListItemFetcher`] wraps a document fetcher and expands every fetched
//!   document into zero or more list items via the list record's factory,
//!   optionally draining all pages before completing.
//! - [`ListEditor`] fetches the parent list record, drives an item fetcher,
//!   owns the ordered item buffer, and offers reversible edit operations
//!   (remove, move, list-specific mutations) that keep the buffer and the
//!   remote record consistent.
//!
//! Data flows downward on fetch (editor → item fetcher → document fetcher →
//! backend) and upward on results (backend → fetcher state → item batches →
//! editor observers).
//!
//! ## Quick Start
//!
//! ```ignore
//! use searchlist::{BasicFilterSet, HttpSearchBackend, ListEditor, ListId, SearchConfig};
//! use std::sync::Arc;
//!
//! let config = Arc::new(SearchConfig {
//!     root_url: "https://search.example.com".into(),
//!     ..Default::default()
//! });
//! let backend = Arc::new(HttpSearchBackend::new(config.clone())?);
//!
//! // Playlist and Track implement ListRecord and Document.
//! let mut editor: ListEditor<Playlist, Track> = ListEditor::new(
//!     backend,
//!     config,
//!     ListId::new(42),
//!     Box::new(BasicFilterSet::new()),
//! );
//! editor.observers_mut().on_all_items = Some(Box::new(|items| {
//!     println!("loaded {} items", items.len());
//! }));
//! editor.load_list_and_items().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Search backend transport
pub mod backend;
/// Configuration types
pub mod config;
/// Typed documents and per-type search helpers
pub mod document;
/// List editor and edit options
pub mod editor;
/// Error types
pub mod error;
/// Paginating document fetcher
pub mod fetcher;
/// List items, filter sets, and the list-record collaborator
pub mod list;
/// List-aware item fetcher
pub mod list_fetcher;
/// Query construction and condition builders
pub mod query;
/// Search response wire types
pub mod response;
/// AWS Signature Version 4 request signing
pub mod signing;
/// Core types
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use backend::{HttpSearchBackend, SearchBackend};
pub use config::{SearchConfig, SignatureScheme};
pub use document::Document;
pub use editor::options::{
    CustomEditAction, CustomEditOutcome, EditAction, EditMonitor, EditOption,
};
pub use editor::{EditorObservers, EditorState, EditorStateKind, ListEditor};
pub use error::{Error, Result};
pub use fetcher::{DocumentFetcher, FetcherObservers, FetcherState, FetcherStateKind};
pub use list::{BasicFilterSet, FilterSet, ListItem, ListRecord};
pub use list_fetcher::{CycleOutcome, ListFetchState, ListFetcherObservers, ListItemFetcher};
pub use query::Query;
pub use response::{Hit, Hits, SearchResponse, Shards};
pub use signing::V4Signer;
pub use types::{
    DocumentId, FetchProgress, IndexSet, ItemKey, ListId, WorkerActivity,
};
