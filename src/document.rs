//! Typed documents
//!
//! A [`Document`] is a typed view of one remote record. The trait carries the
//! per-type search configuration (type name, default field exclusions, sort
//! field mapping) and the accessors the engine needs; serialization runs
//! through serde. The free functions fetch and search documents through a
//! [`SearchBackend`] without any fetch-session state.

use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::list::FilterSet;
use crate::query::Query;
use crate::response::SearchResponse;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// A remote record returned by a search query
pub trait Document: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Type name of the document on the backend
    fn type_name() -> &'static str;

    /// Fields excluded from document sources in default searches
    fn excluded_search_fields() -> &'static [&'static str] {
        &[]
    }

    /// Map a logical sort-key name to the physical sortable field
    ///
    /// Returns `None` when the logical name is already the physical field.
    fn mapped_sort_field(_field: &str) -> Option<&'static str> {
        None
    }

    /// Stable logical id of the document, when it has one
    fn id(&self) -> Option<i64>;

    /// Human-readable name used in edit-option titles
    fn display_name(&self) -> Option<String> {
        None
    }

    /// Build the session query body from filter input
    fn build_query(filters: &dyn FilterSet) -> Query {
        Query::new(filters.to_query())
    }
}

/// Fetch one document source by id
///
/// # Errors
///
/// Returns [`Error::MissingTarget`] when the type has no name, a transport or
/// decoding error otherwise.
pub async fn fetch_by_id<D: Document>(
    backend: &dyn SearchBackend,
    config: &SearchConfig,
    id: i64,
) -> Result<D> {
    let type_name = require_type_name::<D>()?;
    let index = config.index_for_type(type_name);
    let raw = backend.fetch_source(&index, type_name, id).await?;
    Ok(serde_json::from_value(raw)?)
}

/// Fetch documents matching a set of ids
///
/// # Errors
///
/// Returns [`Error::MissingTarget`] when the type has no name, a transport or
/// decoding error otherwise.
pub async fn fetch_by_ids<D: Document>(
    backend: &dyn SearchBackend,
    config: &SearchConfig,
    ids: &[i64],
) -> Result<Vec<D>> {
    let query = json!({ "query": { "bool": { "must": { "terms": { "id": ids } } } } });
    let response = search::<D>(backend, config, &query).await?;
    Ok(response.documents())
}

/// Run a raw search query for a document type
///
/// # Errors
///
/// Returns [`Error::MissingTarget`] when the type has no name, a transport or
/// decoding error otherwise.
pub async fn search<D: Document>(
    backend: &dyn SearchBackend,
    config: &SearchConfig,
    query: &Value,
) -> Result<SearchResponse<D>> {
    let type_name = require_type_name::<D>()?;
    let index = config.index_for_type(type_name);
    let raw = backend.search(&index, type_name, query).await?;
    Ok(serde_json::from_value(raw)?)
}

/// Partially update one document's fields
///
/// # Errors
///
/// Returns [`Error::MissingTarget`] when the type has no name, a transport
/// error otherwise.
pub async fn update_fields<D: Document>(
    backend: &dyn SearchBackend,
    config: &SearchConfig,
    id: i64,
    fields: &Value,
) -> Result<()> {
    let type_name = require_type_name::<D>()?;
    let index = config.index_for_type(type_name);
    backend.update_fields(&index, type_name, id, fields).await?;
    Ok(())
}

fn require_type_name<D: Document>() -> Result<&'static str> {
    let type_name = D::type_name();
    if type_name.is_empty() {
        return Err(Error::MissingTarget {
            message: "document type has no type name".into(),
        });
    }
    Ok(type_name)
}
