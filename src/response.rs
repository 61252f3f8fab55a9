//! Search response wire types
//!
//! Typed view of a search backend response. Unknown fields are ignored and
//! every section is optional, matching how defensively the responses are
//! consumed: a response without a `hits` section is treated as empty (and is
//! an error for a fetch session).

use serde::Deserialize;

/// Top-level search response
#[derive(Clone, Debug, Deserialize)]
pub struct SearchResponse<D> {
    /// Shard bookkeeping reported by the backend
    #[serde(default, rename = "_shards")]
    pub shards: Option<Shards>,
    /// The hits section; absent on malformed responses
    pub hits: Option<Hits<D>>,
    /// Whether the query timed out server-side
    #[serde(default)]
    pub timed_out: Option<bool>,
    /// Server-side query duration in milliseconds
    #[serde(default)]
    pub took: Option<f64>,
}

impl<D: Clone> SearchResponse<D> {
    /// Documents carried by this page, in hit order
    pub fn documents(&self) -> Vec<D> {
        self.hits
            .as_ref()
            .map(|hits| {
                hits.hits
                    .iter()
                    .filter_map(|hit| hit.source.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of hits returned on this page
    pub fn returned_count(&self) -> usize {
        self.hits.as_ref().map(|hits| hits.hits.len()).unwrap_or(0)
    }

    /// Total hits matching the query, when reported
    pub fn total(&self) -> Option<usize> {
        self.hits.as_ref().and_then(|hits| hits.total).map(|t| t as usize)
    }
}

/// The hits section of a response
#[derive(Clone, Debug, Deserialize)]
pub struct Hits<D> {
    /// Total number of documents matching the query
    #[serde(default)]
    pub total: Option<u64>,
    /// Highest relevance score on this page
    #[serde(default)]
    pub max_score: Option<f64>,
    /// The page's hits
    #[serde(default = "Vec::new")]
    pub hits: Vec<Hit<D>>,
}

/// One hit: document header plus the typed source document
#[derive(Clone, Debug, Deserialize)]
pub struct Hit<D> {
    /// Backend document id
    #[serde(default, rename = "_id")]
    pub id: Option<String>,
    /// Index the hit came from
    #[serde(default, rename = "_index")]
    pub index: Option<String>,
    /// Type name of the hit
    #[serde(default, rename = "_type")]
    pub doc_type: Option<String>,
    /// Relevance score
    #[serde(default, rename = "_score")]
    pub score: Option<f64>,
    /// The typed document source; absent when excluded or filtered
    #[serde(rename = "_source")]
    pub source: Option<D>,
}

/// Shard bookkeeping
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Shards {
    /// Shards that failed to answer
    #[serde(default)]
    pub failed: Option<u32>,
    /// Shards that answered successfully
    #[serde(default)]
    pub successful: Option<u32>,
    /// Total shards queried
    #[serde(default)]
    pub total: Option<u32>,
}
