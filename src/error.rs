//! Error types for searchlist
//!
//! This module provides error handling for the library, including:
//! - Transport and serialization failures surfaced by the HTTP backend
//! - Structured backend query rejections (status, type, reason, resource)
//! - Configuration errors (missing target resource, missing credentials)
//! - Fetch-session errors (empty response, parent list record not found)

use thiserror::Error;

/// Result type alias for searchlist operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for searchlist
///
/// Fetch-session errors are terminal for the session that raised them: the
/// owning state machine transitions to its failure state and does not retry.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "signature.secret_key")
        key: Option<String>,
    },

    /// No search target: at least one index and one type name must be known
    /// before a query can be issued
    #[error("no index or type name to query: {message}")]
    MissingTarget {
        /// Details about which part of the target is missing
        message: String,
    },

    /// HTTP transport error
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A string did not parse to a valid request URL
    #[error("invalid request URL: {url}")]
    InvalidUrl {
        /// The offending URL string
        url: String,
    },

    /// Response body was not valid JSON
    #[error("response is not valid JSON: {body}")]
    InvalidJson {
        /// The response body as text (may be truncated)
        body: String,
    },

    /// The backend rejected the query and reported a structured error payload
    #[error("query rejected by backend (HTTP {status}): {kind}: {reason}")]
    QueryRejected {
        /// HTTP status reported inside the error payload
        status: u16,
        /// Backend error type (e.g., "index_not_found_exception")
        kind: String,
        /// Human-readable reason string from the backend
        reason: String,
        /// Index the error refers to, when reported
        index: String,
        /// Resource id the error refers to, when reported
        resource_id: String,
        /// Resource type the error refers to, when reported
        resource_type: String,
    },

    /// A search returned a response with no hits section
    #[error("empty search response")]
    EmptyResponse,

    /// The parent list record could not be fetched
    #[error("cannot fetch list record {id}")]
    ListNotFound {
        /// The list record id that could not be fetched
        id: i64,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Convenience constructor for signing/credential configuration errors
    pub fn signing_config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// True when the error originated in the backend's own error payload
    /// rather than in transport or decoding
    pub fn is_query_rejection(&self) -> bool {
        matches!(self, Error::QueryRejected { .. })
    }
}
