//! Configuration types for searchlist
//!
//! A [`SearchConfig`] is created once by the embedding application and passed
//! explicitly to the backend and the fetch/edit machines. There is no global
//! client state.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Request-signing scheme applied to outgoing backend requests
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum SignatureScheme {
    /// Requests are sent unsigned
    #[default]
    None,
    /// AWS Signature Version 4 signing
    AwsV4 {
        /// AWS region (e.g., "eu-central-1")
        region: String,
        /// Access key id
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Service name the credential is scoped to (default: "es")
        #[serde(default = "default_service")]
        service: String,
    },
}

/// Main configuration for the search client
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Root URL of the search backend (default: "http://localhost:9200")
    #[serde(default = "default_root_url")]
    pub root_url: String,

    /// Per-request timeout (default: 10 seconds)
    #[serde(default = "default_request_timeout", with = "duration_secs")]
    pub request_timeout: Duration,

    /// Request-signing scheme (default: unsigned)
    #[serde(default)]
    pub signature: SignatureScheme,

    /// Page size for the first page of a fetch session (default: 100)
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Page size used after the first page once a session is in fetch-all
    /// mode (default: 500)
    ///
    /// First page stays small to minimize time-to-first-result; later pages
    /// drain large result sets in bigger batches.
    #[serde(default = "default_fetch_all_page_size")]
    pub fetch_all_page_size: usize,

    /// Log full query bodies at debug level (default: false)
    #[serde(default)]
    pub log_queries: bool,

    /// Type-name to index-name aliases
    ///
    /// A type with no entry here queries an index of the same name.
    #[serde(default)]
    pub index_aliases: HashMap<String, String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            root_url: default_root_url(),
            request_timeout: default_request_timeout(),
            signature: SignatureScheme::default(),
            default_page_size: default_page_size(),
            fetch_all_page_size: default_fetch_all_page_size(),
            log_queries: false,
            index_aliases: HashMap::new(),
        }
    }
}

impl SearchConfig {
    /// Resolve the index name a type's documents live in
    pub fn index_for_type(&self, type_name: &str) -> String {
        self.index_aliases
            .get(type_name)
            .cloned()
            .unwrap_or_else(|| type_name.to_string())
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the root URL is empty, a page size is
    /// zero, or the signing scheme is missing credentials.
    pub fn validate(&self) -> Result<()> {
        if self.root_url.is_empty() {
            return Err(Error::Config {
                message: "root_url must not be empty".into(),
                key: Some("root_url".into()),
            });
        }
        if self.default_page_size == 0 {
            return Err(Error::Config {
                message: "default_page_size must be greater than zero".into(),
                key: Some("default_page_size".into()),
            });
        }
        if self.fetch_all_page_size == 0 {
            return Err(Error::Config {
                message: "fetch_all_page_size must be greater than zero".into(),
                key: Some("fetch_all_page_size".into()),
            });
        }
        if let SignatureScheme::AwsV4 {
            region,
            access_key,
            secret_key,
            ..
        } = &self.signature
        {
            if region.is_empty() {
                return Err(Error::signing_config(
                    "AWS region must be provided",
                    "signature.region",
                ));
            }
            if access_key.is_empty() {
                return Err(Error::signing_config(
                    "AWS access key must be provided",
                    "signature.access_key",
                ));
            }
            if secret_key.is_empty() {
                return Err(Error::signing_config(
                    "AWS secret key must be provided",
                    "signature.secret_key",
                ));
            }
        }
        Ok(())
    }
}

fn default_root_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_page_size() -> usize {
    100
}

fn default_fetch_all_page_size() -> usize {
    500
}

fn default_service() -> String {
    "es".to_string()
}

/// Serialize [`Duration`] fields as whole seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
