//! Search backend transport
//!
//! [`SearchBackend`] is the narrow seam the fetch machines talk through:
//! run a search, fetch one document source, update document fields. The
//! production implementation, [`HttpSearchBackend`], builds the resource
//! paths, signs requests when configured, and converts raw responses into
//! JSON or structured errors. State machines never touch HTTP directly,
//! which keeps them testable against a scripted backend.

use crate::config::{SearchConfig, SignatureScheme};
use crate::error::{Error, Result};
use crate::signing::{V4Signer, sha256_hex};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;
use url::Url;

/// Longest response-body excerpt carried inside an [`Error::InvalidJson`]
const ERROR_BODY_EXCERPT: usize = 500;

/// Asynchronous search backend collaborator
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run a search query against `{index}/{type_name}/_search`
    async fn search(&self, index: &str, type_name: &str, query: &Value) -> Result<Value>;

    /// Fetch one document's source by id
    async fn fetch_source(&self, index: &str, type_name: &str, id: i64) -> Result<Value>;

    /// Partially update one document's fields
    async fn update_fields(
        &self,
        index: &str,
        type_name: &str,
        id: i64,
        fields: &Value,
    ) -> Result<Value>;
}

/// HTTP implementation of [`SearchBackend`] over reqwest
#[derive(Clone)]
pub struct HttpSearchBackend {
    config: Arc<SearchConfig>,
    client: reqwest::Client,
}

impl HttpSearchBackend {
    /// Create a backend from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the configuration is invalid and
    /// [`Error::Transport`] when the HTTP client cannot be built.
    pub fn new(config: Arc<SearchConfig>) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    fn url_for(&self, suffix: &str) -> Result<Url> {
        let root = self.config.root_url.trim_end_matches('/');
        let raw = format!("{root}{suffix}");
        Url::parse(&raw).map_err(|_| Error::InvalidUrl { url: raw })
    }

    async fn send(&self, suffix: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.url_for(suffix)?;

        let body_text = match body {
            Some(body) => serde_json::to_string(body)?,
            None => String::new(),
        };
        let method = if body.is_some() {
            reqwest::Method::POST
        } else {
            reqwest::Method::GET
        };

        let mut request = self.client.request(method.clone(), url.clone());
        if body.is_some() {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body_text.clone());
        }

        if let SignatureScheme::AwsV4 {
            region,
            access_key,
            secret_key,
            service,
        } = &self.config.signature
        {
            let signer = V4Signer::new(access_key, secret_key, region, service);
            let digest = sha256_hex(&body_text);
            let headers = signer.signed_headers(&url, &digest, method.as_str(), Utc::now())?;
            for (name, value) in headers {
                request = request.header(&name, &value);
            }
        }

        let response = request.send().await?;
        tracing::debug!(
            status = response.status().as_u16(),
            url = %url,
            "search backend response"
        );

        let text = response.text().await?;
        parse_response(&text)
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn search(&self, index: &str, type_name: &str, query: &Value) -> Result<Value> {
        let suffix = format!("/{index}/{type_name}/_search");
        self.send(&suffix, Some(query)).await
    }

    async fn fetch_source(&self, index: &str, type_name: &str, id: i64) -> Result<Value> {
        let suffix = format!("/{index}/{type_name}/{id}/_source");
        self.send(&suffix, None).await
    }

    async fn update_fields(
        &self,
        index: &str,
        type_name: &str,
        id: i64,
        fields: &Value,
    ) -> Result<Value> {
        let suffix = format!("/{index}/{type_name}/{id}/_update");
        let body = json!({ "doc": fields });
        self.send(&suffix, Some(&body)).await
    }
}

/// Decode a response body, surfacing backend-reported errors
///
/// A rejection payload is an object of exactly `{"status": .., "error": {..}}`;
/// anything else that parses is handed back as plain JSON.
fn parse_response(body: &str) -> Result<Value> {
    let parsed: Value = serde_json::from_str(body).map_err(|_| Error::InvalidJson {
        body: excerpt(body),
    })?;

    if let Some(object) = parsed.as_object()
        && object.len() == 2
        && let Some(status) = object.get("status").and_then(Value::as_u64)
        && let Some(error) = object.get("error").and_then(Value::as_object)
    {
        let field = |key: &str, fallback: &str| -> String {
            error
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(fallback)
                .to_string()
        };

        return Err(Error::QueryRejected {
            status: status as u16,
            kind: field("type", "-error type unknown-"),
            reason: field("reason", "-error reason unknown-"),
            index: field("index", "-error index unknown-"),
            resource_id: field("resource.id", "-error resource.id unknown-"),
            resource_type: field("resource.type", "-error resource.type unknown-"),
        });
    }

    Ok(parsed)
}

fn excerpt(body: &str) -> String {
    if body.len() <= ERROR_BODY_EXCERPT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_EXCERPT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> Arc<SearchConfig> {
        Arc::new(SearchConfig {
            root_url: server.uri(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn search_posts_query_to_search_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tracks/track/_search"))
            .and(body_partial_json(json!({ "from": 0, "size": 100 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": { "total": 1, "hits": [] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HttpSearchBackend::new(config_for(&server)).unwrap();
        let result = backend
            .search("tracks", "track", &json!({ "from": 0, "size": 100 }))
            .await
            .unwrap();

        assert_eq!(result["hits"]["total"], json!(1));
    }

    #[tokio::test]
    async fn fetch_source_gets_source_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/playlists/playlist/42/_source"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": 42, "name": "mix" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let backend = HttpSearchBackend::new(config_for(&server)).unwrap();
        let source = backend.fetch_source("playlists", "playlist", 42).await.unwrap();

        assert_eq!(source["name"], json!("mix"));
    }

    #[tokio::test]
    async fn update_fields_wraps_body_in_doc() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/playlists/playlist/42/_update"))
            .and(body_partial_json(json!({ "doc": { "name": "renamed" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "updated" })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HttpSearchBackend::new(config_for(&server)).unwrap();
        backend
            .update_fields("playlists", "playlist", 42, &json!({ "name": "renamed" }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn backend_error_payload_becomes_query_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/missing/track/_search"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "status": 404,
                "error": {
                    "type": "index_not_found_exception",
                    "reason": "no such index",
                    "index": "missing",
                    "resource.id": "missing",
                    "resource.type": "index_or_alias"
                }
            })))
            .mount(&server)
            .await;

        let backend = HttpSearchBackend::new(config_for(&server)).unwrap();
        let err = backend
            .search("missing", "track", &json!({}))
            .await
            .unwrap_err();

        match err {
            Error::QueryRejected {
                status,
                kind,
                reason,
                index,
                ..
            } => {
                assert_eq!(status, 404);
                assert_eq!(kind, "index_not_found_exception");
                assert_eq!(reason, "no such index");
                assert_eq!(index, "missing");
            }
            other => panic!("expected QueryRejected, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_response_is_invalid_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tracks/track/_search"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let backend = HttpSearchBackend::new(config_for(&server)).unwrap();
        let err = backend.search("tracks", "track", &json!({})).await.unwrap_err();

        match err {
            Error::InvalidJson { body } => assert!(body.contains("bad gateway")),
            other => panic!("expected InvalidJson, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn signed_requests_carry_signature_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tracks/track/_search"))
            .and(header_exists("authorization"))
            .and(header_exists("x-amz-date"))
            .and(header_exists("x-amz-content-sha256"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hits": { "hits": [] } })))
            .expect(1)
            .mount(&server)
            .await;

        let config = Arc::new(SearchConfig {
            root_url: server.uri(),
            signature: SignatureScheme::AwsV4 {
                region: "eu-central-1".into(),
                access_key: "AKIAEXAMPLE".into(),
                secret_key: "secret".into(),
                service: "es".into(),
            },
            ..Default::default()
        });
        let backend = HttpSearchBackend::new(config).unwrap();
        backend.search("tracks", "track", &json!({})).await.unwrap();
    }

    #[test]
    fn ordinary_payloads_pass_through_parse() {
        // Two keys but not the status/error shape
        let value = parse_response(r#"{"status": 200, "hits": {}}"#).unwrap();
        assert_eq!(value["status"], json!(200));
    }

    #[test]
    fn long_invalid_bodies_are_excerpted() {
        let body = "x".repeat(2000);
        match parse_response(&body) {
            Err(Error::InvalidJson { body }) => {
                assert!(body.len() < 600, "excerpt should be bounded, got {}", body.len());
            }
            other => panic!("expected InvalidJson, got: {other:?}"),
        }
    }
}
