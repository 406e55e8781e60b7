//! Sparse-vector index service.
//!
//! The index stores one sparse vector per catalog record, built offline
//! from the same n-gram vocabulary the query encoder uses, and scores
//! queries server-side with IDF weighting (BM25-style). [`SparseIndex`] is
//! the seam retrievers query through; [`QdrantClient`] implements it over
//! Qdrant's REST API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use refrain_core::SparseVector;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::IndexConfig;
use crate::error::{RetrievalError, RetrievalResult};
use crate::resilience::RetryPolicy;

/// One match returned by the index, best first.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoredPoint {
    pub score: f32,
    #[serde(default)]
    pub payload: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ScoredPoint {
    /// Look up a payload value by key.
    pub fn payload_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.as_ref().and_then(|payload| payload.get(key))
    }
}

/// A top-k nearest-neighbour service over sparse vectors.
#[async_trait]
pub trait SparseIndex: Send + Sync + fmt::Debug {
    /// Return at most `top_k` points of `collection` ranked against
    /// `vector`, with payloads attached, in descending score order.
    async fn query_sparse(
        &self,
        collection: &str,
        vector: &SparseVector,
        top_k: usize,
    ) -> RetrievalResult<Vec<ScoredPoint>>;
}

// ---------------------------------------------------------------------------
// Qdrant wire types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a SparseVector,
    using: &'a str,
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    points: Vec<ScoredPoint>,
}

/// Summary of a collection as reported by the index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionInfo {
    pub status: String,
    #[serde(default)]
    pub points_count: Option<u64>,
}

/// Qdrant REST client.
#[derive(Debug, Clone)]
pub struct QdrantClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    vector_name: String,
    retry: RetryPolicy,
}

impl QdrantClient {
    /// Create a client from the `index` configuration section.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &IndexConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("refrain/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            vector_name: config.vector_name.clone(),
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn query_once(
        &self,
        collection: &str,
        body: &QueryRequest<'_>,
    ) -> RetrievalResult<Vec<ScoredPoint>> {
        let response = self
            .request(
                Method::POST,
                &format!("/collections/{collection}/points/query"),
            )
            .json(body)
            .send()
            .await?;

        let envelope: Envelope<QueryResult> = read_json(response).await?;
        Ok(envelope.result.points)
    }

    /// Check that the service is up. Returns its health message.
    pub async fn health(&self) -> RetrievalResult<String> {
        let response = self.request(Method::GET, "/healthz").send().await?;
        let response = check_status(response).await?;
        Ok(response.text().await?.trim().to_string())
    }

    /// Fetch status and point count for `collection`.
    pub async fn collection_info(&self, collection: &str) -> RetrievalResult<CollectionInfo> {
        let response = self
            .request(Method::GET, &format!("/collections/{collection}"))
            .send()
            .await?;
        let envelope: Envelope<CollectionInfo> = read_json(response).await?;
        Ok(envelope.result)
    }
}

#[async_trait]
impl SparseIndex for QdrantClient {
    async fn query_sparse(
        &self,
        collection: &str,
        vector: &SparseVector,
        top_k: usize,
    ) -> RetrievalResult<Vec<ScoredPoint>> {
        let body = QueryRequest {
            query: vector,
            using: &self.vector_name,
            limit: top_k,
            with_payload: true,
        };

        self.retry
            .run(collection, || self.query_once(collection, &body))
            .await
    }
}

/// Map a non-success status onto [`RetrievalError`].
fn status_error(status: StatusCode, body: String) -> RetrievalError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        RetrievalError::RateLimited
    } else {
        RetrievalError::Http {
            status: status.as_u16(),
            message: body,
        }
    }
}

async fn check_status(response: Response) -> RetrievalResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, body))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> RetrievalResult<T> {
    serde_json::from_slice(body).map_err(|e| RetrievalError::Parse {
        message: e.to_string(),
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> RetrievalResult<T> {
    let response = check_status(response).await?;
    let body = response.bytes().await?;
    parse_body(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> IndexConfig {
        IndexConfig {
            url: "http://localhost:6333/".to_string(),
            api_key: Some("secret".to_string()),
            ..IndexConfig::default()
        }
    }

    #[test]
    fn test_client_creation() {
        let client = QdrantClient::new(&test_config()).unwrap();
        assert_eq!(client.base_url, "http://localhost:6333");
        assert_eq!(client.vector_name, "bm25");
    }

    #[test]
    fn test_query_request_body() {
        let vector = SparseVector::new(vec![3, 8], vec![1.0, 2.0]).unwrap();
        let body = QueryRequest {
            query: &vector,
            using: "bm25",
            limit: 5,
            with_payload: true,
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "query": {"indices": [3, 8], "values": [1.0, 2.0]},
                "using": "bm25",
                "limit": 5,
                "with_payload": true
            })
        );
    }

    #[test]
    fn test_query_response_deserialize() {
        let json = r#"{
            "result": {
                "points": [
                    {"id": 17, "version": 2, "score": 12.5,
                     "payload": {"track_name": "Momentum", "artist_name": "Don Diablo"}},
                    {"id": 4, "version": 2, "score": 3.25, "payload": null}
                ]
            },
            "status": "ok",
            "time": 0.0012
        }"#;
        let envelope: Envelope<QueryResult> = serde_json::from_str(json).unwrap();
        let points = envelope.result.points;

        assert_eq!(points.len(), 2);
        assert!((points[0].score - 12.5).abs() < f32::EPSILON);
        assert_eq!(
            points[0].payload_value("track_name"),
            Some(&serde_json::json!("Momentum"))
        );
        assert!(points[1].payload_value("track_name").is_none());
    }

    #[test]
    fn test_rate_limit_status_is_transient() {
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, String::new());
        assert!(matches!(err, RetrievalError::RateLimited));
        assert!(err.is_transient());
    }

    #[test]
    fn test_server_error_status_keeps_body() {
        let err = status_error(StatusCode::SERVICE_UNAVAILABLE, "warming up".to_string());
        assert!(matches!(
            err,
            RetrievalError::Http { status: 503, ref message } if message == "warming up"
        ));
        assert!(err.is_transient());
    }

    #[test]
    fn test_missing_collection_status_is_permanent() {
        let err = status_error(StatusCode::NOT_FOUND, "Collection not found".to_string());
        assert!(matches!(err, RetrievalError::Http { status: 404, .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_non_json_body_is_a_parse_error() {
        let result: RetrievalResult<Envelope<QueryResult>> = parse_body(b"<html>bad gateway</html>");
        let err = result.unwrap_err();
        assert!(matches!(err, RetrievalError::Parse { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_collection_info_deserialize() {
        let json = r#"{"result": {"status": "green", "points_count": 48210, "segments_count": 4}}"#;
        let envelope: Envelope<CollectionInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.result.status, "green");
        assert_eq!(envelope.result.points_count, Some(48210));
    }
}
