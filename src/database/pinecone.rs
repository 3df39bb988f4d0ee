use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::error::ProviderError;
use crate::llm::semantic_search::{InstructorMetadata, RetrievedRecord};
use crate::providers::traits::Retriever;

const API_VERSION: &str = "2024-07";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: u32,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

/// Metadata is kept untyped so one oddly shaped record does not fail the
/// whole query.
#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

impl From<QueryMatch> for RetrievedRecord {
    fn from(m: QueryMatch) -> Self {
        let metadata = m
            .metadata
            .map(|fields| InstructorMetadata::from_fields(|key| fields.get(key)))
            .unwrap_or_default();
        RetrievedRecord::new(m.id, m.score, metadata)
    }
}

#[derive(Deserialize)]
struct IndexDescription {
    host: String,
}

/// Queries a Pinecone serverless index over its REST API.
pub struct PineconeIndex {
    client: Client,
    api_key: String,
    controller_url: String,
    /// Unset while the index does not exist; queries are then empty and the
    /// control plane is asked again next time.
    host: OnceCell<String>,
    name: String,
    namespace: String,
    top_k: u32,
}

impl PineconeIndex {
    /// Uses the configured data-plane host, or resolves it through the
    /// control plane.
    pub async fn connect(config: &IndexConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .pinecone_api_key
            .clone()
            .ok_or_else(|| ProviderError::Retrieval("PINECONE_API_KEY not set".to_string()))?;
        let client = Client::new();

        let host = match &config.pinecone_host {
            Some(host) => Some(host.clone()),
            None => describe_index(&client, &api_key, &config.pinecone_controller_url, &config.name).await?,
        };

        match &host {
            Some(host) => info!(index = %config.name, namespace = %config.namespace, host = %host, "Using Pinecone index"),
            None => warn!(index = %config.name, "Pinecone index not found; queries return no matches until it exists"),
        }

        Ok(Self {
            client,
            api_key,
            controller_url: config.pinecone_controller_url.clone(),
            host: OnceCell::new_with(host),
            name: config.name.clone(),
            namespace: config.namespace.clone(),
            top_k: config.top_k,
        })
    }

    pub fn host(&self) -> Option<&str> {
        self.host.get().map(String::as_str)
    }

    async fn resolve_host(&self) -> Result<Option<&str>, ProviderError> {
        if let Some(host) = self.host.get() {
            return Ok(Some(host));
        }

        match describe_index(&self.client, &self.api_key, &self.controller_url, &self.name).await? {
            Some(host) => {
                info!(index = %self.name, host = %host, "Pinecone index now available");
                // A concurrent query may have won the race; either value is the same host
                let _ = self.host.set(host);
                Ok(self.host.get().map(String::as_str))
            }
            None => {
                debug!(index = %self.name, "Pinecone index still missing");
                Ok(None)
            }
        }
    }
}

async fn describe_index(
    client: &Client,
    api_key: &str,
    controller_url: &str,
    name: &str,
) -> Result<Option<String>, ProviderError> {
    let url = format!("{}/indexes/{}", controller_url.trim_end_matches('/'), name);
    let response = client
        .get(&url)
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", API_VERSION)
        .send()
        .await
        .map_err(|e| ProviderError::Retrieval(format!("Failed to describe index {}: {}", name, e)))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Retrieval(format!(
            "Describe index {} failed: Status {}, Body: {}",
            name, status, body
        )));
    }

    let description: IndexDescription = response
        .json()
        .await
        .map_err(|e| ProviderError::Retrieval(format!("Invalid describe_index response: {}", e)))?;
    Ok(Some(description.host))
}

fn query_url(host: &str) -> String {
    if host.contains("://") {
        format!("{}/query", host.trim_end_matches('/'))
    } else {
        format!("https://{}/query", host.trim_end_matches('/'))
    }
}

#[async_trait]
impl Retriever for PineconeIndex {
    async fn query(&self, vector: &[f32]) -> Result<Vec<RetrievedRecord>, ProviderError> {
        let Some(host) = self.resolve_host().await? else {
            return Ok(Vec::new());
        };

        let response = self
            .client
            .post(query_url(host))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&QueryRequest {
                namespace: &self.namespace,
                vector,
                top_k: self.top_k,
                include_metadata: true,
            })
            .send()
            .await
            .map_err(|e| ProviderError::Retrieval(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!(index = %self.name, namespace = %self.namespace, "Index or namespace not found");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Retrieval(format!(
                "Query failed: Status {}, Body: {}",
                status, body
            )));
        }

        let result: QueryResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Retrieval(format!("Invalid query response: {}", e)))?;

        Ok(result
            .matches
            .into_iter()
            .take(self.top_k as usize)
            .map(RetrievedRecord::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{VectorBackend, DEFAULT_QDRANT_URL};
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode as HttpStatus},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use tokio::net::TcpListener;

    async fn spawn_fake(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn index_config(controller: &str, host: Option<String>) -> IndexConfig {
        IndexConfig {
            backend: VectorBackend::Pinecone,
            name: "rag2".to_string(),
            namespace: "ns2".to_string(),
            top_k: 3,
            pinecone_api_key: Some("pc-test".to_string()),
            pinecone_host: host,
            pinecone_controller_url: controller.to_string(),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            qdrant_api_key: None,
        }
    }

    async fn query_handler(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        assert_eq!(headers["api-key"], "pc-test");
        assert_eq!(body["namespace"], "ns2");
        assert_eq!(body["topK"], 3);
        assert_eq!(body["includeMetadata"], true);
        assert_eq!(body["vector"], json!([0.25, 0.5]));
        Json(json!({
            "namespace": "ns2",
            "matches": [
                {"id": "Professor X", "score": 0.91, "values": [], "metadata": {"review": "Clear lectures", "classes": ["CS101"], "stars": 4}},
                {"id": "Professor Y", "score": 0.72, "values": [], "metadata": {"review": "Tough grader", "classes": ["CS102", "CS103"], "stars": 2.5}}
            ]
        }))
    }

    #[tokio::test]
    async fn resolves_host_and_queries_namespace() {
        let data_plane = spawn_fake(Router::new().route("/query", post(query_handler))).await;
        let controller = spawn_fake(Router::new().route(
            "/indexes/:name",
            get(move |Path(name): Path<String>| {
                let host = data_plane.clone();
                async move {
                    assert_eq!(name, "rag2");
                    Json(json!({"name": name, "host": host, "dimension": 1536}))
                }
            }),
        ))
        .await;

        let index = PineconeIndex::connect(&index_config(&controller, None)).await.unwrap();
        let records = index.query(&[0.25, 0.5]).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "Professor X");
        assert_eq!(records[0].metadata.classes, vec!["CS101"]);
        assert_eq!(records[0].metadata.stars, 4.0);
        assert_eq!(records[1].id, "Professor Y");
        assert_eq!(records[1].metadata.stars, 2.5);
    }

    #[tokio::test]
    async fn missing_index_yields_empty_results() {
        let controller = spawn_fake(Router::new().route(
            "/indexes/:name",
            get(|| async { (HttpStatus::NOT_FOUND, Json(json!({"error": {"code": "NOT_FOUND"}}))) }),
        ))
        .await;

        let index = PineconeIndex::connect(&index_config(&controller, None)).await.unwrap();
        assert!(index.host().is_none());
        assert!(index.query(&[0.1]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn index_created_after_startup_is_picked_up() {
        let data_plane = spawn_fake(Router::new().route("/query", post(query_handler))).await;
        let describes = Arc::new(AtomicUsize::new(0));
        let counter = describes.clone();
        let controller = spawn_fake(Router::new().route(
            "/indexes/:name",
            get(move || {
                let host = data_plane.clone();
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    // Missing at startup and on the first query
                    if attempt < 2 {
                        (HttpStatus::NOT_FOUND, Json(json!({"error": {"code": "NOT_FOUND"}})))
                    } else {
                        (HttpStatus::OK, Json(json!({"name": "rag2", "host": host})))
                    }
                }
            }),
        ))
        .await;

        let index = PineconeIndex::connect(&index_config(&controller, None)).await.unwrap();
        assert!(index.host().is_none());
        assert!(index.query(&[0.25, 0.5]).await.unwrap().is_empty());

        let records = index.query(&[0.25, 0.5]).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(index.host().is_some());

        // Cached once resolved
        index.query(&[0.25, 0.5]).await.unwrap();
        assert_eq!(describes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn irregular_metadata_keeps_the_match() {
        let host = spawn_fake(Router::new().route(
            "/query",
            post(|| async {
                Json(json!({
                    "namespace": "ns2",
                    "matches": [
                        {"id": "Professor X", "score": 0.9, "metadata": {"review": "Fine", "classes": "CS101", "stars": "4.5"}},
                        {"id": "Professor Y", "score": 0.8}
                    ]
                }))
            }),
        ))
        .await;

        let index = PineconeIndex::connect(&index_config("http://unused.invalid", Some(host)))
            .await
            .unwrap();
        let records = index.query(&[0.1]).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].metadata.review, "Fine");
        assert!(records[0].metadata.classes.is_empty());
        assert_eq!(records[0].metadata.stars, 4.5);
        assert_eq!(records[1].id, "Professor Y");
        assert_eq!(records[1].metadata, InstructorMetadata::default());
    }

    #[tokio::test]
    async fn empty_namespace_yields_empty_results() {
        let host = spawn_fake(Router::new().route(
            "/query",
            post(|| async { Json(json!({"namespace": "ns2", "matches": []})) }),
        ))
        .await;

        let index = PineconeIndex::connect(&index_config("http://unused.invalid", Some(host)))
            .await
            .unwrap();
        assert!(index.query(&[0.1]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn server_error_is_retrieval_failure() {
        let host = spawn_fake(Router::new().route(
            "/query",
            post(|| async { (HttpStatus::UNAUTHORIZED, "bad key") }),
        ))
        .await;

        let index = PineconeIndex::connect(&index_config("http://unused.invalid", Some(host)))
            .await
            .unwrap();
        let err = index.query(&[0.1]).await.unwrap_err();
        assert!(matches!(err, ProviderError::Retrieval(msg) if msg.contains("401")));
    }

    #[test]
    fn query_url_accepts_bare_hosts() {
        assert_eq!(query_url("rag2-abc.svc.pinecone.io"), "https://rag2-abc.svc.pinecone.io/query");
        assert_eq!(query_url("http://127.0.0.1:9000/"), "http://127.0.0.1:9000/query");
    }
}
