use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        point_id::PointIdOptions, with_payload_selector::SelectorOptions, Condition, Filter,
        PointId, SearchPoints, WithPayloadSelector,
    },
    Qdrant,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::config::IndexConfig;
use crate::database::qdrant_config::create_qdrant_client;
use crate::error::ProviderError;
use crate::llm::semantic_search::{InstructorMetadata, RetrievedRecord};
use crate::providers::traits::Retriever;

/// Payload key holding the namespace a point belongs to.
pub const NAMESPACE_FIELD: &str = "namespace";

/// Qdrant-backed index: the collection plays the index, a payload field the
/// namespace.
#[derive(Clone)]
pub struct QdrantIndex {
    client: Arc<Qdrant>,
    collection: String,
    namespace: String,
    top_k: u32,
}

impl QdrantIndex {
    pub fn new(config: &IndexConfig) -> Result<Self, ProviderError> {
        let client = create_qdrant_client(&config.qdrant_url, config.qdrant_api_key.as_deref())?;
        Ok(Self {
            client: Arc::new(client),
            collection: config.name.clone(),
            namespace: config.namespace.clone(),
            top_k: config.top_k,
        })
    }
}

fn point_id_to_string(id: Option<PointId>) -> String {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

/// Builds a record from a point payload. The instructor name comes from the
/// `id` or `professor` field, falling back to the point id.
pub fn record_from_payload(point_id: String, score: f32, payload: HashMap<String, Value>) -> RetrievedRecord {
    let id = ["id", "professor"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or(point_id);

    RetrievedRecord::new(id, score, InstructorMetadata::from_fields(|key| payload.get(key)))
}

#[async_trait]
impl Retriever for QdrantIndex {
    async fn query(&self, vector: &[f32]) -> Result<Vec<RetrievedRecord>, ProviderError> {
        let request = SearchPoints {
            collection_name: self.collection.clone(),
            vector: vector.to_vec(),
            limit: self.top_k as u64,
            filter: Some(Filter::must([Condition::matches(
                NAMESPACE_FIELD,
                self.namespace.clone(),
            )])),
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let results = match self.client.search_points(request).await {
            Ok(results) => results,
            Err(e) if is_missing_collection(&e.to_string()) => {
                warn!(collection = %self.collection, "Qdrant collection not found");
                return Ok(Vec::new());
            }
            Err(e) => return Err(ProviderError::Retrieval(e.to_string())),
        };

        let records = results
            .result
            .into_iter()
            .map(|point| {
                let payload = point
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect();
                record_from_payload(point_id_to_string(point.id), point.score, payload)
            })
            .collect();

        Ok(records)
    }
}

fn is_missing_collection(message: &str) -> bool {
    message.contains("doesn't exist") || message.contains("Not found")
}
