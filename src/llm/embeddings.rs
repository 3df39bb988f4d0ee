use std::sync::Arc;

use tracing::debug;

use crate::error::ProviderError;
use crate::providers::traits::Embedder;

/// Wraps an [`Embedder`] and rejects vectors of the wrong size.
#[derive(Clone)]
pub struct EmbeddingGenerator {
    embedder: Arc<dyn Embedder>,
    dimension: usize,
}

impl EmbeddingGenerator {
    pub fn new(embedder: Arc<dyn Embedder>, dimension: usize) -> Self {
        Self { embedder, dimension }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if text.trim().is_empty() {
            return Err(ProviderError::Embedding("cannot embed empty text".to_string()));
        }

        let embedding = self.embedder.embed(text).await?;

        if embedding.len() != self.dimension {
            return Err(ProviderError::Embedding(format!(
                "{} returned an embedding of size {} (expected {})",
                self.embedder.model_name(),
                embedding.len(),
                self.dimension
            )));
        }

        debug!(model = self.embedder.model_name(), dimension = embedding.len(), "Generated query embedding");
        Ok(embedding)
    }
}
