pub mod pinecone;
pub mod qdrant_config;
pub mod vector_db;

use std::sync::Arc;

use crate::config::{IndexConfig, VectorBackend};
use crate::error::ProviderError;
use crate::providers::traits::Retriever;

pub use pinecone::PineconeIndex;
pub use vector_db::QdrantIndex;

/// Connects the retriever selected by `config.backend`.
pub async fn connect_retriever(config: &IndexConfig) -> Result<Arc<dyn Retriever>, ProviderError> {
    let retriever: Arc<dyn Retriever> = match config.backend {
        VectorBackend::Pinecone => Arc::new(PineconeIndex::connect(config).await?),
        VectorBackend::Qdrant => Arc::new(QdrantIndex::new(config)?),
    };
    Ok(retriever)
}
