use qdrant_client::{config::QdrantConfig, Qdrant};
use std::time::Duration;

use crate::error::ProviderError;

/// Normalizes a Qdrant URL to the gRPC endpoint the client speaks.
pub fn grpc_url(url: &str) -> String {
    let (scheme, rest) = url.split_once("://").unwrap_or(("http", url));
    let clean_url = rest.trim_end_matches('/');

    // 6333 is the REST port; the client needs gRPC on 6334
    match clean_url.strip_suffix(":6333") {
        Some(host) => format!("{}://{}:6334", scheme, host),
        None => format!("{}://{}", scheme, clean_url),
    }
}

pub fn create_qdrant_client(url: &str, api_key: Option<&str>) -> Result<Qdrant, ProviderError> {
    let url_with_scheme = grpc_url(url);
    tracing::info!("Connecting to Qdrant at {}", url_with_scheme);

    let mut config = QdrantConfig::from_url(&url_with_scheme);
    config.check_compatibility = false;
    config.connect_timeout = Duration::from_secs(10);
    if let Some(key) = api_key {
        config.set_api_key(key);
    }

    Qdrant::new(config).map_err(|e| ProviderError::Retrieval(format!("Failed to create Qdrant client: {}", e)))
}
