use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;

use crate::error::ProviderError;
use crate::llm::message::Message;
use crate::llm::semantic_search::RetrievedRecord;

/// Incremental completion text, consumed once in arrival order.
pub type CompletionStream = BoxStream<'static, Result<String, ProviderError>>;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    fn model_name(&self) -> &str;
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Nearest records for `vector`, in the order the index ranks them.
    /// A missing index or namespace yields an empty list.
    async fn query(&self, vector: &[f32]) -> Result<Vec<RetrievedRecord>, ProviderError>;
}

#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete_stream(&self, messages: Vec<Message>) -> Result<CompletionStream, ProviderError>;

    fn model_name(&self) -> &str;
}

/// Waits for the first event of `upstream`. A rejected request (bad key,
/// rate limit, unknown model) only shows up as that first event, so it is
/// returned as an error here; otherwise the event is put back in front.
pub async fn prime_stream(mut upstream: CompletionStream) -> Result<CompletionStream, ProviderError> {
    match upstream.next().await {
        Some(Ok(first)) => Ok(stream::once(async move { Ok(first) }).chain(upstream).boxed()),
        Some(Err(e)) => Err(e),
        None => Ok(stream::empty().boxed()),
    }
}
