use std::sync::Arc;

use tracing::{debug, info};

use crate::error::ChatError;
use crate::llm::embeddings::EmbeddingGenerator;
use crate::llm::message::{Conversation, Message};
use crate::llm::semantic_search::augment;
use crate::llm::stream::ResponseRelay;
use crate::providers::traits::{prime_stream, Completer, Retriever};

/// Embed → retrieve → augment → complete, once per request.
#[derive(Clone)]
pub struct ChatPipeline {
    embeddings: EmbeddingGenerator,
    retriever: Arc<dyn Retriever>,
    completer: Arc<dyn Completer>,
    system_prompt: Arc<str>,
}

impl ChatPipeline {
    pub fn new(
        embeddings: EmbeddingGenerator,
        retriever: Arc<dyn Retriever>,
        completer: Arc<dyn Completer>,
        system_prompt: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            embeddings,
            retriever,
            completer,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Builds the outbound message list: the system prompt, the prior
    /// history untouched, and the last message replaced by its augmented
    /// form. Only the last message is embedded.
    pub async fn prepare(&self, conversation: &Conversation) -> Result<Vec<Message>, ChatError> {
        let last = conversation.last();

        let embedding = self.embeddings.generate_embedding(&last.content).await?;
        let records = self.retriever.query(&embedding).await?;
        info!(matches = records.len(), "Retrieved instructor records");

        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(self.system_prompt.as_ref()));
        messages.extend_from_slice(conversation.prior());
        messages.push(Message::user(augment(&last.content, &records)));
        Ok(messages)
    }

    /// Runs the whole pipeline and returns the relay for the response body.
    pub async fn respond(&self, conversation: &Conversation) -> Result<ResponseRelay, ChatError> {
        let messages = self.prepare(conversation).await?;
        debug!(
            model = self.completer.model_name(),
            messages = messages.len(),
            "Requesting streamed completion"
        );
        let upstream = self.completer.complete_stream(messages).await?;
        // Nothing is committed to the client until the provider accepted the request
        let upstream = prime_stream(upstream).await?;
        Ok(ResponseRelay::new(upstream))
    }
}
