use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateEmbeddingRequestArgs, EmbeddingInput,
    },
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::llm::message::{Message, Role};
use crate::providers::traits::{prime_stream, CompletionStream, Completer, Embedder};

/// OpenAI-compatible embedding and chat client.
#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    chat_model: String,
    embedding_model: String,
}

impl OpenAIProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(config.api_key.clone());
        if let Some(api_base) = &config.api_base {
            openai_config = openai_config.with_api_base(api_base.clone());
        }

        Self {
            client: Client::with_config(openai_config),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
        }
    }
}

fn to_request_message(message: Message) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let request: ChatCompletionRequestMessage = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content)
            .build()?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content)
            .build()?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(message.content)
            .build()?
            .into(),
    };
    Ok(request)
}

#[async_trait]
impl Embedder for OpenAIProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.embedding_model)
            .input(EmbeddingInput::String(text.to_string()))
            .build()
            .map_err(|e| ProviderError::Embedding(e.to_string()))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| ProviderError::Embedding(e.to_string()))?;

        response
            .data
            .into_iter()
            .next()
            .map(|embedding| embedding.embedding)
            .ok_or_else(|| ProviderError::Embedding("No embedding returned from OpenAI".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl Completer for OpenAIProvider {
    async fn complete_stream(&self, messages: Vec<Message>) -> Result<CompletionStream, ProviderError> {
        let messages = messages
            .into_iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ProviderError::Completion(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.chat_model)
            .messages(messages)
            .stream(true)
            .build()
            .map_err(|e| ProviderError::Completion(e.to_string()))?;

        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| ProviderError::Completion(e.to_string()))?;

        let chunks = stream.map(|event| match event {
            Ok(response) => Ok(response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .unwrap_or_default()),
            Err(e) => Err(ProviderError::Completion(e.to_string())),
        });

        prime_stream(chunks.boxed()).await
    }

    fn model_name(&self) -> &str {
        &self.chat_model
    }
}
