#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{stream, StreamExt};

use professor_rag::error::ProviderError;
use professor_rag::llm::{ChatPipeline, EmbeddingGenerator, InstructorMetadata, Message, RetrievedRecord};
use professor_rag::providers::{CompletionStream, Completer, Embedder, Retriever};

pub const DIMENSION: usize = 8;
pub const SYSTEM_PROMPT: &str = "You help students pick instructors.";

#[derive(Default)]
pub struct MockEmbedder {
    pub calls: AtomicUsize,
    pub inputs: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(ProviderError::Embedding("invalid api key".to_string()));
        }
        Ok(vec![0.1; DIMENSION])
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }
}

#[derive(Default)]
pub struct MockRetriever {
    pub calls: AtomicUsize,
    pub records: Vec<RetrievedRecord>,
    pub fail: bool,
}

#[async_trait]
impl Retriever for MockRetriever {
    async fn query(&self, vector: &[f32]) -> Result<Vec<RetrievedRecord>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(vector.len(), DIMENSION);
        if self.fail {
            return Err(ProviderError::Retrieval("index unavailable".to_string()));
        }
        Ok(self.records.clone())
    }
}

#[derive(Default)]
pub struct MockCompleter {
    pub calls: AtomicUsize,
    pub sent: Mutex<Vec<Message>>,
    pub chunks: Vec<Result<String, ProviderError>>,
    pub fail: bool,
}

impl MockCompleter {
    pub fn replying(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| Ok(c.to_string())).collect(),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completer for MockCompleter {
    async fn complete_stream(&self, messages: Vec<Message>) -> Result<CompletionStream, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.sent.lock().unwrap() = messages;
        if self.fail {
            return Err(ProviderError::Completion("model overloaded".to_string()));
        }
        Ok(stream::iter(self.chunks.clone()).boxed())
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

pub fn record(id: &str, review: &str, classes: &[&str], stars: f64) -> RetrievedRecord {
    RetrievedRecord::new(
        id,
        0.9,
        InstructorMetadata {
            review: review.to_string(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            stars,
        },
    )
}

pub struct Harness {
    pub embedder: Arc<MockEmbedder>,
    pub retriever: Arc<MockRetriever>,
    pub completer: Arc<MockCompleter>,
}

impl Harness {
    pub fn new(embedder: MockEmbedder, retriever: MockRetriever, completer: MockCompleter) -> Self {
        Self {
            embedder: Arc::new(embedder),
            retriever: Arc::new(retriever),
            completer: Arc::new(completer),
        }
    }

    pub fn pipeline(&self) -> ChatPipeline {
        ChatPipeline::new(
            EmbeddingGenerator::new(self.embedder.clone(), DIMENSION),
            self.retriever.clone(),
            self.completer.clone(),
            SYSTEM_PROMPT,
        )
    }

    pub fn calls(&self) -> (usize, usize, usize) {
        (
            self.embedder.calls.load(Ordering::SeqCst),
            self.retriever.calls.load(Ordering::SeqCst),
            self.completer.calls.load(Ordering::SeqCst),
        )
    }
}
