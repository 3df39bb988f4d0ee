use thiserror::Error;

/// Failure of one of the hosted services the pipeline delegates to.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Embedding provider error: {0}")]
    Embedding(String),
    #[error("Vector index error: {0}")]
    Retrieval(String),
    #[error("Completion provider error: {0}")]
    Completion(String),
}

/// Errors raised before the response body starts streaming.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Failure while relaying a completion stream that has already started.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Stream aborted: {0}")]
pub struct StreamError(pub String);

impl From<ProviderError> for StreamError {
    fn from(err: ProviderError) -> Self {
        StreamError(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("Failed to read system prompt file {path}: {reason}")]
    PromptFile { path: String, reason: String },
}
