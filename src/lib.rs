pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod providers;

// Re-export commonly used items
pub use config::AppConfig;
pub use error::{ChatError, ConfigError, ProviderError, StreamError};
pub use llm::ChatPipeline;
pub use prompt::SystemPrompt;
