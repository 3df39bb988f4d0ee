pub mod chat;
pub mod embeddings;
pub mod message;
pub mod semantic_search;
pub mod stream;

pub use chat::ChatPipeline;
pub use embeddings::EmbeddingGenerator;
pub use message::{parse_history, Conversation, Message, Role};
pub use semantic_search::{InstructorMetadata, RetrievedRecord};
pub use stream::{RelayState, ResponseRelay};
