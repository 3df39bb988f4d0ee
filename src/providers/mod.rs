pub mod openai;
pub mod traits;

pub use openai::OpenAIProvider;
pub use traits::{CompletionStream, Completer, Embedder, Retriever};
