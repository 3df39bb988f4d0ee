use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use professor_rag::api;
use professor_rag::config::{AppConfig, VectorBackend};
use professor_rag::database::connect_retriever;
use professor_rag::llm::{ChatPipeline, EmbeddingGenerator};
use professor_rag::providers::OpenAIProvider;
use professor_rag::SystemPrompt;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Answers questions about instructors from their reviews", long_about = None)]
struct Args {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// File replacing the built-in system prompt (overrides SYSTEM_PROMPT_FILE)
    #[arg(long)]
    prompt_file: Option<String>,

    /// Vector index backend: pinecone or qdrant (overrides VECTOR_BACKEND)
    #[arg(long)]
    backend: Option<VectorBackend>,
}

impl Args {
    fn apply(self, config: &mut AppConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(path) = self.prompt_file {
            config.system_prompt_file = Some(path);
        }
        if let Some(backend) = self.backend {
            config.index.backend = backend;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,professor_rag=debug")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    args.apply(&mut config);

    let system_prompt = SystemPrompt::load(config.system_prompt_file.as_deref())?;

    let openai = Arc::new(OpenAIProvider::new(&config.provider));
    let embeddings = EmbeddingGenerator::new(openai.clone(), config.provider.embedding_dimension);
    let retriever = connect_retriever(&config.index)
        .await
        .context("Failed to connect to the vector index")?;

    let pipeline = ChatPipeline::new(embeddings, retriever, openai, system_prompt.into_string());
    let app = api::create_api(pipeline);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(
        address = %addr,
        chat_model = %config.provider.chat_model,
        index = %config.index.name,
        namespace = %config.index.namespace,
        "Ready to accept connections"
    );

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
