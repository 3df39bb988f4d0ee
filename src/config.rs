use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use crate::error::ConfigError;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
pub const DEFAULT_INDEX: &str = "rag2";
pub const DEFAULT_NAMESPACE: &str = "ns2";
pub const DEFAULT_TOP_K: u32 = 3;
pub const DEFAULT_PINECONE_CONTROLLER: &str = "https://api.pinecone.io";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VectorBackend {
    #[default]
    Pinecone,
    Qdrant,
}

impl FromStr for VectorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pinecone" => Ok(VectorBackend::Pinecone),
            "qdrant" => Ok(VectorBackend::Qdrant),
            other => Err(format!("unknown vector backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub api_base: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
}

#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub backend: VectorBackend,
    pub name: String,
    pub namespace: String,
    pub top_k: u32,
    pub pinecone_api_key: Option<String>,
    pub pinecone_host: Option<String>,
    pub pinecone_controller_url: String,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Everything the server needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub index: IndexConfig,
    pub server: ServerConfig,
    pub system_prompt_file: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let provider = ProviderConfig {
            api_key: get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?,
            api_base: get("OPENAI_API_BASE"),
            chat_model: get("OPENAI_CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: get("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimension: parse_or("EMBEDDING_DIMENSION", get("EMBEDDING_DIMENSION"), DEFAULT_EMBEDDING_DIMENSION)?,
        };

        let backend = match get("VECTOR_BACKEND") {
            Some(raw) => raw.parse::<VectorBackend>().map_err(|_| ConfigError::Invalid {
                key: "VECTOR_BACKEND",
                value: raw,
            })?,
            None => VectorBackend::default(),
        };

        let top_k: u32 = parse_or("RETRIEVAL_TOP_K", get("RETRIEVAL_TOP_K"), DEFAULT_TOP_K)?;
        if top_k == 0 {
            return Err(ConfigError::Invalid {
                key: "RETRIEVAL_TOP_K",
                value: "0".to_string(),
            });
        }

        let index = IndexConfig {
            backend,
            name: get("PINECONE_INDEX").unwrap_or_else(|| DEFAULT_INDEX.to_string()),
            namespace: get("PINECONE_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            top_k,
            pinecone_api_key: get("PINECONE_API_KEY"),
            pinecone_host: get("PINECONE_INDEX_HOST"),
            pinecone_controller_url: get("PINECONE_CONTROLLER_URL")
                .unwrap_or_else(|| DEFAULT_PINECONE_CONTROLLER.to_string()),
            qdrant_url: get("QDRANT_URL").unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
            qdrant_api_key: get("QDRANT_API_KEY"),
        };

        if index.backend == VectorBackend::Pinecone && index.pinecone_api_key.is_none() {
            return Err(ConfigError::Missing("PINECONE_API_KEY"));
        }

        let server = ServerConfig {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", get("PORT"), 3000)?,
        };

        Ok(Self {
            provider,
            index,
            server,
            system_prompt_file: get("SYSTEM_PROMPT_FILE"),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
