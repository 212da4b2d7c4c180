use crate::client::RetryPolicy;
use crate::error::{ChatbotError, Result};
use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub mod storage;
pub mod toolkit;
pub use toolkit::tool_library_for;

pub const DEFAULT_LLM_MODEL: &str = "GPT-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_TTS_VOICE: &str = "alloy";

/// Which wire layout the hosted services speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    AzureOpenAI,
    OpenAI,
}

impl FromStr for ProviderKind {
    type Err = ChatbotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" | "azure_openai" | "azure-openai" => Ok(ProviderKind::AzureOpenAI),
            "openai" => Ok(ProviderKind::OpenAI),
            other => Err(ChatbotError::Config(format!(
                "Unknown LLM_PROVIDER '{}'. Expected 'azure' or 'openai'.",
                other
            ))),
        }
    }
}

/// A fully resolved external service: where it lives, how to authenticate,
/// and which model (or Azure deployment) to use.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub model_name: String,
}

/// Retrieval defaults: `k` candidates, then a hard similarity cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalPolicy {
    pub k: usize,
    pub score_threshold: f32,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            k: 4,
            score_threshold: 0.5,
        }
    }
}

/// Everything a chatbot instance needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: ProviderKind,
    pub llm: ServiceConfig,
    pub embedding: ServiceConfig,
    pub speech: Option<ServiceConfig>,
    pub speech_voice: String,
    pub index_dir: PathBuf,
    pub conversation_dir: PathBuf,
    pub retrieval: RetrievalPolicy,
    pub max_function_calls: usize,
    pub max_history_pairs: usize,
    pub temperature: f32,
    pub retry: RetryPolicy,
}

impl Settings {
    /// Loads `.env` (if present) and resolves settings from the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // A missing .env file is fine.
        Self::resolve(|key| env::var(key).ok())
    }

    /// Resolves settings through `lookup`, which maps a variable name to its value.
    pub fn resolve<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .filter_map(|k| lookup(k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        let provider = match get(&["LLM_PROVIDER"]) {
            Some(p) => p.parse()?,
            None => ProviderKind::default(),
        };

        let llm_endpoint = get(&["AZURE_OPENAI_LLM_ENDPOINT", "AZURE_OPENAI_ENDPOINT"]);
        let llm_key = get(&["AZURE_OPENAI_LLM_API_KEY", "AZURE_OPENAI_API_KEY"]);
        let embed_endpoint = get(&["AZURE_OPENAI_EMBEDDING_ENDPOINT", "AZURE_OPENAI_ENDPOINT"]);
        let embed_key = get(&["AZURE_OPENAI_EMBEDDING_API_KEY", "AZURE_OPENAI_API_KEY"]);

        let mut missing = Vec::new();
        if llm_endpoint.is_none() {
            missing.push("AZURE_OPENAI_LLM_ENDPOINT (or AZURE_OPENAI_ENDPOINT)");
        }
        if llm_key.is_none() {
            missing.push("AZURE_OPENAI_LLM_API_KEY (or AZURE_OPENAI_API_KEY)");
        }
        if embed_endpoint.is_none() {
            missing.push("AZURE_OPENAI_EMBEDDING_ENDPOINT (or AZURE_OPENAI_ENDPOINT)");
        }
        if embed_key.is_none() {
            missing.push("AZURE_OPENAI_EMBEDDING_API_KEY (or AZURE_OPENAI_API_KEY)");
        }

        let (llm_endpoint, llm_key, embed_endpoint, embed_key) =
            match (llm_endpoint, llm_key, embed_endpoint, embed_key) {
                (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
                _ => {
                    return Err(ChatbotError::Config(format!(
                        "Missing required environment variables: {}. Please set them in your .env file.",
                        missing.join(", ")
                    )))
                }
            };

        let llm = ServiceConfig {
            endpoint: llm_endpoint,
            api_key: llm_key,
            api_version: get(&["AZURE_OPENAI_LLM_API_VERSION", "AZURE_OPENAI_API_VERSION"])
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            model_name: get(&["AZURE_OPENAI_LLM_MODEL"])
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        };

        let embedding = ServiceConfig {
            endpoint: embed_endpoint,
            api_key: embed_key,
            api_version: get(&["AZURE_OPENAI_EMBEDDING_API_VERSION", "AZURE_OPENAI_API_VERSION"])
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            model_name: get(&["AZURE_OPENAI_EMBEDDING_MODEL", "AZURE_OPENAI_EMBED_MODEL"])
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
        };

        // Speech is optional and only enabled when a TTS deployment is named.
        let speech = get(&["AZURE_OPENAI_TTS_MODEL"]).map(|model_name| ServiceConfig {
            endpoint: get(&["AZURE_OPENAI_TTS_ENDPOINT"]).unwrap_or_else(|| llm.endpoint.clone()),
            api_key: get(&["AZURE_OPENAI_TTS_API_KEY"]).unwrap_or_else(|| llm.api_key.clone()),
            api_version: get(&["AZURE_OPENAI_TTS_API_VERSION"])
                .unwrap_or_else(|| llm.api_version.clone()),
            model_name,
        });

        let defaults = RetrievalPolicy::default();
        let retrieval = RetrievalPolicy {
            k: parse_or(get(&["RAG_TOP_K"]), "RAG_TOP_K", defaults.k)?,
            score_threshold: parse_or(
                get(&["RAG_SCORE_THRESHOLD"]),
                "RAG_SCORE_THRESHOLD",
                defaults.score_threshold,
            )?,
        };

        Ok(Self {
            provider,
            llm,
            embedding,
            speech,
            speech_voice: get(&["AZURE_OPENAI_TTS_VOICE"])
                .unwrap_or_else(|| DEFAULT_TTS_VOICE.to_string()),
            index_dir: get(&["RAG_INDEX_DIR"])
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./vector_indexes")),
            conversation_dir: get(&["RAG_CONVERSATION_DIR"])
                .map(PathBuf::from)
                .unwrap_or_else(|| CONVERSATION_DIR.clone()),
            retrieval,
            max_function_calls: parse_or(get(&["MAX_FUNCTION_CALLS"]), "MAX_FUNCTION_CALLS", 3)?,
            max_history_pairs: parse_or(get(&["MAX_HISTORY_PAIRS"]), "MAX_HISTORY_PAIRS", 10)?,
            temperature: parse_or(get(&["LLM_TEMPERATURE"]), "LLM_TEMPERATURE", 0.7)?,
            retry: RetryPolicy::default(),
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, name: &str, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            ChatbotError::Config(format!("Invalid value '{}' for {}.", raw, name))
        }),
    }
}

pub static DEFAULT_APP_DIR: Lazy<PathBuf> = Lazy::new(|| {
    home::home_dir()
        .map(|mut path| {
            path.push(".rag-chatbot");
            path
        })
        .unwrap_or_else(|| PathBuf::from(".rag-chatbot"))
});

pub static CONVERSATION_DIR: Lazy<PathBuf> = Lazy::new(|| {
    let mut path = DEFAULT_APP_DIR.clone();
    path.push("conversations");
    path
});
