use std::path::PathBuf;

use thiserror::Error;
use tokio::task::JoinError;

/// The primary error type for the `rag-chatbot` library.
///
/// This enum consolidates all possible failure modes into a single,
/// structured type. Only the public `chat` entry point turns these into
/// tagged responses; everything below it propagates them with `?`.
#[derive(Debug, Error)]
pub enum ChatbotError {
    /// A missing or malformed setting, such as an absent endpoint or API key.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Index creation was attempted with no documents.
    #[error("No documents provided for indexing")]
    EmptyInput,

    /// No valid index exists at the given path.
    #[error("Index not found at {}", .0.display())]
    IndexNotFound(PathBuf),

    /// The index is inconsistent, e.g. vectors of different dimensionality
    /// or an index built with another embedding model.
    #[error("Index error: {0}")]
    Index(String),

    /// An error during the API request itself (network, timeout, DNS).
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// A non-successful response from the provider's API (4xx or 5xx).
    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// The provider's response was not valid JSON or did not match the
    /// expected structure.
    #[error("Response parse error: {0}")]
    ResponseParse(String),

    /// An error from the SQLite database backing a persisted index.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// An I/O error, such as saving or loading a conversation transcript.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A spawned task failed to join.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] JoinError),

    /// An error originating from within the chat session itself.
    #[error("Chat session error: {0}")]
    Chat(String),
}

impl From<serde_json::Error> for ChatbotError {
    fn from(err: serde_json::Error) -> Self {
        ChatbotError::ResponseParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatbotError>;
