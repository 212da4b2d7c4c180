//! A retrieval-augmented chatbot for IT helpdesk, customer support and HR
//! questions, backed by hosted chat and embedding models.

// Declare all library modules to make them accessible.
pub mod chatbot;
pub mod client;
pub mod config;
pub mod convo;
pub mod datam;
pub mod embed;
pub mod error;
pub mod function_call;
pub mod knowledge;
pub mod orchestra;
pub mod providers;
pub mod retrieval;
pub mod speech;
pub mod tools;
pub mod vector;

pub use chatbot::{AnswerMethod, ChatResponse, ChatbotStats, RagChatbot};
pub use config::Settings;
pub use error::{ChatbotError, Result};
pub use knowledge::UseCase;
