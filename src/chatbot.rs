use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;

use crate::config::{self, Settings};
use crate::convo::{Conversation, ConversationState, HistorySummary, DEFAULT_MAX_PAIRS};
use crate::datam::{Message, Turn, Usage};
use crate::embed::Embedder;
use crate::error::{ChatbotError, Result};
use crate::function_call::FunctionCaller;
use crate::knowledge::UseCase;
use crate::orchestra::{ChatModel, Orchestra};
use crate::retrieval::{RetrievalMethod, Retriever};
use crate::vector::{Document, IndexStats, SearchResult, SimilarityIndex};

pub const FALLBACK_ANSWER: &str =
    "I'm sorry, I need to have either RAG or function calling enabled to assist you.";

/// How the answer to a turn was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMethod {
    FunctionCalling,
    RagRetrieval,
    LlmDirect,
    Error,
    Fallback,
}

impl From<RetrievalMethod> for AnswerMethod {
    fn from(method: RetrievalMethod) -> Self {
        match method {
            RetrievalMethod::RagRetrieval => AnswerMethod::RagRetrieval,
            RetrievalMethod::LlmDirect => AnswerMethod::LlmDirect,
            RetrievalMethod::Error => AnswerMethod::Error,
        }
    }
}

/// The tagged result of one [`RagChatbot::chat`] turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub user_input: String,
    pub timestamp: DateTime<Utc>,
    pub use_case: UseCase,
    pub answer: String,
    pub method: AnswerMethod,
    pub sources: Vec<String>,
    pub retrieved_documents: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_calls_made: Option<usize>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatbotStats {
    pub use_case: UseCase,
    pub functions_enabled: bool,
    pub conversation_summary: HistorySummary,
    pub index_stats: IndexStats,
    pub available_functions: Vec<String>,
    pub model_name: String,
    pub total_usage: Usage,
}

/// Where the index for `use_case` lives inside `index_dir`.
pub fn index_path(index_dir: &Path, use_case: UseCase) -> PathBuf {
    index_dir.join(format!("{}_index.sqlite", use_case))
}

/// One conversation with the knowledge base and tools of a single use case.
///
/// Each turn tries the function-call loop first, then retrieval. Instances
/// share nothing mutable; run one per independent conversation.
pub struct RagChatbot {
    use_case: UseCase,
    model: Arc<dyn ChatModel>,
    retriever: Retriever,
    functions: Option<FunctionCaller>,
    conversation: ConversationState,
    transcript: Conversation,
    total_usage: Usage,
}

impl RagChatbot {
    pub fn new(use_case: UseCase, model: Arc<dyn ChatModel>, retriever: Retriever) -> Self {
        let transcript = Conversation::new(use_case, model.model_name());
        Self {
            use_case,
            model,
            retriever,
            functions: None,
            conversation: ConversationState::new(DEFAULT_MAX_PAIRS),
            transcript,
            total_usage: Usage::default(),
        }
    }

    pub fn with_functions(mut self, functions: FunctionCaller) -> Self {
        self.functions = Some(functions);
        self
    }

    pub fn with_max_history_pairs(mut self, max_pairs: usize) -> Self {
        self.conversation = ConversationState::new(max_pairs);
        self
    }

    /// Builds the HTTP clients, opens or creates the use case's index and
    /// registers its tools.
    pub async fn from_settings(settings: &Settings, use_case: UseCase, enable_functions: bool) -> Result<Self> {
        let model: Arc<dyn ChatModel> = Arc::new(Orchestra::new(
            settings.provider,
            settings.llm.clone(),
            settings.temperature,
            settings.retry,
        )?);
        let embedder = Arc::new(Embedder::new(
            settings.provider,
            settings.embedding.clone(),
            settings.retry,
        )?);

        let path = index_path(&settings.index_dir, use_case);
        let index = SimilarityIndex::open_or_create(&path, embedder, use_case.documents()?).await?;
        let retriever = Retriever::new(index, use_case, settings.retrieval);

        let mut chatbot = Self::new(use_case, model, retriever)
            .with_max_history_pairs(settings.max_history_pairs);
        if enable_functions {
            let tools = config::tool_library_for(use_case)?;
            chatbot = chatbot.with_functions(FunctionCaller::new(tools, settings.max_function_calls));
        }

        info!(
            "{} chatbot initialized (functions: {})",
            use_case.display_name(),
            if enable_functions { "enabled" } else { "disabled" }
        );
        Ok(chatbot)
    }

    /// Answers one user message. Never fails: every outcome is a tagged
    /// response. Only successful turns are added to the history.
    pub async fn chat(&mut self, user_text: &str, use_rag: bool, use_functions: bool) -> ChatResponse {
        let history = self.conversation.history();
        let mut response = self.respond(user_text, &history, use_rag, use_functions).await;

        self.total_usage += response.usage;
        if response.success {
            self.conversation.append(user_text, response.answer.clone());
        } else {
            warn!(
                "Turn ended with method {:?}: {}",
                response.method,
                response.error.as_deref().unwrap_or("no error detail")
            );
        }
        response.timestamp = Utc::now();
        response
    }

    async fn respond(&self, user_text: &str, history: &[Turn], use_rag: bool, use_functions: bool) -> ChatResponse {
        let mut response = ChatResponse {
            user_input: user_text.to_string(),
            timestamp: Utc::now(),
            use_case: self.use_case,
            answer: String::new(),
            method: AnswerMethod::Fallback,
            sources: Vec::new(),
            retrieved_documents: Vec::new(),
            function_calls_made: None,
            success: false,
            error: None,
            usage: Usage::default(),
        };

        if let (true, Some(functions)) = (use_functions, &self.functions) {
            let mut messages = Vec::with_capacity(history.len() + 2);
            messages.push(Message::system(self.use_case.system_prompt()));
            messages.extend(history.iter().map(Message::from));
            messages.push(Message::user(user_text));

            let result = functions.run(self.model.as_ref(), messages).await;
            response.usage += result.usage;
            if let Some(content) = result.outcome.content() {
                response.answer = content.to_string();
                response.method = AnswerMethod::FunctionCalling;
                response.function_calls_made = Some(result.outcome.function_calls_made());
                response.success = true;
                return response;
            }
            // Kept on the fallback response; retrieval overwrites `error`.
            response.function_calls_made = Some(result.outcome.function_calls_made());
            if let Some(error) = result.outcome.error() {
                warn!("Function calling produced no answer: {}", error);
                response.error = Some(error.to_string());
            }
        }

        if use_rag {
            let rag = self.retriever.answer(self.model.as_ref(), user_text, history).await;
            response.usage += rag.usage;
            response.answer = rag.answer;
            response.method = rag.method.into();
            response.sources = rag.sources;
            response.retrieved_documents = rag.retrieved_documents;
            response.success = rag.method != RetrievalMethod::Error;
            response.error = rag.error;
            return response;
        }

        response.answer = FALLBACK_ANSWER.to_string();
        response
    }

    pub fn clear_conversation(&mut self) {
        self.conversation.clear();
    }

    pub fn get_history(&self) -> Vec<Turn> {
        self.conversation.history()
    }

    pub fn get_stats(&self) -> ChatbotStats {
        ChatbotStats {
            use_case: self.use_case,
            functions_enabled: self.functions.is_some(),
            conversation_summary: self.conversation.summary(),
            index_stats: self.retriever.index_stats(),
            available_functions: self.available_functions(),
            model_name: self.model.model_name().to_string(),
            total_usage: self.total_usage,
        }
    }

    pub fn available_functions(&self) -> Vec<String> {
        self.functions
            .as_ref()
            .map(|f| f.tools().names())
            .unwrap_or_default()
    }

    pub fn use_case(&self) -> UseCase {
        self.use_case
    }

    pub fn exchanges(&self) -> Vec<(String, String)> {
        self.conversation.exchanges()
    }

    /// Writes the current history as a transcript. See [`Conversation::save`].
    pub fn save_history(&mut self, path: &Path) -> Result<PathBuf> {
        self.transcript.turns = self.conversation.history();
        self.transcript.usage = self.total_usage;
        let written = self.transcript.save(path)?;
        info!("Saved conversation to {}", written.display());
        Ok(written)
    }

    /// Replaces the history with a saved transcript of the same use case.
    pub fn restore_history(&mut self, path: &Path) -> Result<()> {
        let saved = Conversation::load(path)?;
        if saved.use_case != self.use_case {
            return Err(ChatbotError::Chat(format!(
                "Conversation {} belongs to {}, not {}",
                saved.id, saved.use_case, self.use_case
            )));
        }
        self.conversation.restore(&saved.turns);
        self.total_usage = saved.usage;
        self.transcript = saved;
        info!("Restored {} exchanges from {}", self.conversation.len() / 2, path.display());
        Ok(())
    }

    /// Adds documents to the knowledge base for future turns.
    pub async fn add_documents(&mut self, documents: Vec<Document>) -> Result<usize> {
        self.retriever.add_documents(documents).await
    }
}
