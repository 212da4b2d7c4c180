use log::{debug, error, info};
use serde::Serialize;

use crate::config::RetrievalPolicy;
use crate::datam::{Message, Turn, Usage};
use crate::error::{ChatbotError, Result};
use crate::knowledge::UseCase;
use crate::orchestra::ChatModel;
use crate::vector::{metadata_str, Document, IndexStats, SearchResult, SimilarityIndex};

/// Which branch produced a retrieval answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMethod {
    /// At least one document cleared the threshold and was used as context.
    RagRetrieval,
    /// Nothing cleared the threshold; the model answered without context.
    LlmDirect,
    /// Search or the model call failed.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalAnswer {
    pub answer: String,
    pub method: RetrievalMethod,
    pub retrieved_documents: Vec<SearchResult>,
    pub sources: Vec<String>,
    pub error: Option<String>,
    pub usage: Usage,
}

/// Formats hits as numbered context blocks separated by blank lines.
pub fn format_context(docs: &[SearchResult]) -> String {
    docs.iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "Document {} ({} - {}, relevance: {:.2}):\n{}",
                i + 1,
                doc.category(),
                doc.source(),
                doc.similarity,
                doc.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Answers questions from the knowledge base, falling back to a plain
/// model call when nothing relevant is found.
pub struct Retriever {
    index: SimilarityIndex,
    use_case: UseCase,
    policy: RetrievalPolicy,
}

impl Retriever {
    pub fn new(index: SimilarityIndex, use_case: UseCase, policy: RetrievalPolicy) -> Self {
        Self { index, use_case, policy }
    }

    pub fn policy(&self) -> RetrievalPolicy {
        self.policy
    }

    pub fn index_stats(&self) -> IndexStats {
        self.index.stats()
    }

    /// Runs one retrieval turn. Never fails: errors become `method: Error`.
    pub async fn answer(&self, model: &dyn ChatModel, question: &str, history: &[Turn]) -> RetrievalAnswer {
        match self.try_answer(model, question, history).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Error in RAG retrieval: {}", e);
                RetrievalAnswer {
                    answer: format!(
                        "I apologize, but I encountered an error processing your request: {}",
                        e
                    ),
                    method: RetrievalMethod::Error,
                    retrieved_documents: Vec::new(),
                    sources: Vec::new(),
                    error: Some(e.to_string()),
                    usage: Usage::default(),
                }
            }
        }
    }

    async fn try_answer(&self, model: &dyn ChatModel, question: &str, history: &[Turn]) -> Result<RetrievalAnswer> {
        let docs = self
            .index
            .search(question, self.policy.k, self.policy.score_threshold)
            .await?;

        let (system_prompt, method) = if docs.is_empty() {
            info!(
                "No relevant documents found (similarity < {}); answering without knowledge base context",
                self.policy.score_threshold
            );
            (self.use_case.direct_prompt(), RetrievalMethod::LlmDirect)
        } else {
            debug!("Using {} retrieved documents as context", docs.len());
            (self.use_case.rag_prompt(&format_context(&docs)), RetrievalMethod::RagRetrieval)
        };

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system_prompt));
        messages.extend(history.iter().map(Message::from));
        messages.push(Message::user(question));

        let reply = model.complete(&messages, None).await?;
        let answer = reply
            .content
            .ok_or_else(|| ChatbotError::ResponseParse("Model returned no answer text".to_string()))?;

        let sources = docs
            .iter()
            .map(|d| metadata_str(&d.metadata, "source", "Unknown").to_string())
            .collect();

        Ok(RetrievalAnswer {
            answer,
            method,
            retrieved_documents: docs,
            sources,
            error: None,
            usage: reply.usage.unwrap_or_default(),
        })
    }

    /// The formatted context the RAG branch would use for `question`.
    pub async fn relevant_context(&self, question: &str, k: usize) -> Result<String> {
        let docs = self
            .index
            .search(question, k, self.policy.score_threshold)
            .await?;
        Ok(format_context(&docs))
    }

    /// Adds documents to the index. An index that lives on disk is saved
    /// before the new documents become searchable; if that fails, nothing
    /// is added.
    pub async fn add_documents(&mut self, documents: Vec<Document>) -> Result<usize> {
        let added = match self.index.path().map(|p| p.to_path_buf()) {
            Some(path) => self.index.add_documents_and_save(documents, &path).await?,
            None => self.index.add_documents(documents).await?,
        };
        info!("Added {} documents to the {} index", added, self.use_case);
        Ok(added)
    }
}
