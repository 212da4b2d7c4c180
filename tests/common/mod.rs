//! Deterministic stand-ins for the hosted services.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use rag_chatbot::config::RetrievalPolicy;
use rag_chatbot::datam::{Message, ModelReply};
use rag_chatbot::embed::EmbeddingModel;
use rag_chatbot::error::{ChatbotError, Result};
use rag_chatbot::knowledge::UseCase;
use rag_chatbot::orchestra::ChatModel;
use rag_chatbot::retrieval::Retriever;
use rag_chatbot::speech::SpeechSynthesizer;
use rag_chatbot::tools::{ToolCall, ToolDefinition};
use rag_chatbot::vector::{Document, SimilarityIndex};

/// Axes of the keyword embedding. A token hits an axis when it starts with
/// the keyword, so "printer" and "printing" both land on "print".
const VOCABULARY: &[&str] = &[
    "print", "password", "vpn", "slow", "order", "ship", "leave", "holiday", "paper", "ink",
    "power", "network", "email",
];

/// Bag-of-keywords embedder. Texts without any keyword map to a dedicated
/// "other" axis, orthogonal to every keyword text (similarity 1/3).
pub struct KeywordEmbedder {
    name: String,
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self::named("keyword-stub")
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn vectorize(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; VOCABULARY.len() + 1];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            if let Some(axis) = VOCABULARY.iter().position(|k| token.starts_with(k)) {
                vector[axis] += 1.0;
            }
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            vector[VOCABULARY.len()] = 1.0;
        } else {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingModel for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

/// Keyword embedder that serves the first `healthy_calls` requests and then
/// fails every later one with a 503, like an embedding service going down
/// after the index was built.
pub struct FlakyEmbedder {
    inner: KeywordEmbedder,
    healthy_calls: usize,
}

impl FlakyEmbedder {
    pub fn failing_after(healthy_calls: usize) -> Self {
        Self {
            inner: KeywordEmbedder::new(),
            healthy_calls,
        }
    }
}

#[async_trait]
impl EmbeddingModel for FlakyEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.inner.calls.load(Ordering::SeqCst) >= self.healthy_calls {
            return Err(ChatbotError::Api {
                status: 503,
                body: "embedding service unavailable".to_string(),
            });
        }
        self.inner.embed_batch(texts).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// One recorded `complete` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools_offered: usize,
}

/// Plays back queued replies in order, then repeats `fallback` (or fails
/// when there is none). Records every request.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelReply>>>,
    fallback: Option<ModelReply>,
    pub calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<ModelReply>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request with `text`.
    pub fn always(text: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Some(ModelReply::text(text)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A model that requests `tool` with `args` on every request.
    pub fn always_tool(tool: &str, args: JsonValue) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Some(ModelReply::tool_calls(vec![ToolCall::new("call_loop", tool, args)])),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: &[Message], tools: Option<&[ToolDefinition]>) -> Result<ModelReply> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            tools_offered: tools.map_or(0, |t| t.len()),
        });
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => reply,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| ChatbotError::Chat("script exhausted".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

pub fn tool_reply(id: &str, name: &str, args: JsonValue) -> Result<ModelReply> {
    Ok(ModelReply::tool_calls(vec![ToolCall::new(id, name, args)]))
}

pub fn text_reply(text: &str) -> Result<ModelReply> {
    Ok(ModelReply::text(text))
}

pub fn transport_error() -> Result<ModelReply> {
    Err(ChatbotError::Api {
        status: 503,
        body: "service unavailable".to_string(),
    })
}

/// Speech stub: fails for texts containing "fail", otherwise returns the
/// text's bytes as "audio".
pub struct EchoSpeech {
    pub requests: Mutex<Vec<String>>,
}

impl EchoSpeech {
    pub fn new() -> Self {
        Self { requests: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl SpeechSynthesizer for EchoSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(text.to_string());
        if text.contains("fail") {
            return Err(ChatbotError::Api {
                status: 500,
                body: "synthesis failed".to_string(),
            });
        }
        Ok(text.as_bytes().to_vec())
    }
}

pub fn faq_documents() -> Vec<Document> {
    vec![
        Document::with_source(
            "How to reset my password? Visit the password reset portal.",
            "FAQ - Password Reset",
            "Authentication",
            "high",
        ),
        Document::with_source(
            "To connect to the VPN, install the VPN client and sign in.",
            "FAQ - VPN Setup",
            "Network",
            "high",
        ),
        Document::with_source(
            "Printer not working? Check power, paper, ink.",
            "FAQ - Printer",
            "Hardware",
            "medium",
        ),
    ]
}

pub async fn keyword_index(documents: Vec<Document>) -> SimilarityIndex {
    SimilarityIndex::create(Arc::new(KeywordEmbedder::new()), documents)
        .await
        .unwrap()
}

pub async fn faq_retriever() -> Retriever {
    Retriever::new(
        keyword_index(faq_documents()).await,
        UseCase::ItHelpdesk,
        RetrievalPolicy::default(),
    )
}

pub fn device_args(id: &str) -> JsonValue {
    json!({ "device_id": id })
}
