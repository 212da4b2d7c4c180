use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::client::{self, RetryPolicy};
use crate::config::{ProviderKind, ServiceConfig};
use crate::error::{ChatbotError, Result};
use crate::providers::{self, ProviderAdapter, ResponseParser};

/// A text embedding service. Deterministic for a fixed model and text.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embeds each text, returning one vector per input in the same order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChatbotError::ResponseParse("No embedding returned".to_string()))
    }

    /// Identifies the model; persisted indexes record it.
    fn model_name(&self) -> &str;
}

/// The primary engine for generating text embeddings over HTTP.
pub struct Embedder {
    service: ServiceConfig,
    http: reqwest::Client,
    provider_adapter: Arc<dyn ProviderAdapter>,
    response_parser: Arc<dyn ResponseParser>,
    retry_policy: RetryPolicy,
}

impl Embedder {
    /// Creates a new `Embedder` for the resolved embedding service.
    pub fn new(provider: ProviderKind, service: ServiceConfig, retry_policy: RetryPolicy) -> Result<Self> {
        let (provider_adapter, response_parser) = providers::resolve(provider);
        Ok(Self {
            service,
            http: client::build_http_client()?,
            provider_adapter,
            response_parser,
            retry_policy,
        })
    }
}

#[async_trait]
impl EmbeddingModel for Embedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.provider_adapter.get_embedding_url(&self.service);
        let headers = self.provider_adapter.get_request_headers(&self.service.api_key)?;
        let payload = self
            .provider_adapter
            .prepare_embedding_request(&self.service.model_name, texts);
        debug!("[Embedder] URL: {} ({} texts)", url, texts.len());

        let response_text =
            client::execute_single_call(&self.http, &url, headers, &payload, &self.retry_policy)
                .await?;

        let vectors = self.response_parser.parse_embedding_response(&response_text)?;
        if vectors.len() != texts.len() {
            return Err(ChatbotError::ResponseParse(format!(
                "Expected {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.service.model_name
    }
}
