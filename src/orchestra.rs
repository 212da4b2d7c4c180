use crate::client::{self, RetryPolicy};
use crate::config::{ProviderKind, ServiceConfig};
use crate::datam::{Message, ModelReply};
use crate::error::Result;
use crate::providers::{self, ProviderAdapter, ResponseParser};
use crate::tools::ToolDefinition;

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

/// A chat-completion service.
///
/// The retrieval and function-call loops only ever talk to this trait, so
/// they can be driven by a scripted model in tests.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends the full message list, offering `tools` with automatic tool
    /// choice when present, and returns the normalized reply.
    async fn complete(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ModelReply>;

    /// The model (or deployment) name used for reporting.
    fn model_name(&self) -> &str;
}

/// The HTTP chat client for a single model deployment.
#[derive(Clone)]
pub struct Orchestra {
    service: ServiceConfig,
    http: reqwest::Client,
    provider_adapter: Arc<dyn ProviderAdapter>,
    response_parser: Arc<dyn ResponseParser>,
    temperature: f32,
    retry_policy: RetryPolicy,
}

impl Orchestra {
    /// Creates a new `Orchestra` for the resolved chat service.
    pub fn new(
        provider: ProviderKind,
        service: ServiceConfig,
        temperature: f32,
        retry_policy: RetryPolicy,
    ) -> Result<Self> {
        let (provider_adapter, response_parser) = providers::resolve(provider);
        debug!(
            "[Orchestra] {} chat client for '{}'",
            provider_adapter.get_provider_name(),
            service.model_name
        );

        Ok(Self {
            service,
            http: client::build_http_client()?,
            provider_adapter,
            response_parser,
            temperature,
            retry_policy,
        })
    }
}

#[async_trait]
impl ChatModel for Orchestra {
    async fn complete(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ModelReply> {
        let url = self.provider_adapter.get_request_url(&self.service);
        let headers = self.provider_adapter.get_request_headers(&self.service.api_key)?;
        let payload = self.provider_adapter.prepare_request_payload(
            &self.service.model_name,
            messages,
            self.temperature,
            tools,
        )?;
        debug!("[Orchestra] Request payload: {}", payload);

        let response_text =
            client::execute_single_call(&self.http, &url, headers, &payload, &self.retry_policy)
                .await?;
        debug!("[Orchestra] Raw response from model: {}", response_text);

        let payload = self.response_parser.parse_response(&response_text)?;
        Ok(ModelReply::from(payload))
    }

    fn model_name(&self) -> &str {
        &self.service.model_name
    }
}
