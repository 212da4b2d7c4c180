use crate::config::{ProviderKind, ServiceConfig};
use crate::datam::{Message, ResponsePayload};
use crate::error::Result;
use crate::tools::ToolDefinition;

use reqwest::header;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub mod azure;
pub mod openai;

/// Provider-specific request building: URLs, authentication and payloads.
///
/// The payload shapes are shared by every OpenAI-compatible service; what
/// differs is where requests go and how they authenticate.
pub trait ProviderAdapter: Send + Sync {
    /// Returns the friendly name of the provider (e.g., "Azure OpenAI").
    fn get_provider_name(&self) -> &str;

    /// Returns the full chat-completions URL for the service.
    fn get_request_url(&self, service: &ServiceConfig) -> String;

    /// Returns the full URL for an embedding request.
    fn get_embedding_url(&self, service: &ServiceConfig) -> String;

    /// Returns the full URL for a text-to-speech request.
    fn get_speech_url(&self, service: &ServiceConfig) -> String;

    /// Returns the provider-specific request headers, including authentication.
    fn get_request_headers(&self, api_key: &str) -> Result<header::HeaderMap>;

    /// Prepares the chat request payload. Tool choice is `auto` whenever
    /// tools are offered.
    fn prepare_request_payload(
        &self,
        model_tag: &str,
        messages: &[Message],
        temperature: f32,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<JsonValue>;

    /// Prepares the payload for an embedding request.
    fn prepare_embedding_request(&self, model_tag: &str, texts: &[String]) -> JsonValue;

    /// Prepares the payload for a text-to-speech request.
    fn prepare_speech_request(&self, model_tag: &str, text: &str, voice: &str) -> JsonValue;
}

/// Provider-specific response parsing into the standard payloads.
pub trait ResponseParser: Send + Sync {
    /// Parses a raw JSON response string into a standardized `ResponsePayload`.
    fn parse_response(&self, raw_response_text: &str) -> Result<ResponsePayload>;

    /// Parses the response from an embedding call into a list of vectors,
    /// in the order of the inputs.
    fn parse_embedding_response(&self, raw_response_text: &str) -> Result<Vec<Vec<f32>>>;
}

/// Picks the adapter and parser pair for a provider.
pub fn resolve(kind: ProviderKind) -> (Arc<dyn ProviderAdapter>, Arc<dyn ResponseParser>) {
    let adapter: Arc<dyn ProviderAdapter> = match kind {
        ProviderKind::AzureOpenAI => Arc::new(azure::AzureOpenAIAdapter),
        ProviderKind::OpenAI => Arc::new(openai::OpenAIAdapter),
    };
    (adapter, Arc::new(openai::OpenAIParser))
}
