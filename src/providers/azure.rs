use crate::config::ServiceConfig;
use crate::datam::Message;
use crate::error::{ChatbotError, Result};
use crate::tools::ToolDefinition;

use super::openai::chat_payload;
use super::ProviderAdapter;
use reqwest::header;
use serde_json::{json, Value as JsonValue};

/// Adapter for Azure OpenAI deployments. The model name is the deployment
/// name and travels in the URL, not the payload.
pub struct AzureOpenAIAdapter;

impl AzureOpenAIAdapter {
    fn deployment_url(service: &ServiceConfig, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            service.endpoint.trim_end_matches('/'),
            service.model_name,
            operation,
            service.api_version
        )
    }
}

impl ProviderAdapter for AzureOpenAIAdapter {
    fn get_provider_name(&self) -> &str {
        "Azure OpenAI"
    }

    fn get_request_url(&self, service: &ServiceConfig) -> String {
        Self::deployment_url(service, "chat/completions")
    }

    fn get_embedding_url(&self, service: &ServiceConfig) -> String {
        Self::deployment_url(service, "embeddings")
    }

    fn get_speech_url(&self, service: &ServiceConfig) -> String {
        Self::deployment_url(service, "audio/speech")
    }

    fn get_request_headers(&self, api_key: &str) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        let key = header::HeaderValue::from_str(api_key)
            .map_err(|e| ChatbotError::Config(format!("Invalid API key header: {}", e)))?;
        headers.insert("api-key", key);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }

    fn prepare_request_payload(
        &self,
        _model_tag: &str,
        messages: &[Message],
        temperature: f32,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<JsonValue> {
        chat_payload(None, messages, temperature, tools)
    }

    fn prepare_embedding_request(&self, _model_tag: &str, texts: &[String]) -> JsonValue {
        json!({ "input": texts })
    }

    fn prepare_speech_request(&self, model_tag: &str, text: &str, voice: &str) -> JsonValue {
        json!({
            "model": model_tag,
            "input": text,
            "voice": voice,
            "response_format": "mp3",
        })
    }
}
