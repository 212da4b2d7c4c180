use crate::config::ServiceConfig;
use crate::datam::{Message, ResponsePayload};
use crate::error::{ChatbotError, Result};
use crate::tools::ToolDefinition;

use super::{ProviderAdapter, ResponseParser};
use reqwest::header;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

/// Adapter for the OpenAI API.
pub struct OpenAIAdapter;

/// Parser for OpenAI-format responses. Azure OpenAI returns the same shapes.
pub struct OpenAIParser;

/// Serializes messages for the wire. OpenAI expects tool-call arguments as a
/// string, so our decoded JSON arguments are re-stringified here.
pub(crate) fn wire_messages(messages: &[Message]) -> Result<Vec<JsonValue>> {
    messages
        .iter()
        .map(|msg| {
            let mut value = serde_json::to_value(msg)?;
            if let Some(calls) = value.get_mut("tool_calls").and_then(JsonValue::as_array_mut) {
                for call in calls {
                    if let Some(args) = call.pointer_mut("/function/arguments") {
                        if !args.is_string() {
                            *args = json!(args.to_string());
                        }
                    }
                }
            }
            Ok(value)
        })
        .collect()
}

/// Builds the chat payload shared by OpenAI-compatible providers.
pub(crate) fn chat_payload(
    model_tag: Option<&str>,
    messages: &[Message],
    temperature: f32,
    tools: Option<&[ToolDefinition]>,
) -> Result<JsonValue> {
    let mut payload = json!({
        "messages": wire_messages(messages)?,
        "temperature": temperature,
    });

    if let Some(model) = model_tag {
        payload["model"] = json!(model);
    }

    if let Some(tools) = tools.filter(|t| !t.is_empty()) {
        payload["tools"] = json!(tools);
        payload["tool_choice"] = json!("auto");
    }

    Ok(payload)
}

impl ProviderAdapter for OpenAIAdapter {
    fn get_provider_name(&self) -> &str {
        "OpenAI"
    }

    fn get_request_url(&self, service: &ServiceConfig) -> String {
        format!("{}/chat/completions", service.endpoint.trim_end_matches('/'))
    }

    fn get_embedding_url(&self, service: &ServiceConfig) -> String {
        format!("{}/embeddings", service.endpoint.trim_end_matches('/'))
    }

    fn get_speech_url(&self, service: &ServiceConfig) -> String {
        format!("{}/audio/speech", service.endpoint.trim_end_matches('/'))
    }

    fn get_request_headers(&self, api_key: &str) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        let bearer = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| ChatbotError::Config(format!("Invalid API key header: {}", e)))?;
        headers.insert(header::AUTHORIZATION, bearer);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }

    fn prepare_request_payload(
        &self,
        model_tag: &str,
        messages: &[Message],
        temperature: f32,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<JsonValue> {
        chat_payload(Some(model_tag), messages, temperature, tools)
    }

    fn prepare_embedding_request(&self, model_tag: &str, texts: &[String]) -> JsonValue {
        json!({ "model": model_tag, "input": texts })
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

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl ResponseParser for OpenAIParser {
    fn parse_response(&self, raw_response_text: &str) -> Result<ResponsePayload> {
        let mut payload: ResponsePayload = serde_json::from_str(raw_response_text)?;

        if let Some(choice) = payload.choices.get_mut(0) {
            // Tool arguments arrive as stringified JSON.
            if let Message::Assistant { tool_calls: Some(tool_calls), .. } = &mut choice.message {
                for call in tool_calls {
                    if let Some(args_str) = call.function.arguments.as_str() {
                        call.function.arguments =
                            serde_json::from_str(args_str).unwrap_or_else(|_| json!({}));
                    }
                }
            }
        }

        Ok(payload)
    }

    fn parse_embedding_response(&self, raw_response_text: &str) -> Result<Vec<Vec<f32>>> {
        let mut response: EmbeddingResponse = serde_json::from_str(raw_response_text)?;
        if response.data.is_empty() {
            return Err(ChatbotError::ResponseParse(
                "Embedding response contained no vectors".to_string(),
            ));
        }
        response.data.sort_by_key(|item| item.index);
        Ok(response.data.into_iter().map(|item| item.embedding).collect())
    }
}
