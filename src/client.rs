use std::time::Duration;

use log::warn;
use rand::Rng;
use reqwest::{header, Client, Response, StatusCode};
use serde_json::Value as JsonValue;
use tokio::time::sleep;

use crate::error::{ChatbotError, Result};

/// Defines the retry strategy for API calls.
///
/// Only rate-limit responses (HTTP 429) and network-level failures are
/// retried. Every other status is returned to the caller immediately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub jitter: Jitter,
}

/// Defines the type of jitter to apply to retry delays.
#[derive(Debug, Clone, Copy)]
pub enum Jitter {
    Full,
    None,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 200,
            jitter: Jitter::Full,
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let mut delay_ms = self.base_delay_ms * 2_u64.pow(attempt);
        if let Jitter::Full = self.jitter {
            delay_ms += rand::thread_rng().gen_range(0..=delay_ms / 4);
        }
        Duration::from_millis(delay_ms)
    }
}

/// Builds the HTTP client shared by all service clients of one component.
pub fn build_http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(Into::into)
}

/// Executes a single JSON API call with retry logic and returns the body text.
pub async fn execute_single_call(
        client: &Client,
        url: &str,
        headers: header::HeaderMap,
        body: &JsonValue,
        retry_policy: &RetryPolicy,
    ) -> Result<String> {
    let response = send_with_retry(client, url, headers, body, retry_policy).await?;
    Ok(response.text().await?)
}

/// Executes a single API call whose successful response is binary (e.g. audio).
pub async fn execute_binary_call(
        client: &Client,
        url: &str,
        headers: header::HeaderMap,
        body: &JsonValue,
        retry_policy: &RetryPolicy,
    ) -> Result<Vec<u8>> {
    let response = send_with_retry(client, url, headers, body, retry_policy).await?;
    Ok(response.bytes().await?.to_vec())
}

async fn send_with_retry(
        client: &Client,
        url: &str,
        headers: header::HeaderMap,
        body: &JsonValue,
        retry_policy: &RetryPolicy,
    ) -> Result<Response> {
    let attempts = retry_policy.max_retries.max(1);

    for i in 0..attempts {
        let response_result = client
            .post(url)
            .headers(headers.clone())
            .json(body)
            .send()
            .await;

        match response_result {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }

                if status == StatusCode::TOO_MANY_REQUESTS && i + 1 < attempts {
                    warn!("Rate limit exceeded. Retrying... (Attempt {}/{})", i + 1, attempts);
                    sleep(retry_policy.delay_for(i)).await;
                    continue;
                }

                let body = response.text().await.unwrap_or_default();
                return Err(ChatbotError::Api {
                    status: status.as_u16(),
                    body,
                });
            }
            Err(e) => {
                warn!("Network request failed (Attempt {}/{}): {}", i + 1, attempts, e);
                if i + 1 >= attempts {
                    return Err(e.into());
                }
                sleep(retry_policy.delay_for(i)).await;
            }
        }
    }

    Err(ChatbotError::Chat(
        "API call exhausted all retries without success.".to_string(),
    ))
}
