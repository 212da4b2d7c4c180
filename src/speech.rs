use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use log::{debug, warn};

use crate::client::{self, RetryPolicy};
use crate::config::{ProviderKind, ServiceConfig};
use crate::error::Result;
use crate::providers::{self, ProviderAdapter};

/// Longest text sent to the speech service in a single request.
pub const MAX_SPEECH_CHARS: usize = 4000;

/// Default number of concurrent speech jobs.
pub const DEFAULT_SPEECH_WORKERS: usize = 4;

/// A text-to-speech service producing MP3 audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// HTTP text-to-speech client.
pub struct SpeechClient {
    service: ServiceConfig,
    voice: String,
    http: reqwest::Client,
    provider_adapter: Arc<dyn ProviderAdapter>,
    retry_policy: RetryPolicy,
}

impl SpeechClient {
    pub fn new(
        provider: ProviderKind,
        service: ServiceConfig,
        voice: impl Into<String>,
        retry_policy: RetryPolicy,
    ) -> Result<Self> {
        let (provider_adapter, _) = providers::resolve(provider);
        Ok(Self {
            service,
            voice: voice.into(),
            http: client::build_http_client()?,
            provider_adapter,
            retry_policy,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let url = self.provider_adapter.get_speech_url(&self.service);
        let headers = self.provider_adapter.get_request_headers(&self.service.api_key)?;
        let payload = self.provider_adapter.prepare_speech_request(
            &self.service.model_name,
            text,
            &self.voice,
        );
        client::execute_binary_call(&self.http, &url, headers, &payload, &self.retry_policy).await
    }
}

/// Converts independent texts to audio with at most `workers` jobs in flight.
///
/// Each text is cut to [`MAX_SPEECH_CHARS`] characters and empty texts are
/// skipped. A failed job is logged and left out of the result; it never
/// cancels the others. Keys are the caller's indices.
pub async fn synthesize_all<S>(
    synth: &S,
    items: Vec<(usize, String)>,
    workers: usize,
) -> BTreeMap<usize, Vec<u8>>
where
    S: SpeechSynthesizer + ?Sized,
{
    let jobs = items
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(index, text)| async move {
            let clipped: String = text.chars().take(MAX_SPEECH_CHARS).collect();
            (index, synth.synthesize(&clipped).await)
        });

    let results: Vec<_> = stream::iter(jobs)
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    let mut audio = BTreeMap::new();
    for (index, result) in results {
        match result {
            Ok(bytes) => {
                debug!("[Speech] Job {} produced {} bytes", index, bytes.len());
                audio.insert(index, bytes);
            }
            Err(e) => warn!("[Speech] Job {} failed: {}", index, e),
        }
    }
    audio
}
