//! Per-unit speech requests against the upstream HTTP API.
//!
//! A fetcher issues exactly one request per call and never retries; the
//! pipeline owns retry and cache policy. The HTTP fetcher reports the
//! wall-clock duration of every request it sends to the tuning controller,
//! whatever the outcome.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::config::SpeechConfig;
use crate::credentials::CredentialProvider;
use crate::error::{Error, Result};
use crate::tuning::TuningController;
use crate::types::{AudioBlob, TextUnit};
use crate::voice::Voice;

const RESPONSE_FORMAT: &str = "mp3";

/// Turns one text unit into one encoded audio blob.
#[async_trait]
pub trait SpeechFetcher: Send + Sync {
    async fn fetch(&self, unit: &TextUnit, voice: Voice) -> Result<AudioBlob>;
}

/// Request body of the speech endpoint
#[derive(Debug, Serialize)]
struct SpeechRequestBody<'a> {
    model: &'a str,
    input: &'a str,
    voice: Voice,
    response_format: &'a str,
}

/// Error envelope returned by the speech endpoint
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Fetcher for an OpenAI-compatible `/audio/speech` endpoint.
pub struct HttpFetcher {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    provider: String,
    credentials: Arc<dyn CredentialProvider>,
    tuning: Arc<TuningController>,
}

impl HttpFetcher {
    pub fn new(
        config: &SpeechConfig,
        credentials: Arc<dyn CredentialProvider>,
        tuning: Arc<TuningController>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            provider: config.provider.clone(),
            credentials,
            tuning,
        })
    }

    async fn send(&self, api_key: &str, body: &SpeechRequestBody<'_>) -> Result<AudioBlob> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(upstream_error(status, &text));
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);

        let bytes = response.bytes().await?;
        if is_json {
            return Err(upstream_error(status, &String::from_utf8_lossy(&bytes)));
        }
        if bytes.is_empty() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body: "empty audio payload".to_string(),
            });
        }
        Ok(bytes)
    }
}

#[async_trait]
impl SpeechFetcher for HttpFetcher {
    async fn fetch(&self, unit: &TextUnit, voice: Voice) -> Result<AudioBlob> {
        let api_key = self.credentials.api_key(&self.provider).ok_or_else(|| {
            Error::Auth(format!("no API key configured for provider {}", self.provider))
        })?;

        let body = SpeechRequestBody {
            model: &self.model,
            input: &unit.content,
            voice,
            response_format: RESPONSE_FORMAT,
        };

        let started = Instant::now();
        let result = self.send(&api_key, &body).await;
        let elapsed = started.elapsed();
        self.tuning.record_latency(elapsed);

        debug!(
            "Unit {} ({} chars) fetched in {:.2}s: {}",
            unit.index,
            unit.char_len(),
            elapsed.as_secs_f64(),
            if result.is_ok() { "ok" } else { "failed" }
        );
        result
    }
}

/// Map a failed response to the error taxonomy; unparsable bodies are kept raw.
fn upstream_error(status: StatusCode, body: &str) -> Error {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.kind {
            Some(kind) => format!("{} ({})", envelope.error.message, kind),
            None => envelope.error.message,
        },
        Err(_) => body.trim().to_string(),
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(message),
        _ => Error::Upstream {
            status: status.as_u16(),
            body: message,
        },
    }
}
