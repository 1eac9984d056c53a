//! HTTP client for a hosted text-to-image inference endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::retry::{parse_estimated_time, warmup_delay, WarmupPolicy};
use crate::{ImageSynthesizer, SynthesisError, SynthesisRequest};

/// Default inference endpoint (Stable Diffusion XL base).
pub const DEFAULT_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-xl-base-1.0";

/// Connection settings for [`SynthesisApi`].
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// Full URL requests are POSTed to.
    pub endpoint: String,
    /// Sent as a bearer token when set.
    pub api_token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    pub warmup: WarmupPolicy,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_token: None,
            timeout: Duration::from_secs(120),
            warmup: WarmupPolicy::default(),
        }
    }
}

/// HTTP client for a single inference endpoint.
pub struct SynthesisApi {
    client: reqwest::Client,
    config: SynthesisConfig,
}

impl SynthesisApi {
    /// Create a client with its own connection pool.
    pub fn new(config: SynthesisConfig) -> Result<Self, SynthesisError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: SynthesisConfig) -> Self {
        Self { client, config }
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    // ---- private helpers ----

    async fn submit(&self, body: &serde_json::Value) -> Result<reqwest::Response, SynthesisError> {
        let mut request = self.client.post(&self.config.endpoint).json(body);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }

    /// Ensure the response has a success status code, or turn it into
    /// [`SynthesisError::Api`] carrying the status and body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, SynthesisError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SynthesisError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ImageSynthesizer for SynthesisApi {
    async fn generate(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        let body = request.to_wire();
        let policy = &self.config.warmup;
        let mut attempt = 1u32;

        loop {
            let response = self.submit(&body).await?;

            if response.status() == StatusCode::SERVICE_UNAVAILABLE {
                let text = response.text().await.unwrap_or_default();
                let estimated = parse_estimated_time(&text);

                if attempt >= policy.max_attempts {
                    return Err(SynthesisError::WarmingUp {
                        estimated_secs: estimated.unwrap_or(0.0),
                    });
                }

                let delay = warmup_delay(estimated, policy);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Synthesis model warming up, retrying",
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let response = Self::ensure_success(response).await?;
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                return Err(SynthesisError::EmptyResponse);
            }
            tracing::debug!(attempt, bytes = bytes.len(), "Synthesis succeeded");
            return Ok(bytes.to_vec());
        }
    }
}
