//! HTTP client for the Gemini `generateContent` endpoint.
//!
//! [`GeminiClient`] implements [`TextGenerator`], so the core operations can
//! run against the real service or against an in-process fake in tests.

mod wire;

use std::time::{Duration, Instant};

use annotator_shared::{
    AnnotatorError, GeminiConfig, GenerationRequest, ModelTier, Result, TextGenerator,
};
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use wire::{GenerateContentRequest, GenerateContentResponse, WireError};

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("blueprint-annotator/", env!("CARGO_PKG_VERSION"));

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Longest slice of an error body echoed back in messages.
const MAX_ERROR_BODY: usize = 200;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A configured handle to the generation service.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    model: String,
    creative_model: String,
}

impl GeminiClient {
    /// Build a client from the `[gemini]` config section and a resolved API key.
    pub fn from_config(config: &GeminiConfig, api_key: impl Into<String>) -> Result<Self> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            AnnotatorError::config(format!("invalid gemini base_url '{}': {e}", config.base_url))
        })?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnnotatorError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            model: config.model.clone(),
            creative_model: config.creative_model.clone(),
        })
    }

    /// Model name used for a tier.
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Standard => &self.model,
            ModelTier::Creative => &self.creative_model,
        }
    }

    fn endpoint(&self, model: &str) -> Result<Url> {
        self.base_url
            .join(&format!("v1beta/models/{model}:generateContent"))
            .map_err(|e| AnnotatorError::config(format!("invalid endpoint for model {model}: {e}")))
    }

    #[instrument(skip_all, fields(model = %self.model_for(request.tier), prompt_len = request.prompt.len()))]
    async fn send(&self, request: GenerationRequest) -> Result<String> {
        let model = self.model_for(request.tier);
        let url = self.endpoint(model)?;
        let body = GenerateContentRequest::new(&request.prompt, request.format);
        let started = Instant::now();

        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnnotatorError::Network(format!("{model}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AnnotatorError::Network(format!("{model}: failed to read body: {e}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<WireError>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| text.chars().take(MAX_ERROR_BODY).collect());
            return Err(AnnotatorError::Generation(format!(
                "{model}: HTTP {status}: {detail}"
            )));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            AnnotatorError::Generation(format!("{model}: invalid response body: {e}"))
        })?;

        let output = parsed
            .into_text()
            .map_err(|reason| AnnotatorError::Generation(format!("{model}: {reason}")))?;

        debug!(
            latency_ms = started.elapsed().as_millis() as u64,
            output_len = output.len(),
            "generation complete"
        );

        Ok(output)
    }
}

impl TextGenerator for GeminiClient {
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> impl std::future::Future<Output = Result<String>> + Send {
        self.send(request)
    }
}
