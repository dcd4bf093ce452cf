mod client;
pub(crate) mod types;

use std::sync::Arc;

use async_trait::async_trait;

use client::OpenAiHttp;
use types::{ChatRequest, WireMessage};

use crate::error::GenerateError;
use crate::limiter::RateLimiter;
use crate::traits::{Generation, GenerationRequest, TextGenerator};

/// Generator backed by an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// Endpoint and model are optional at construction: calls against a
/// half-configured generator fail with the matching typed reason instead of
/// panicking at startup.
pub struct OpenAiGenerator {
    endpoint: Option<String>,
    model: Option<String>,
    limiter: Arc<RateLimiter>,
}

impl OpenAiGenerator {
    pub fn new(
        endpoint: Option<String>,
        model: Option<String>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
            model: model.filter(|m| !m.trim().is_empty()),
            limiter,
        }
    }

    /// Resolve the chat-completions URL. A configured endpoint already ending
    /// in `/v1` or `/v1/chat/completions` is respected as-is.
    fn resolve_url(&self) -> Result<String, GenerateError> {
        let base = self
            .endpoint
            .as_deref()
            .ok_or(GenerateError::NoEndpoint)?
            .trim_end_matches('/');

        if base.ends_with("/v1/chat/completions") {
            return Ok(base.to_string());
        }
        if base.ends_with("/v1") {
            return Ok(format!("{base}/chat/completions"));
        }
        Ok(format!("{base}/v1/chat/completions"))
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerateError> {
        let url = self.resolve_url()?;
        let model = self.model.clone().ok_or(GenerateError::NoModel)?;

        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(WireMessage::system(&request.system));
        }
        messages.push(WireMessage::user(&request.user));

        let wire = ChatRequest {
            model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        self.limiter.wait_turn().await;
        self.limiter.record_call().await;

        let (response, latency) = OpenAiHttp::new(url).chat(&wire).await?;

        let text = types::extract_text(&response)
            .unwrap_or_default()
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(GenerateError::EmptyResponse);
        }

        Ok(Generation { text, latency })
    }
}
