use std::time::Duration;

use async_trait::async_trait;

use crate::error::GenerateError;

/// One generation request: a system instruction, a user instruction, and the
/// sampling limits the caller wants applied.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 512,
            temperature: 0.3,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A successful generation with the measured round-trip latency.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub latency: Duration,
}

/// Seam between the pipeline and the model endpoint.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerateError>;
}
