//! Text generation abstraction.
//!
//! A [`TextGenerator`] turns one prompt (plus an optional system prompt)
//! into text. Concrete backends (HTTP APIs, local servers) live in the
//! application crate; the core flows only see this trait.

use async_trait::async_trait;
use serde::Serialize;

/// Highest sampling temperature passed to any backend.
pub const MAX_TEMPERATURE: f32 = 2.0;

/// One generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub system: Option<String>,
    pub prompt: String,
    /// Always within `[0, MAX_TEMPERATURE]`.
    pub temperature: f32,
    pub max_new_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: 0.0,
            max_new_tokens: 256,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = clamp_temperature(temperature);
        self
    }

    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }
}

/// Clamp into `[0, MAX_TEMPERATURE]`; NaN becomes 0.
pub fn clamp_temperature(temperature: f32) -> f32 {
    if temperature.is_nan() {
        0.0
    } else {
        temperature.clamp(0.0, MAX_TEMPERATURE)
    }
}

/// A backend that produces text for a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier, for logs and status output.
    fn model_name(&self) -> &str;

    /// Generate text. Transport and decoding failures are returned as errors;
    /// callers wrap them as external-service failures.
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String>;
}
