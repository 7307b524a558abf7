//! Text generation backends.
//!
//! Interchangeable implementations of the core [`TextGenerator`] trait:
//! - **[`OpenAiGenerator`]**: OpenAI-compatible chat completions, falling back
//!   to the raw completions endpoint with a role-tagged prompt when chat
//!   fails or returns no content.
//! - **[`OllamaGenerator`]**: a local model served by Ollama (`/api/generate`).
//! - **[`DisabledGenerator`]**: always fails with a configuration hint.
//!
//! Each study task (answer, summary, MCQ) gets its own generator instance
//! so the tasks can use different models. See [`create_generator`].

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use study_copilot_core::generation::{GenerationRequest, TextGenerator};

use crate::config::GenerationConfig;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

// ============ Disabled ============

pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        bail!("Generation provider is disabled; set [generation].provider in the config")
    }
}

// ============ OpenAI-compatible ============

/// Generator for OpenAI-compatible HTTP APIs.
///
/// The API key is read from the environment variable named by
/// `generation.api_key_env`. It may be absent only when a custom `url`
/// points at a server that does not need one.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    model: String,
    url: String,
    api_key: Option<String>,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig, model: &str) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() && config.url.is_none() {
            bail!("{} environment variable not set", config.api_key_env);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            model: model.to_string(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            api_key,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let mut req = self
            .client
            .post(format!("{}{}", self.url.trim_end_matches('/'), path))
            .json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .with_context(|| format!("request to {}{} failed", self.url, path))?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("API error {} from {}: {}", status, path, body_text);
        }
        Ok(response.json().await?)
    }

    async fn chat(&self, request: &GenerationRequest) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_new_tokens,
        });
        let json = self.post("/v1/chat/completions", &body).await?;
        parse_chat_response(&json)
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        let body = json!({
            "model": self.model,
            "prompt": role_tagged_prompt(request),
            "temperature": request.temperature,
            "max_tokens": request.max_new_tokens,
        });
        let json = self.post("/v1/completions", &body).await?;
        parse_completion_response(&json)
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        match self.chat(request).await {
            Ok(text) => Ok(text),
            Err(chat_err) => {
                log::warn!(
                    "chat completion failed for {} ({:#}); retrying as raw completion",
                    self.model,
                    chat_err
                );
                self.complete(request)
                    .await
                    .with_context(|| format!("chat completion also failed: {:#}", chat_err))
            }
        }
    }
}

/// Flatten system and user prompts for completion-only models.
pub fn role_tagged_prompt(request: &GenerationRequest) -> String {
    let mut prompt = String::new();
    if let Some(system) = &request.system {
        prompt.push_str("<|system|>\n");
        prompt.push_str(system);
        prompt.push('\n');
    }
    prompt.push_str("<|user|>\n");
    prompt.push_str(&request.prompt);
    prompt.push('\n');
    prompt.push_str("<|assistant|>\n");
    prompt
}

/// `choices[0].message.content`; empty content counts as a failure.
fn parse_chat_response(json: &Value) -> Result<String> {
    let content = json
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow!("Invalid chat response: missing choices[0].message.content"))?;
    if content.trim().is_empty() {
        bail!("chat response had empty content");
    }
    Ok(content.trim().to_string())
}

fn parse_completion_response(json: &Value) -> Result<String> {
    let text = json
        .pointer("/choices/0/text")
        .and_then(|t| t.as_str())
        .ok_or_else(|| anyhow!("Invalid completion response: missing choices[0].text"))?;
    Ok(text.trim().to_string())
}

// ============ Ollama ============

/// Generator backed by a local Ollama server.
pub struct OllamaGenerator {
    client: reqwest::Client,
    model: String,
    url: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            model: model.to_string(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let mut body = json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_new_tokens,
            },
        });
        if let Some(system) = &request.system {
            body["system"] = json!(system);
        }

        let response = self
            .client
            .post(format!("{}/api/generate", self.url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url,
                    e
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }
        let json: Value = response.json().await?;
        parse_ollama_generate(&json)
    }
}

fn parse_ollama_generate(json: &Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|r| r.trim().to_string())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing response field"))
}

/// Create the generator named by `generation.provider` for one model.
pub fn create_generator(config: &GenerationConfig, model: &str) -> Result<Arc<dyn TextGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => Ok(Arc::new(OpenAiGenerator::new(config, model)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config, model)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}
