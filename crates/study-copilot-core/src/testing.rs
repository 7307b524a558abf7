//! Deterministic test doubles for the embedder and generator traits.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::generation::{GenerationRequest, TextGenerator};

/// Hashed bag-of-words embedder. Texts sharing words land close together.
///
/// [`HashEmbedder::set_failing`] makes every later call fail.
pub struct HashEmbedder {
    dim: AtomicUsize,
    failing: AtomicBool,
    pub batches: Mutex<Vec<usize>>,
    pub calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim: AtomicUsize::new(dim),
            failing: AtomicBool::new(false),
            batches: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_dim(&self, dim: usize) {
        self.dim.store(dim, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn vector(text: &str, dim: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; dim];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut h: u64 = 0xcbf29ce484222325;
            for b in word.bytes() {
                h ^= b as u64;
                h = h.wrapping_mul(0x100000001b3);
            }
            v[(h % dim as u64) as usize] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-test"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            bail!("embedding endpoint unreachable");
        }
        self.batches.lock().unwrap().push(texts.len());
        let dim = self.dim.load(Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t, dim)).collect())
    }
}

/// Generator that replies with a fixed string and records every request.
pub struct ScriptedGenerator {
    reply: Result<String, String>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn last_request(&self) -> GenerationRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(msg) => bail!("{}", msg),
        }
    }
}
