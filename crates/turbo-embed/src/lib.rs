//! turbo-embed
//!
//! Embedding collaborators. `HttpEmbedder` talks to an Ollama-style
//! `/api/embeddings` endpoint; `FakeEmbedder` hashes tokens into buckets and
//! is used for tests and offline development. Both return unit-length vectors
//! so that a dot product equals cosine similarity.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use turbo_core::config::EmbeddingSettings;
use turbo_core::error::{Error, Result};
pub use turbo_core::traits::Embedder;

#[derive(Serialize)]
struct EmbeddingRequest<'a> { model: &'a str, prompt: &'a str }

#[derive(Deserialize)]
struct EmbeddingResponse { #[serde(default)] embedding: Vec<f64> }

/// Scale `vec` to unit L2 norm in place. A zero vector is left untouched.
pub fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    if norm == 0.0 { return; }
    let inv = (1.0 / norm) as f32;
    for x in vec.iter_mut() { *x *= inv; }
}

pub struct HttpEmbedder { client: reqwest::blocking::Client, url: String, model: String, dim: usize }

impl HttpEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("embedding client: {e}")))?;
        Ok(Self { client, url: settings.url.clone(), model: settings.model.clone(), dim: settings.dimension })
    }
}

impl Embedder for HttpEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let resp = self.client
            .post(&self.url)
            .json(&EmbeddingRequest { model: &self.model, prompt: text })
            .send()
            .map_err(|e| Error::Embedding(format!("request to {} failed: {e}", self.url)))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(Error::Embedding(format!("embedding service returned {status}: {body}")));
        }
        let parsed: EmbeddingResponse = resp.json().map_err(|e| Error::Embedding(format!("invalid embedding payload: {e}")))?;
        if parsed.embedding.is_empty() { return Err(Error::Embedding("empty embedding returned".to_string())); }
        if parsed.embedding.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, got: parsed.embedding.len() });
        }
        #[allow(clippy::cast_possible_truncation)]
        let mut vec: Vec<f32> = parsed.embedding.iter().map(|v| *v as f32).collect();
        normalize(&mut vec);
        tracing::trace!(elapsed_ms = start.elapsed().as_millis() as u64, "embedded text");
        Ok(vec)
    }
}

/// Deterministic bag-of-tokens embedder. Texts sharing tokens get similar vectors.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder { pub fn new(dim: usize) -> Self { Self { dim } } }

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        use std::hash::{Hash, Hasher}; use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        let mut tokens = 0usize;
        for (i, token) in text.split_whitespace().enumerate() {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0); token.hash(&mut hasher); let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += 0.5 + val + (i as f32 % 3.0) * 0.01;
            tokens += 1;
        }
        if tokens == 0 { return Err(Error::Embedding("no tokens to embed".to_string())); }
        normalize(&mut v);
        Ok(v)
    }
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.fake {
        tracing::info!(dim = settings.dimension, "using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.dimension)));
    }
    tracing::info!(url = %settings.url, model = %settings.model, dim = settings.dimension, "using HTTP embedder");
    Ok(Arc::new(HttpEmbedder::new(settings)?))
}
