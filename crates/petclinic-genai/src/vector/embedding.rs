//! Embedding engines.
//!
//! [`OpenAiEmbedder`] calls an OpenAI-compatible `/embeddings` endpoint in
//! fixed-size batches with bounded concurrency. [`HashingEmbedder`] maps
//! tokens into signed buckets with FNV-1a; it needs no network and gives the
//! same vector for the same text every time.

use std::time::{Duration, Instant};

use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EmbedFuture, Embedder};
use crate::api::retry::{RetryConfig, retry_api_call};
use crate::error::ClinicError;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default embedding model for [`OpenAiEmbedder`].
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Inputs per `/embeddings` request.
const DEFAULT_BATCH_SIZE: usize = 64;

/// Concurrent `/embeddings` requests per [`Embedder::embed`] call.
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;

// ── OpenAI-compatible client ───────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Async client for an OpenAI-compatible embeddings API.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    batch_size: usize,
    max_concurrent: usize,
    retry: RetryConfig,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("petclinic-genai/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            model: model.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent: DEFAULT_MAX_CONCURRENT_REQUESTS,
            retry: RetryConfig::with_retries(2),
        })
    }

    /// Point the client at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the number of inputs sent per request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set how many requests one [`Embedder::embed`] call keeps in flight.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    async fn embed_chunk(&self, chunk: &[String]) -> Result<Vec<Vec<f32>>, String> {
        retry_api_call("embeddings", &self.retry, || self.embed_batch(chunk)).await
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, String> {
        let start = Instant::now();
        let resp = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: batch,
            })
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;
        debug!(
            "Embedding response: HTTP {} in {:.1}s ({} inputs)",
            status,
            start.elapsed().as_secs_f64(),
            batch.len()
        );

        if !status.is_success() {
            return Err(format!("embeddings API HTTP {status}: {text}"));
        }

        let mut parsed: EmbeddingResponse = serde_json::from_str(&text)
            .map_err(|e| format!("failed to parse embeddings response: {e}"))?;
        if parsed.data.len() != batch.len() {
            return Err(format!(
                "embeddings API returned {} vectors for {} inputs",
                parsed.data.len(),
                batch.len()
            ));
        }
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a> {
        Box::pin(async move {
            let requests: Vec<_> = texts
                .chunks(self.batch_size)
                .map(|chunk| self.embed_chunk(chunk))
                .collect();
            let batches: Vec<Vec<Vec<f32>>> = stream::iter(requests)
                .buffered(self.max_concurrent)
                .try_collect()
                .await
                .map_err(ClinicError::Embedding)?;
            Ok(batches.into_iter().flatten().collect())
        })
    }
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

// ── Feature hashing ────────────────────────────────────────────────

/// Deterministic bag-of-words embedder.
///
/// Each lowercase alphanumeric token is hashed into one of `dimensions`
/// buckets with a hash-derived sign; the result is L2-normalised. Texts that
/// share tokens score higher under cosine similarity.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed a single text.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokens(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Embedder for HashingEmbedder {
    fn embed<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a> {
        let vectors = texts.iter().map(|t| self.embed_one(t)).collect();
        Box::pin(async move { Ok(vectors) })
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// FNV-1a, 64-bit.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::cosine_similarity;

    #[test]
    fn hashing_is_deterministic_and_normalised() {
        let e = HashingEmbedder::new(64);
        let a = e.embed_one("Linda Douglas surgery dentistry");
        let b = e.embed_one("Linda Douglas surgery dentistry");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let v = HashingEmbedder::default().embed_one("  {} ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn shared_tokens_raise_similarity() {
        let e = HashingEmbedder::default();
        let query = e.embed_one(r#"{"specialties":[{"name":"surgery"}]}"#);
        let surgeon = e.embed_one(r#"{"specialties":[{"name":"surgery"}],"lastName":"Ortega"}"#);
        let radiologist = e.embed_one(r#"{"specialties":[{"name":"radiology"}],"lastName":"Leary"}"#);
        assert!(cosine_similarity(&query, &surgeon) > cosine_similarity(&query, &radiologist));
    }

    #[test]
    fn tokens_split_on_punctuation_and_lowercase() {
        let t: Vec<String> = tokens(r#"{"firstName":"Helen","id":2}"#).collect();
        assert_eq!(t, vec!["firstname", "helen", "id", "2"]);
    }

    #[tokio::test]
    async fn embed_batch_preserves_order() {
        let e = HashingEmbedder::new(32);
        let texts = vec!["one".to_string(), "two".to_string()];
        let vectors = e.embed(&texts).await.unwrap();
        assert_eq!(vectors[0], e.embed_one("one"));
        assert_eq!(vectors[1], e.embed_one("two"));
    }

    #[test]
    fn openai_embedder_trims_base_url() {
        let e = OpenAiEmbedder::new("key", DEFAULT_EMBEDDING_MODEL)
            .unwrap()
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(e.base_url, "http://localhost:8080/v1");
    }
}
