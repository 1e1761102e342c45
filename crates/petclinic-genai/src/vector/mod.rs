//! Similarity-search index over embedded documents.
//!
//! - [`SimpleVectorStore`]: in-memory cosine-similarity index with JSON
//!   snapshot save/load, so embeddings survive restarts.
//! - [`Embedder`]: the embedding engine seam. [`OpenAiEmbedder`] talks to an
//!   OpenAI-compatible `/embeddings` endpoint; [`HashingEmbedder`] is a
//!   deterministic offline embedder.

pub mod embedding;
pub mod store;

pub use embedding::{HashingEmbedder, OpenAiEmbedder};
pub use store::{SearchRequest, SimpleVectorStore};

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::ClinicError;

/// Boxed future returned by [`Embedder::embed`].
pub type EmbedFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, ClinicError>> + Send + 'a>>;

/// Converts texts into vectors for similarity comparison.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. Returns one vector per input, in input order.
    fn embed<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a>;
}

/// A document held by the index: opaque text plus metadata and its embedding.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl Document {
    /// A not-yet-embedded document.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: serde_json::Map::new(),
            embedding: Vec::new(),
        }
    }

    /// Attach a metadata entry (builder pattern).
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Cosine similarity of two vectors. Zero when either vector is zero or the
/// lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}
