//! In-memory similarity index with JSON snapshots.

use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Document, Embedder, cosine_similarity};
use crate::error::ClinicError;

/// A similarity query: the query text, how many results to return, and an
/// optional minimum score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    pub similarity_threshold: Option<f32>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
            similarity_threshold: None,
        }
    }

    /// Drop results scoring below `threshold` (builder pattern).
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }
}

/// On-disk snapshot layout.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    documents: Vec<Document>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    documents: &'a [Document],
}

/// Cosine-similarity index that keeps every document and its embedding in
/// memory and can persist itself to a JSON snapshot.
pub struct SimpleVectorStore {
    embedder: Arc<dyn Embedder>,
    documents: RwLock<Vec<Document>>,
}

impl SimpleVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Embed and insert a batch of documents with a single embedding call.
    pub async fn add(&self, mut documents: Vec<Document>) -> Result<(), ClinicError> {
        if documents.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(ClinicError::Embedding(format!(
                "expected {} embeddings, got {}",
                documents.len(),
                embeddings.len()
            )));
        }
        for (doc, embedding) in documents.iter_mut().zip(embeddings) {
            doc.embedding = embedding;
        }
        debug!("Indexed {} documents", documents.len());
        self.write().extend(documents);
        Ok(())
    }

    /// Return up to `top_k` documents ranked by similarity to the query.
    /// Ties keep insertion order.
    pub async fn similarity_search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<Document>, ClinicError> {
        let query = [request.query.clone()];
        let query_embedding = self
            .embedder
            .embed(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClinicError::Embedding("no embedding returned for query".into()))?;

        let documents = self.read();
        let mut scored: Vec<(f32, &Document)> = documents
            .iter()
            .map(|d| (cosine_similarity(&query_embedding, &d.embedding), d))
            .filter(|(score, _)| request.similarity_threshold.is_none_or(|t| *score >= t))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(request.top_k);

        debug!(
            "Similarity search: top_k={}, {} of {} documents returned",
            request.top_k,
            scored.len(),
            documents.len()
        );
        Ok(scored.into_iter().map(|(_, d)| d.clone()).collect())
    }

    /// Write every document (with embeddings) to `path`.
    ///
    /// Written to a temp file and renamed into place, so a crash never leaves
    /// a half-written snapshot behind.
    pub fn save(&self, path: &Path) -> Result<(), ClinicError> {
        let json = {
            let documents = self.read();
            serde_json::to_string(&SnapshotRef {
                documents: &documents,
            })?
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClinicError::Snapshot(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|e| {
            ClinicError::Snapshot(format!("failed to write {}: {e}", tmp_path.display()))
        })?;
        std::fs::rename(&tmp_path, path).map_err(|e| {
            ClinicError::Snapshot(format!("failed to move snapshot into {}: {e}", path.display()))
        })?;
        info!("Vector store contents written to {}", path.display());
        Ok(())
    }

    /// Replace the index contents with the snapshot at `path`. No embedding
    /// calls are made. Returns the number of documents loaded.
    pub fn load(&self, path: &Path) -> Result<usize, ClinicError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ClinicError::Snapshot(format!("failed to read {}: {e}", path.display()))
        })?;
        let snapshot: Snapshot = serde_json::from_str(&json).map_err(|e| {
            ClinicError::Snapshot(format!("failed to parse {}: {e}", path.display()))
        })?;
        let count = snapshot.documents.len();
        *self.write() = snapshot.documents;
        Ok(count)
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Document>> {
        self.documents.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Document>> {
        self.documents.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for SimpleVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleVectorStore")
            .field("documents", &self.len())
            .finish()
    }
}
