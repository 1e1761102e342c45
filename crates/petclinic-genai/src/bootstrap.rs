//! One-shot population of the vet similarity index at process start.
//!
//! If a snapshot exists it is loaded as-is and no embedding calls are made.
//! Otherwise every vet is read from the store, rendered to a [`Document`],
//! embedded in one batch, and the index is written back to the same
//! snapshot path for the next start.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{info, warn};

use crate::error::ClinicError;
use crate::model::Vet;
use crate::store::{ClinicStore, PageRequest};
use crate::vector::{Document, SimpleVectorStore};

/// Default snapshot location, relative to the working directory.
pub const DEFAULT_SNAPSHOT_PATH: &str = "vectorstore.json";

/// What a [`VectorStoreBootstrap::run`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// An existing snapshot was loaded.
    Loaded { documents: usize },
    /// Vets were embedded and a new snapshot written.
    Ingested { documents: usize, snapshot: PathBuf },
    /// The store held no vets. Nothing was embedded and no snapshot was
    /// written, so the next start tries again.
    Empty,
    /// This bootstrap already ran; nothing was touched.
    AlreadyRan,
}

pub struct VectorStoreBootstrap {
    store: Arc<dyn ClinicStore>,
    vectors: Arc<SimpleVectorStore>,
    snapshot: PathBuf,
    started: AtomicBool,
}

impl VectorStoreBootstrap {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        vectors: Arc<SimpleVectorStore>,
        snapshot: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            vectors,
            snapshot: snapshot.into(),
            started: AtomicBool::new(false),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot
    }

    /// Load the snapshot or ingest the vets. Only the first call does any
    /// work; later calls return [`BootstrapOutcome::AlreadyRan`].
    pub async fn run(&self) -> Result<BootstrapOutcome, ClinicError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(BootstrapOutcome::AlreadyRan);
        }

        if self.snapshot.exists() {
            let documents = self.vectors.load(&self.snapshot)?;
            info!(
                "Vector store loaded from existing snapshot {} ({documents} documents)",
                self.snapshot.display()
            );
            return Ok(BootstrapOutcome::Loaded { documents });
        }

        let start = Instant::now();
        let vets = self.store.find_vets(PageRequest::unpaged())?;
        if vets.is_empty() {
            warn!("No vets in the store; skipping ingest and snapshot");
            return Ok(BootstrapOutcome::Empty);
        }
        let documents = vets_to_documents(&vets)?;
        let count = documents.len();
        self.vectors.add(documents).await?;
        self.vectors.save(&self.snapshot)?;
        info!(
            "Embedded {count} vets in {:.1}s; snapshot written to {}",
            start.elapsed().as_secs_f64(),
            self.snapshot.display()
        );
        Ok(BootstrapOutcome::Ingested {
            documents: count,
            snapshot: self.snapshot.clone(),
        })
    }
}

/// One document per vet: the vet's JSON rendering as text, its id as
/// `vetId` metadata.
pub fn vets_to_documents(vets: &[Vet]) -> Result<Vec<Document>, ClinicError> {
    vets.iter()
        .enumerate()
        .map(|(index, vet)| -> Result<Document, ClinicError> {
            let text = serde_json::to_string(vet)?;
            let id = vet.id.map_or_else(|| format!("vet-{index}"), |id| format!("vet-{id}"));
            Ok(Document::new(id, text).with_metadata("vetId", vet.id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryClinicStore;
    use crate::vector::HashingEmbedder;

    fn bootstrap(snapshot: &Path) -> (VectorStoreBootstrap, Arc<SimpleVectorStore>) {
        let vectors = Arc::new(SimpleVectorStore::new(Arc::new(HashingEmbedder::default())));
        let boot = VectorStoreBootstrap::new(
            Arc::new(InMemoryClinicStore::seeded()),
            vectors.clone(),
            snapshot,
        );
        (boot, vectors)
    }

    #[test]
    fn documents_carry_vet_json_and_id() {
        let vets = vec![Vet::new("Helen", "Leary").with_specialty("radiology")];
        let mut with_id = vets.clone();
        with_id[0].id = Some(2);

        let docs = vets_to_documents(&with_id).unwrap();
        assert_eq!(docs[0].id, "vet-2");
        assert_eq!(docs[0].metadata["vetId"], 2);
        let parsed: Vet = serde_json::from_str(&docs[0].text).unwrap();
        assert_eq!(parsed, with_id[0]);

        let unnumbered = vets_to_documents(&vets).unwrap();
        assert_eq!(unnumbered[0].id, "vet-0");
        assert!(unnumbered[0].metadata["vetId"].is_null());
    }

    #[tokio::test]
    async fn ingests_then_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectorstore.json");

        let (first, vectors) = bootstrap(&path);
        let outcome = first.run().await.unwrap();
        assert_eq!(
            outcome,
            BootstrapOutcome::Ingested {
                documents: 6,
                snapshot: path.clone()
            }
        );
        assert_eq!(vectors.len(), 6);
        assert!(path.exists());

        let (second, reloaded) = bootstrap(&path);
        assert_eq!(second.run().await.unwrap(), BootstrapOutcome::Loaded { documents: 6 });
        assert_eq!(reloaded.len(), 6);
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let (boot, vectors) = bootstrap(&dir.path().join("vectorstore.json"));
        boot.run().await.unwrap();
        assert_eq!(boot.run().await.unwrap(), BootstrapOutcome::AlreadyRan);
        assert_eq!(vectors.len(), 6);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectorstore.json");
        std::fs::write(&path, "not json").unwrap();
        let (boot, _) = bootstrap(&path);
        assert_eq!(boot.run().await.unwrap_err().kind(), "snapshot");
    }

    #[tokio::test]
    async fn empty_store_writes_no_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectorstore.json");
        let store = Arc::new(InMemoryClinicStore::new());
        let vectors = Arc::new(SimpleVectorStore::new(Arc::new(HashingEmbedder::default())));

        let empty = VectorStoreBootstrap::new(store.clone(), vectors.clone(), &path);
        assert_eq!(empty.run().await.unwrap(), BootstrapOutcome::Empty);
        assert!(!path.exists());
        assert!(vectors.is_empty());

        // Vets added before the next start are ingested then.
        store.insert_vet(Vet::new("Rafael", "Ortega").with_specialty("surgery"));
        let next = VectorStoreBootstrap::new(store, vectors.clone(), &path);
        assert!(matches!(
            next.run().await.unwrap(),
            BootstrapOutcome::Ingested { documents: 1, .. }
        ));
        assert!(path.exists());
    }
}
