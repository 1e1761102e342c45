//! Data-access facade used by the clinic tools.
//!
//! [`AiDataProvider`] is the only component the tools talk to. Each tool
//! maps to exactly one method here; the store and the similarity index stay
//! behind it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::ClinicError;
use crate::model::{Owner, Pet, Vet};
use crate::store::{ClinicStore, PageRequest};
use crate::vector::{SearchRequest, SimpleVectorStore};

/// Owners returned by [`AiDataProvider::all_owners`].
pub const OWNER_PAGE_SIZE: usize = 100;

/// Vet search results when a filter is supplied.
pub const VET_FILTERED_TOP_K: usize = 20;

/// Vet search results without a filter.
pub const VET_UNFILTERED_TOP_K: usize = 50;

pub struct AiDataProvider {
    store: Arc<dyn ClinicStore>,
    vectors: Arc<SimpleVectorStore>,
}

impl AiDataProvider {
    pub fn new(store: Arc<dyn ClinicStore>, vectors: Arc<SimpleVectorStore>) -> Self {
        Self { store, vectors }
    }

    /// The first page of owners, at most [`OWNER_PAGE_SIZE`] of them.
    pub fn all_owners(&self) -> Result<Vec<Owner>, ClinicError> {
        let owners = self.store.find_owners(PageRequest::of(0, OWNER_PAGE_SIZE))?;
        debug!("Listed {} owners", owners.len());
        Ok(owners)
    }

    /// Search the vet index.
    ///
    /// The filter's JSON rendering is the query text (`null` without one).
    /// Returns the stored vet documents in similarity order.
    pub async fn vets(&self, filter: Option<&Vet>) -> Result<Vec<String>, ClinicError> {
        let query = serde_json::to_string(&filter)?;
        let top_k = if filter.is_some() {
            VET_FILTERED_TOP_K
        } else {
            VET_UNFILTERED_TOP_K
        };
        let documents = self
            .vectors
            .similarity_search(&SearchRequest::new(query, top_k))
            .await?;
        debug!("Vet search returned {} documents (top_k={top_k})", documents.len());
        Ok(documents.into_iter().map(|d| d.text).collect())
    }

    /// Attach a new pet to an existing owner.
    ///
    /// Any id on the incoming pet is discarded; the store assigns one.
    pub fn add_pet_to_owner(&self, owner_id: i32, mut pet: Pet) -> Result<Owner, ClinicError> {
        pet.id = None;
        info!("Adding pet '{}' to owner {owner_id}", pet.name);
        self.store.add_pet(owner_id, pet)
    }

    /// Register a new owner.
    ///
    /// Always creates a record: ids on the owner and its pets are discarded
    /// so an existing owner can never be overwritten through this path.
    pub fn add_owner(&self, mut owner: Owner) -> Result<Owner, ClinicError> {
        owner.id = None;
        owner.pets.iter_mut().for_each(|pet| pet.id = None);
        let saved = self.store.save_owner(owner)?;
        info!(
            "Registered owner {} {} (id {:?})",
            saved.first_name, saved.last_name, saved.id
        );
        Ok(saved)
    }
}

impl std::fmt::Debug for AiDataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiDataProvider")
            .field("vectors", &self.vectors)
            .finish()
    }
}
