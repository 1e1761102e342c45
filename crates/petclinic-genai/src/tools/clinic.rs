//! The clinic tools: `listOwners`, `listVets`, `addPetToOwner`,
//! `addOwnerToPetclinic`.
//!
//! Each tool decodes its typed request, makes exactly one
//! [`AiDataProvider`] call and encodes the typed response. The names and
//! descriptions are what the model sees.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::core::{Tool, ToolFuture, ToolSet, parse_tool_args, to_tool_result};
use crate::model::{Owner, Pet, Vet};
use crate::provider::AiDataProvider;
use crate::{ToolDef, json_schema_for};

pub const LIST_OWNERS: &str = "listOwners";
pub const LIST_VETS: &str = "listVets";
pub const ADD_PET_TO_OWNER: &str = "addPetToOwner";
pub const ADD_OWNER_TO_PETCLINIC: &str = "addOwnerToPetclinic";

// ── Requests / responses ───────────────────────────────────────────

#[derive(Deserialize, JsonSchema, Debug, Default)]
pub struct OwnersRequest {}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct OwnersResponse {
    pub owners: Vec<Owner>,
}

#[derive(Deserialize, JsonSchema, Debug, Default)]
pub struct VetRequest {
    /// Optional filter: any subset of vet fields, e.g. a specialty name.
    #[serde(default)]
    pub vet: Option<Vet>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct VetResponse {
    /// Matching vet records as JSON text, most similar first.
    pub vet: Vec<String>,
}

#[derive(Deserialize, JsonSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddPetRequest {
    pub pet: Pet,
    pub owner_id: i32,
}

#[derive(Deserialize, JsonSchema, Debug)]
pub struct AddOwnerRequest {
    pub owner: Owner,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct OwnerResponse {
    pub owner: Owner,
}

// ── Tools ──────────────────────────────────────────────────────────

/// Lists the first page of owners.
pub struct ListOwners {
    provider: Arc<AiDataProvider>,
}

impl ListOwners {
    pub fn new(provider: Arc<AiDataProvider>) -> Self {
        Self { provider }
    }
}

impl Tool for ListOwners {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            LIST_OWNERS,
            "List the owners that the pet clinic has",
            json_schema_for::<OwnersRequest>(),
        )
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let request = parse_tool_args::<OwnersRequest>(LIST_OWNERS, arguments);
        Box::pin(async move {
            request?;
            let owners = self.provider.all_owners()?;
            to_tool_result(&OwnersResponse { owners })
        })
    }
}

/// Similarity search over the vet index.
pub struct ListVets {
    provider: Arc<AiDataProvider>,
}

impl ListVets {
    pub fn new(provider: Arc<AiDataProvider>) -> Self {
        Self { provider }
    }
}

impl Tool for ListVets {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            LIST_VETS,
            "List the veterinarians that the pet clinic has",
            json_schema_for::<VetRequest>(),
        )
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let request = parse_tool_args::<VetRequest>(LIST_VETS, arguments);
        Box::pin(async move {
            let request = request?;
            let vet = self.provider.vets(request.vet.as_ref()).await?;
            to_tool_result(&VetResponse { vet })
        })
    }
}

/// Attaches a new pet to an existing owner.
pub struct AddPetToOwner {
    provider: Arc<AiDataProvider>,
}

impl AddPetToOwner {
    pub fn new(provider: Arc<AiDataProvider>) -> Self {
        Self { provider }
    }
}

impl Tool for AddPetToOwner {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            ADD_PET_TO_OWNER,
            "Add a pet with the specified petTypeId, to an owner identified by the ownerId. \
             The allowed Pet types IDs are only: \
             1 - cat 2 - dog 3 - lizard 4 - snake 5 - bird 6 - hamster",
            json_schema_for::<AddPetRequest>(),
        )
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let request = parse_tool_args::<AddPetRequest>(ADD_PET_TO_OWNER, arguments);
        Box::pin(async move {
            let AddPetRequest { pet, owner_id } = request?;
            let owner = self.provider.add_pet_to_owner(owner_id, pet)?;
            to_tool_result(&OwnerResponse { owner })
        })
    }

    fn is_mutation(&self) -> bool {
        true
    }
}

/// Registers a new owner.
pub struct AddOwnerToPetclinic {
    provider: Arc<AiDataProvider>,
}

impl AddOwnerToPetclinic {
    pub fn new(provider: Arc<AiDataProvider>) -> Self {
        Self { provider }
    }
}

impl Tool for AddOwnerToPetclinic {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            ADD_OWNER_TO_PETCLINIC,
            "Add a new pet owner to the pet clinic. \
             The Owner must include a first name and a last name as two separate words, \
             plus an address and a 10-digit phone number",
            json_schema_for::<AddOwnerRequest>(),
        )
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let request = parse_tool_args::<AddOwnerRequest>(ADD_OWNER_TO_PETCLINIC, arguments);
        Box::pin(async move {
            let owner = self.provider.add_owner(request?.owner)?;
            to_tool_result(&OwnerResponse { owner })
        })
    }

    fn is_mutation(&self) -> bool {
        true
    }
}

/// The clinic tool set, with schema validation enabled.
pub fn clinic_tools(provider: Arc<AiDataProvider>) -> ToolSet {
    ToolSet::new()
        .with_arg_validation(true)
        .with(ListOwners::new(provider.clone()))
        .with(ListVets::new(provider.clone()))
        .with(AddPetToOwner::new(provider.clone()))
        .with(AddOwnerToPetclinic::new(provider))
}
