//! Tool abstractions for the chat engine's function calls.
//!
//! Every capability the model has is a [`Tool`] implementor. Tools are
//! collected into a [`ToolSet`] which handles dispatch, argument validation,
//! timeouts and error rendering.
//!
//! # Submodules
//!
//! - [`core`]: [`Tool`] trait, [`ToolSet`], [`ToolError`], argument helpers.
//! - [`clinic`]: the four clinic tools and [`clinic_tools`], which builds
//!   the set the front door uses.

pub mod clinic;
pub mod core;

// Re-export commonly used items at the module level.
pub use clinic::{
    ADD_OWNER_TO_PETCLINIC, ADD_PET_TO_OWNER, AddOwnerToPetclinic, AddPetToOwner, LIST_OWNERS,
    LIST_VETS, ListOwners, ListVets, clinic_tools,
};
pub use core::{Tool, ToolError, ToolFuture, ToolSet, parse_tool_args, validate_tool_arguments};
