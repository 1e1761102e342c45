//! Convenience re-exports for common `petclinic-genai` types.
//!
//! Meant to be glob-imported when wiring the assistant:
//!
//! ```ignore
//! use petclinic_genai::prelude::*;
//! ```
//!
//! This pulls in the records, the store and index, the facade, the tool set,
//! the front door and the bootstrap. Wire types for the chat API
//! ([`ToolCall`], [`ChatCompletion`]) are included for writing engines.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{
    ChatCompletion, ChatFuture, ChatModel, ChatRequest, Message, OpenRouterClient, ToolCall,
    ToolDef, json_schema_for,
};

// ── Records and storage ─────────────────────────────────────────────
pub use crate::error::ClinicError;
pub use crate::model::{Owner, Pet, PetType, Specialty, Vet};
pub use crate::store::{ClinicStore, InMemoryClinicStore, PageRequest};
pub use crate::vector::{
    Document, Embedder, HashingEmbedder, OpenAiEmbedder, SearchRequest, SimpleVectorStore,
};

// ── Assistant ───────────────────────────────────────────────────────
pub use crate::bootstrap::{BootstrapOutcome, VectorStoreBootstrap};
pub use crate::chat::{ChatError, PetclinicChatClient};
pub use crate::config::{ChatConfig, load_system_prompt};
pub use crate::provider::AiDataProvider;
pub use crate::tools::{Tool, ToolError, ToolFuture, ToolSet, clinic_tools};

// ── Retry ───────────────────────────────────────────────────────────
pub use crate::api::RetryConfig;
