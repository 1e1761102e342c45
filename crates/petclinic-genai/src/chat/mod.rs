//! Conversation front door.
//!
//! [`PetclinicChatClient`] turns one user message into one final answer,
//! running the engine/tool loop in between. [`ConversationMemory`] keeps a
//! bounded history per conversation id.

mod client;
pub mod memory;

pub use client::{ChatError, PetclinicChatClient};
pub use memory::{ConversationMemory, DEFAULT_CONVERSATION_ID};
