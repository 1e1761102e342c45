//! HTTP front end for the pet clinic assistant.
//!
//! `petclinic-web` exposes the conversation front door as a single
//! endpoint: `POST /chat` takes the user's message as the raw request body
//! and answers with the assistant's final text. An optional static
//! directory can be served alongside it for a browser chat widget.
//!
//! # Quick start
//!
//! ```ignore
//! use petclinic_web::{WebConfig, spawn_web};
//!
//! let chat = Arc::new(PetclinicChatClient::new(engine, tools, ChatConfig::default()));
//! let addr = spawn_web(chat, WebConfig::default()).await?;
//! println!("Chat endpoint: http://{addr}/chat");
//! ```
//!
//! The `X-Conversation-Id` header selects a conversation; without it every
//! request shares the default one.

mod api;
mod server;

pub use api::{CHAT_FAILURE_MESSAGE, CONVERSATION_HEADER};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use petclinic_genai::chat::PetclinicChatClient;

/// Configuration for the web server.
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:8080`.
    pub bind_addr: SocketAddr,
    /// Directory of static files (e.g. a chat widget) served for any path
    /// not handled by the API. `None` serves the API only.
    pub static_dir: Option<PathBuf>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            static_dir: None,
        }
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// The server runs until the Tokio runtime shuts down.
pub async fn spawn_web(
    chat: Arc<PetclinicChatClient>,
    config: WebConfig,
) -> Result<SocketAddr, String> {
    let router = server::build_router(chat, config.static_dir);
    server::start_server(router, config.bind_addr).await
}
