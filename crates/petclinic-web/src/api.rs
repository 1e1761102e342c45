//! `POST /chat` handler.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use petclinic_genai::chat::{DEFAULT_CONVERSATION_ID, PetclinicChatClient};
use tracing::{debug, error};

/// Request header naming the conversation a message belongs to.
pub const CONVERSATION_HEADER: &str = "x-conversation-id";

/// Body of every failed chat response. Details go to the log only.
pub const CHAT_FAILURE_MESSAGE: &str = "Chat is currently unavailable. Please try again later.";

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<PetclinicChatClient>,
}

/// POST /chat: exchange one message with the assistant.
///
/// The body is the raw message text; a JSON string body (`"hello"`) is
/// accepted too. Returns 200 with the answer as plain text, 400 for an
/// empty message, and 500 with a fixed message on any failure.
pub async fn post_chat(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let message = user_message(&body);
    if message.is_empty() {
        return (StatusCode::BAD_REQUEST, "message must not be empty").into_response();
    }
    let conversation = conversation_id(&headers);
    debug!("POST /chat ({} chars, conversation '{conversation}')", message.len());

    match app.chat.exchange_in(conversation, &message).await {
        Ok(answer) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            answer,
        )
            .into_response(),
        Err(e) => {
            error!("Chat exchange failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, CHAT_FAILURE_MESSAGE).into_response()
        }
    }
}

/// The message text from a request body, unwrapping a JSON string.
fn user_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.starts_with('"')
        && let Ok(text) = serde_json::from_str::<String>(trimmed)
    {
        return text.trim().to_string();
    }
    trimmed.to_string()
}

fn conversation_id(headers: &HeaderMap) -> &str {
    headers
        .get(CONVERSATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_CONVERSATION_ID)
}
