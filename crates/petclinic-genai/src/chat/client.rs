use std::sync::Arc;

use tracing::{debug, info, warn};

use super::memory::{ConversationMemory, DEFAULT_CONVERSATION_ID};
use crate::config::ChatConfig;
use crate::tools::ToolSet;
use crate::{ChatModel, ChatRequest, Message};

/// Failure of one exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// The chat engine call failed.
    #[error("chat engine failed: {0}")]
    Engine(String),

    #[error("no final answer after {0} rounds")]
    RoundLimit(u32),

    #[error("chat engine returned an empty response")]
    EmptyResponse,
}

/// The conversation front door: one user message in, the final answer out.
///
/// Each exchange sends the system preamble, the conversation's recent
/// history and the new message to the engine together with the tool
/// definitions. Tool calls are dispatched and their results fed back until
/// the engine answers with plain text.
pub struct PetclinicChatClient {
    engine: Arc<dyn ChatModel>,
    tools: Arc<ToolSet>,
    config: ChatConfig,
    memory: ConversationMemory,
}

impl PetclinicChatClient {
    pub fn new(engine: Arc<dyn ChatModel>, tools: Arc<ToolSet>, config: ChatConfig) -> Self {
        let memory = ConversationMemory::new(config.memory_window);
        Self {
            engine,
            tools,
            config,
            memory,
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Exchange in the shared default conversation.
    pub async fn exchange(&self, user_text: &str) -> Result<String, ChatError> {
        self.exchange_in(DEFAULT_CONVERSATION_ID, user_text).await
    }

    /// Exchange in the named conversation. On success the user message and
    /// the answer are remembered; on failure the history is left as it was.
    pub async fn exchange_in(
        &self,
        conversation_id: &str,
        user_text: &str,
    ) -> Result<String, ChatError> {
        let user = Message::user(user_text);
        let history = self.memory.recent(conversation_id);
        info!(
            "Exchange in conversation '{conversation_id}' ({} remembered messages)",
            history.len()
        );

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(&self.config.system_prompt));
        messages.extend(history);
        messages.push(user.clone());

        let mut request = ChatRequest {
            model: Some(self.config.model.clone()),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            tools: (!self.tools.is_empty()).then(|| self.tools.definitions()),
        };

        for round in 0..self.config.max_rounds {
            let completion = self
                .engine
                .chat(&request)
                .await
                .map_err(ChatError::Engine)?;

            if completion.tool_calls.is_empty() {
                let answer = completion
                    .content
                    .filter(|text| !text.trim().is_empty())
                    .ok_or(ChatError::EmptyResponse)?;
                debug!(
                    "Final answer after {} round(s) ({} chars)",
                    round + 1,
                    answer.len()
                );
                self.memory
                    .append(conversation_id, [user, Message::assistant_text(&answer)]);
                return Ok(answer);
            }

            debug!(
                "Round {}: {} tool call(s)",
                round + 1,
                completion.tool_calls.len()
            );
            request
                .messages
                .push(Message::assistant_tool_calls(completion.tool_calls.clone()));
            for call in &completion.tool_calls {
                let result = self
                    .tools
                    .execute(&call.function.name, &call.function.arguments)
                    .await;
                request.messages.push(Message::tool_result(&call.id, result));
            }
        }

        warn!(
            "Conversation '{conversation_id}' hit the round limit ({})",
            self.config.max_rounds
        );
        Err(ChatError::RoundLimit(self.config.max_rounds))
    }
}

impl std::fmt::Debug for PetclinicChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PetclinicChatClient")
            .field("tools", &self.tools)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::tools::{Tool, ToolError, ToolFuture};
    use crate::{ChatCompletion, ChatFuture, MessageRole, ToolCall, ToolDef};

    /// Replays canned replies and records every request it receives.
    struct ScriptedEngine {
        replies: Mutex<VecDeque<Result<ChatCompletion, String>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedEngine {
        fn new(replies: Vec<Result<ChatCompletion, String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl ChatModel for ScriptedEngine {
        fn chat<'a>(&'a self, request: &'a ChatRequest) -> ChatFuture<'a> {
            self.requests.lock().unwrap().push(request.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ChatCompletion::text("done")));
            Box::pin(async move { reply })
        }
    }

    struct Clock;

    impl Tool for Clock {
        fn definition(&self) -> ToolDef {
            ToolDef::new("clock", "What time is it", serde_json::json!({"type": "object"}))
        }

        fn execute(&self, _arguments: &str) -> ToolFuture<'_> {
            Box::pin(async { Ok::<_, ToolError>(serde_json::json!({"time": "noon"})) })
        }
    }

    fn client(engine: Arc<ScriptedEngine>, config: ChatConfig) -> PetclinicChatClient {
        PetclinicChatClient::new(engine, Arc::new(ToolSet::new().with(Clock)), config)
    }

    #[tokio::test]
    async fn tool_results_are_fed_back_before_the_answer() {
        let engine = ScriptedEngine::new(vec![
            Ok(ChatCompletion::with_tool_calls(vec![ToolCall::function("c1", "clock", "{}")])),
            Ok(ChatCompletion::text("It is noon.")),
        ]);
        let chat = client(engine.clone(), ChatConfig::default());

        assert_eq!(chat.exchange("what time is it?").await.unwrap(), "It is noon.");

        let requests = engine.requests();
        assert_eq!(requests.len(), 2);
        let last = requests[1].messages.last().unwrap();
        assert_eq!(last.role, MessageRole::Tool);
        assert_eq!(last.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(last.content.as_deref(), Some(r#"{"time":"noon"}"#));
        assert_eq!(requests[0].tools.as_ref().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn request_starts_with_system_prompt_then_history() {
        let engine = ScriptedEngine::new(vec![
            Ok(ChatCompletion::text("first answer")),
            Ok(ChatCompletion::text("second answer")),
        ]);
        let config = ChatConfig::default().with_system_prompt("be brief");
        let chat = client(engine.clone(), config);

        chat.exchange("one").await.unwrap();
        chat.exchange("two").await.unwrap();

        let second = &engine.requests()[1].messages;
        let texts: Vec<_> = second.iter().filter_map(|m| m.content.as_deref()).collect();
        assert_eq!(texts, vec!["be brief", "one", "first answer", "two"]);
        assert_eq!(second[0].role, MessageRole::System);
    }

    #[tokio::test]
    async fn engine_failure_leaves_memory_untouched() {
        let engine = ScriptedEngine::new(vec![Err("chat API HTTP 500".into())]);
        let chat = client(engine, ChatConfig::default());

        let err = chat.exchange("hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Engine(ref m) if m.contains("500")));
        assert!(chat.memory().recent(DEFAULT_CONVERSATION_ID).is_empty());
    }

    #[tokio::test]
    async fn blank_answer_is_empty_response() {
        let engine = ScriptedEngine::new(vec![Ok(ChatCompletion::text("  "))]);
        let chat = client(engine, ChatConfig::default());
        assert_eq!(chat.exchange("hello").await.unwrap_err(), ChatError::EmptyResponse);
    }

    #[tokio::test]
    async fn endless_tool_calls_hit_round_limit() {
        let calls = || -> Result<ChatCompletion, String> {
            Ok(ChatCompletion::with_tool_calls(vec![ToolCall::function("c", "clock", "")]))
        };
        let engine = ScriptedEngine::new(vec![calls(), calls(), calls()]);
        let chat = client(engine.clone(), ChatConfig::default().with_max_rounds(2));

        assert_eq!(chat.exchange("loop").await.unwrap_err(), ChatError::RoundLimit(2));
        assert_eq!(engine.requests().len(), 2);
    }

    #[tokio::test]
    async fn memory_window_bounds_replayed_history() {
        let engine = ScriptedEngine::new(vec![]);
        let chat = client(engine.clone(), ChatConfig::default().with_memory_window(2));

        chat.exchange_in("c", "one").await.unwrap();
        chat.exchange_in("c", "two").await.unwrap();
        chat.exchange_in("c", "three").await.unwrap();

        // system + 2 remembered + new user message
        assert_eq!(engine.requests()[2].messages.len(), 4);
        assert_eq!(chat.memory().recent("c").len(), 2);
    }
}
