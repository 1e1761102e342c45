//! Configuration for the conversation front door.
//!
//! [`ChatConfig`] holds the model settings, round limit and memory window.
//! Use [`ChatConfig::default()`] for the standard setup and the `with_*`
//! builders to override individual fields.

use std::path::Path;

use crate::DEFAULT_MODEL;

/// The bundled system preamble.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../prompts/system.st");

/// Default maximum engine round-trips per exchange.
pub const DEFAULT_MAX_ROUNDS: u32 = 10;

/// Default number of remembered messages sent with each request.
pub const DEFAULT_MEMORY_WINDOW: usize = 10;

/// Settings for [`PetclinicChatClient`](crate::chat::PetclinicChatClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Model identifier (e.g. `"openai/gpt-4o-mini"`).
    pub model: String,
    /// System preamble sent at the head of every request.
    pub system_prompt: String,
    /// Maximum engine round-trips (tool calls included) before giving up.
    pub max_rounds: u32,
    /// Maximum tokens per engine reply. `0` leaves it to the provider.
    pub max_tokens: u32,
    /// Sampling temperature. `0.0` leaves it to the provider.
    pub temperature: f32,
    /// How many remembered messages of a conversation are replayed.
    pub memory_window: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.trim().to_string(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_tokens: 0,
            temperature: 0.0,
            memory_window: DEFAULT_MEMORY_WINDOW,
        }
    }
}

impl ChatConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the maximum engine round-trips per exchange.
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set how many remembered messages are replayed per request.
    pub fn with_memory_window(mut self, memory_window: usize) -> Self {
        self.memory_window = memory_window;
        self
    }
}

/// Load the system preamble from `path`, or the bundled one when `None`.
pub fn load_system_prompt(path: Option<&Path>) -> Result<String, String> {
    match path {
        None => Ok(DEFAULT_SYSTEM_PROMPT.trim().to_string()),
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read system prompt {}: {e}", path.display()))?;
            let text = text.trim();
            if text.is_empty() {
                return Err(format!("system prompt {} is empty", path.display()));
            }
            Ok(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ChatConfig::default();
        assert_eq!(config.max_rounds, 10);
        assert_eq!(config.memory_window, 10);
        assert!(config.system_prompt.contains("pet clinic"));
    }

    #[test]
    fn builders_override_fields() {
        let config = ChatConfig::default()
            .with_model("test-model")
            .with_max_rounds(3)
            .with_memory_window(4);
        assert_eq!(config.model, "test-model");
        assert_eq!(config.max_rounds, 3);
        assert_eq!(config.memory_window, 4);
    }

    #[test]
    fn load_bundled_prompt() {
        assert_eq!(load_system_prompt(None).unwrap(), ChatConfig::default().system_prompt);
    }

    #[test]
    fn load_prompt_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system.st");
        std::fs::write(&path, "  You are a test assistant.\n").unwrap();
        assert_eq!(load_system_prompt(Some(&path)).unwrap(), "You are a test assistant.");
    }

    #[test]
    fn load_missing_or_empty_prompt_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_system_prompt(Some(&dir.path().join("nope.st"))).is_err());

        let empty = dir.path().join("empty.st");
        std::fs::write(&empty, "\n").unwrap();
        assert!(load_system_prompt(Some(&empty)).unwrap_err().contains("empty"));
    }
}
