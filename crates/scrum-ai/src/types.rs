//! Core types for chat backend interactions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Supported wire protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Api {
    /// Ollama native `/api/chat`
    OllamaChat,
    /// OpenAI-compatible `/chat/completions`
    OpenAICompletions,
}

/// Known chat backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ollama,
    OpenAI,
    Custom,
}

impl Provider {
    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Ollama => "Ollama",
            Provider::OpenAI => "OpenAI",
            Provider::Custom => "Custom",
        }
    }

    /// Get the environment variable name for this provider's API key
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Ollama | Provider::Custom => None,
        }
    }

    /// Parse a provider name, falling back to `Custom`
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ollama" => Provider::Ollama,
            "openai" => Provider::OpenAI,
            _ => Provider::Custom,
        }
    }
}

/// Model definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier (e.g., "mistral")
    pub id: String,
    /// API type to use
    pub api: Api,
    /// Provider
    pub provider: Provider,
    /// Base URL for API calls
    pub base_url: String,
    /// Maximum output tokens, if the backend should be capped
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Additional headers for API calls
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Model {
    /// Default Ollama endpoint
    pub const OLLAMA_BASE_URL: &'static str = "http://localhost:11434/api";

    /// Default model served by Ollama
    pub const OLLAMA_DEFAULT_MODEL: &'static str = "mistral";

    /// A model served by a local Ollama instance
    pub fn ollama(id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            api: Api::OllamaChat,
            provider: Provider::Ollama,
            base_url: base_url.into(),
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
            headers: HashMap::new(),
        }
    }

    /// A model behind an OpenAI-compatible endpoint
    pub fn openai_compatible(id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            api: Api::OpenAICompletions,
            provider: Provider::OpenAI,
            base_url: base_url.into(),
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
            headers: HashMap::new(),
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input: u32,
    pub output: u32,
}

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Get the role as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One role-tagged message exchanged with the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Get the text content
    pub fn text(&self) -> &str {
        &self.content
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Context for a chat request
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// System prompt, sent ahead of the turns
    pub system_prompt: Option<String>,
    /// Conversation messages
    pub messages: Vec<Message>,
}

impl Context {
    /// Create a new context with a system prompt
    pub fn with_system(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(system_prompt.into()),
            messages: vec![],
        }
    }

    /// Add a message to the context
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages in wire order, with the system prompt first
    pub fn wire_messages(&self) -> Vec<Message> {
        self.system_prompt
            .iter()
            .map(|p| Message::system(p.clone()))
            .chain(self.messages.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_as_role_and_content() {
        let json = serde_json::to_value(Message::user("hello")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn test_wire_messages_puts_system_prompt_first() {
        let mut context = Context::with_system("be a scrum master");
        context.push(Message::assistant("Who'd like to kick us off?"));
        context.push(Message::user("I will"));

        let wire = context.wire_messages();
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0].role, Role::System);
        assert_eq!(wire[2].content, "I will");
    }

    #[test]
    fn test_wire_messages_without_system_prompt() {
        let mut context = Context::default();
        context.push(Message::user("hi"));
        assert_eq!(context.wire_messages(), vec![Message::user("hi")]);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(Provider::parse("Ollama"), Provider::Ollama);
        assert_eq!(Provider::parse("openai"), Provider::OpenAI);
        assert_eq!(Provider::parse("lmstudio"), Provider::Custom);
        assert_eq!(Provider::OpenAI.api_key_env_var(), Some("OPENAI_API_KEY"));
        assert_eq!(Provider::Ollama.api_key_env_var(), None);
    }

    #[test]
    fn test_model_defaults_timeout_when_missing() {
        let model: Model = serde_json::from_str(
            r#"{"id":"mistral","api":"ollama-chat","provider":"ollama","base_url":"http://localhost:11434/api"}"#,
        )
        .unwrap();
        assert_eq!(model.timeout_secs, 60);
        assert_eq!(model.api, Api::OllamaChat);
    }
}
