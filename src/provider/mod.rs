// src/provider/mod.rs — Model provider layer

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod resolver;
pub mod retry;
pub mod roles;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::errors::EvolveError;

/// Core trait that all model providers implement.
///
/// Labeling and instruction rewriting both go through `chat`, so a single
/// stub implementation is enough to drive a whole optimization run in tests.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn models(&self) -> Vec<ModelInfo>;

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, EvolveError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub context_window: u32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    #[default]
    Unknown,
}

/// Reference to a specific model on a specific provider.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Parse "provider/model" format
    pub fn parse(s: &str) -> Option<Self> {
        let (provider, model) = s.split_once('/')?;
        if provider.is_empty() || model.is_empty() {
            return None;
        }
        Some(Self {
            provider: provider.to_string(),
            model: model.to_string(),
        })
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Render a message list in the OpenAI-style `{role, content}` shape, with the
/// optional system prompt first. Shared by the OpenAI and Ollama providers.
pub(crate) fn openai_style_messages(request: &ChatRequest) -> Vec<serde_json::Value> {
    let mut msgs = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        msgs.push(serde_json::json!({
            "role": "system",
            "content": system,
        }));
    }
    for m in &request.messages {
        msgs.push(serde_json::json!({
            "role": m.role.as_str(),
            "content": m.content,
        }));
    }
    msgs
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── ModelRef tests ─────────────────────────────────────────

    #[test]
    fn test_model_ref_parse() {
        let r = ModelRef::parse("openai/gpt-4.1-mini").unwrap();
        assert_eq!(r.provider, "openai");
        assert_eq!(r.model, "gpt-4.1-mini");
    }

    #[test]
    fn test_model_ref_parse_keeps_nested_slashes() {
        let r = ModelRef::parse("ollama/library/llama3.1").unwrap();
        assert_eq!(r.provider, "ollama");
        assert_eq!(r.model, "library/llama3.1");
    }

    #[test]
    fn test_model_ref_parse_rejects_malformed() {
        assert!(ModelRef::parse("no-slash").is_none());
        assert!(ModelRef::parse("").is_none());
        assert!(ModelRef::parse("/model").is_none());
        assert!(ModelRef::parse("provider/").is_none());
    }

    #[test]
    fn test_model_ref_display() {
        let r = ModelRef::new("anthropic", "claude-sonnet-4-20250514");
        assert_eq!(r.to_string(), "anthropic/claude-sonnet-4-20250514");
    }

    // ─── Message tests ──────────────────────────────────────────

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::user("u").role, Role::User);
        assert_eq!(Message::user("u").content, "u");
    }

    #[test]
    fn test_openai_style_messages_puts_system_first() {
        let req = ChatRequest {
            model: "m".into(),
            messages: vec![Message::user("hello")],
            system: Some("be brief".into()),
            ..Default::default()
        };
        let msgs = openai_style_messages(&req);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[0]["content"], "be brief");
        assert_eq!(msgs[1]["role"], "user");
    }

    #[test]
    fn test_token_usage_total() {
        let u = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(u.total(), 150);
        assert_eq!(TokenUsage::default().total(), 0);
    }

    #[test]
    fn test_stop_reason_default() {
        assert!(matches!(StopReason::default(), StopReason::Unknown));
    }
}
