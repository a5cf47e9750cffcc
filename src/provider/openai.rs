// src/provider/openai.rs — OpenAI Chat Completions provider (and compatible endpoints)

use async_trait::async_trait;

use super::{
    openai_style_messages, ChatRequest, ChatResponse, ModelInfo, ModelProvider, StopReason,
    TokenUsage,
};
use crate::infra::errors::EvolveError;

pub struct OpenAIProvider {
    id: String,
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url("openai", api_key, "https://api.openai.com/v1".into())
    }

    /// Any endpoint speaking the Chat Completions protocol (vLLM, LM Studio, ...).
    pub fn with_base_url(id: impl Into<String>, api_key: String, base_url: String) -> Self {
        Self {
            id: id.into(),
            api_key,
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn build_request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": openai_style_messages(request),
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        body
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "OpenAI"
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gpt-4.1".into(),
                name: "GPT-4.1".into(),
                context_window: 1_047_576,
                max_output_tokens: 32_768,
            },
            ModelInfo {
                id: "gpt-4.1-mini".into(),
                name: "GPT-4.1 Mini".into(),
                context_window: 1_047_576,
                max_output_tokens: 32_768,
            },
            ModelInfo {
                id: "gpt-4o".into(),
                name: "GPT-4o".into(),
                context_window: 128_000,
                max_output_tokens: 16_384,
            },
        ]
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, EvolveError> {
        let body = self.build_request_body(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| EvolveError::Provider {
                provider: self.id.clone(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(EvolveError::RateLimited {
                provider: self.id.clone(),
                retry_after_ms: 5000,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(EvolveError::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {}: {}", status, error_body),
                retriable: status.is_server_error(),
            });
        }

        let resp: serde_json::Value = response.json().await.map_err(|e| EvolveError::Provider {
            provider: self.id.clone(),
            message: format!("Failed to parse response: {}", e),
            retriable: false,
        })?;

        Ok(parse_completion(&resp))
    }
}

fn parse_completion(resp: &serde_json::Value) -> ChatResponse {
    let choice = &resp["choices"][0];
    let content = choice["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();

    let usage = TokenUsage {
        input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    };

    let stop_reason = match choice["finish_reason"].as_str() {
        Some("stop") => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        _ => StopReason::Unknown,
    };

    ChatResponse {
        content,
        usage,
        stop_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Message;

    #[test]
    fn test_request_body_includes_sampling_params() {
        let p = OpenAIProvider::new("sk-test".into());
        let body = p.build_request_body(&ChatRequest {
            model: "gpt-4.1-mini".into(),
            messages: vec![Message::user("label this")],
            max_tokens: Some(16),
            temperature: Some(0.0),
            system: None,
        });
        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["max_tokens"], 16);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let p = OpenAIProvider::with_base_url("local", "".into(), "http://localhost:8000/v1/".into());
        assert_eq!(p.base_url, "http://localhost:8000/v1");
        assert_eq!(p.id(), "local");
    }

    #[test]
    fn test_parse_completion() {
        let resp = serde_json::json!({
            "choices": [{
                "message": { "content": "Positive" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 42, "completion_tokens": 1 }
        });
        let parsed = parse_completion(&resp);
        assert_eq!(parsed.content, "Positive");
        assert_eq!(parsed.usage.total(), 43);
        assert!(matches!(parsed.stop_reason, StopReason::EndTurn));
    }

    #[test]
    fn test_parse_completion_missing_fields() {
        let parsed = parse_completion(&serde_json::json!({}));
        assert_eq!(parsed.content, "");
        assert_eq!(parsed.usage.total(), 0);
        assert!(matches!(parsed.stop_reason, StopReason::Unknown));
    }
}
