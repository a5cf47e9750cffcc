// src/provider/ollama.rs — Ollama local model provider

use async_trait::async_trait;

use super::{
    openai_style_messages, ChatRequest, ChatResponse, ModelInfo, ModelProvider, StopReason,
    TokenUsage,
};
use crate::infra::errors::EvolveError;

pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
    available_models: Vec<String>,
}

impl OllamaProvider {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| "http://localhost:11434".into()),
            client: reqwest::Client::new(),
            available_models: Vec::new(),
        }
    }

    /// Ask the local server which models are pulled.
    pub async fn probe(&mut self) -> Result<Vec<String>, EvolveError> {
        let resp = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(std::time::Duration::from_secs(3))
            .send()
            .await
            .map_err(|e| EvolveError::Provider {
                provider: "ollama".into(),
                message: format!("Cannot reach Ollama: {}", e),
                retriable: false,
            })?;

        let body: serde_json::Value = resp.json().await.map_err(|e| EvolveError::Provider {
            provider: "ollama".into(),
            message: format!("Invalid Ollama response: {}", e),
            retriable: false,
        })?;

        let models: Vec<String> = body["models"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["name"].as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        self.available_models = models.clone();
        Ok(models)
    }

    pub fn pick_best_model(models: &[String]) -> String {
        let priority = ["llama3.3", "qwen2.5", "llama3.1", "mistral", "gemma2"];
        for preferred in &priority {
            if let Some(m) = models.iter().find(|m| m.contains(preferred)) {
                return m.clone();
            }
        }
        models.first().cloned().unwrap_or_else(|| "llama3.3".into())
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn id(&self) -> &str {
        "ollama"
    }

    fn name(&self) -> &str {
        "Ollama"
    }

    fn models(&self) -> Vec<ModelInfo> {
        self.available_models
            .iter()
            .map(|m| ModelInfo {
                id: m.clone(),
                name: m.clone(),
                context_window: 128_000,
                max_output_tokens: 32_768,
            })
            .collect()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, EvolveError> {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": openai_style_messages(&request),
            "stream": false,
        });

        let mut options = serde_json::Map::new();
        if let Some(temp) = request.temperature {
            options.insert("temperature".into(), serde_json::json!(temp));
        }
        if let Some(max_tokens) = request.max_tokens {
            options.insert("num_predict".into(), serde_json::json!(max_tokens));
        }
        if !options.is_empty() {
            body["options"] = serde_json::Value::Object(options);
        }

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| EvolveError::Provider {
                provider: "ollama".into(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(EvolveError::Provider {
                provider: "ollama".into(),
                message: format!("HTTP {}: {}", status, error_body),
                retriable: status.is_server_error(),
            });
        }

        let resp: serde_json::Value = response.json().await.map_err(|e| EvolveError::Provider {
            provider: "ollama".into(),
            message: format!("Failed to parse response: {}", e),
            retriable: false,
        })?;

        let content = resp["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        let usage = TokenUsage {
            input_tokens: resp["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
            output_tokens: resp["eval_count"].as_u64().unwrap_or(0) as u32,
        };

        Ok(ChatResponse {
            content,
            usage,
            stop_reason: StopReason::EndTurn,
        })
    }
}
