// src/provider/resolver.rs — Provider discovery from the environment and model resolution

use std::sync::Arc;

use super::anthropic::AnthropicProvider;
use super::ollama::OllamaProvider;
use super::openai::OpenAIProvider;
use super::retry::{RetryConfig, RetryProvider};
use super::{ModelProvider, ModelRef};
use crate::infra::errors::EvolveError;

/// Discover all providers reachable from environment variables.
///
/// Every provider is wrapped in a `RetryProvider`, so transient failures are
/// absorbed here and anything that still escapes is fatal for the run.
pub async fn discover_providers(retry: &RetryConfig) -> Vec<Arc<dyn ModelProvider>> {
    let mut providers: Vec<Arc<dyn ModelProvider>> = Vec::new();

    if let Some(key) = env_nonempty("ANTHROPIC_API_KEY") {
        providers.push(Arc::new(RetryProvider::new(
            Arc::new(AnthropicProvider::new(key)),
            retry.clone(),
        )));
    }

    if let Some(key) = env_nonempty("OPENAI_API_KEY") {
        let inner = match env_nonempty("OPENAI_BASE_URL") {
            Some(base_url) => OpenAIProvider::with_base_url("openai", key, base_url),
            None => OpenAIProvider::new(key),
        };
        providers.push(Arc::new(RetryProvider::new(Arc::new(inner), retry.clone())));
    }

    if let Some(host) = env_nonempty("OLLAMA_HOST") {
        let mut ollama = OllamaProvider::new(Some(normalize_ollama_host(&host)));
        match ollama.probe().await {
            Ok(models) => {
                tracing::debug!(count = models.len(), "Ollama models discovered");
                providers.push(Arc::new(RetryProvider::new(Arc::new(ollama), retry.clone())));
            }
            Err(e) => tracing::warn!("OLLAMA_HOST is set but unreachable: {}", e),
        }
    }

    tracing::debug!(
        providers = ?providers.iter().map(|p| p.id().to_string()).collect::<Vec<_>>(),
        "Provider discovery finished"
    );
    providers
}

fn env_nonempty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// `OLLAMA_HOST` is often given without a scheme ("127.0.0.1:11434").
fn normalize_ollama_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

/// Pick the default model from available providers.
pub fn pick_default_model(providers: &[Arc<dyn ModelProvider>]) -> Option<ModelRef> {
    let priority = [
        ("openai", "gpt-4.1-mini"),
        ("anthropic", "claude-sonnet-4-20250514"),
        ("ollama", ""),
    ];

    for (provider_id, model_id) in &priority {
        if let Some(p) = find_provider(providers, provider_id) {
            let model = if model_id.is_empty() {
                let names: Vec<String> = p.models().into_iter().map(|m| m.id).collect();
                OllamaProvider::pick_best_model(&names)
            } else {
                model_id.to_string()
            };
            return Some(ModelRef::new(*provider_id, model));
        }
    }
    None
}

/// Find a specific provider by ID.
pub fn find_provider<'a>(
    providers: &'a [Arc<dyn ModelProvider>],
    provider_id: &str,
) -> Option<&'a Arc<dyn ModelProvider>> {
    providers.iter().find(|p| p.id() == provider_id)
}

/// Resolve a "provider/model" string (or the default) to a provider handle.
pub fn resolve(
    providers: &[Arc<dyn ModelProvider>],
    requested: Option<&str>,
) -> Result<(ModelRef, Arc<dyn ModelProvider>), EvolveError> {
    let model_ref = match requested {
        Some(s) => ModelRef::parse(s).ok_or_else(|| {
            EvolveError::InvalidConfig(format!("model '{}' must be in provider/model form", s))
        })?,
        None => pick_default_model(providers).ok_or(EvolveError::NoProvider)?,
    };

    let provider = find_provider(providers, &model_ref.provider)
        .cloned()
        .ok_or(EvolveError::NoProvider)?;

    if let Some(hint) = suggest_model(provider.as_ref(), &model_ref.model) {
        tracing::warn!(
            "Model '{}' is not in the {} catalog; did you mean '{}'?",
            model_ref.model,
            provider.name(),
            hint
        );
    }

    Ok((model_ref, provider))
}

/// Closest catalog entry for an unknown model id, if any is reasonably close.
/// Returns `None` when the id is known or the catalog is empty.
pub fn suggest_model(provider: &dyn ModelProvider, model_id: &str) -> Option<String> {
    let models = provider.models();
    if models.is_empty() || models.iter().any(|m| m.id == model_id) {
        return None;
    }

    models
        .iter()
        .map(|m| (m.id.as_str(), strsim::jaro_winkler(&m.id, model_id)))
        .filter(|(_, score)| *score > 0.7)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(id, _)| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::super::{ChatRequest, ChatResponse, ModelInfo};
    use super::*;
    use async_trait::async_trait;

    /// Minimal mock provider for testing resolution logic.
    struct MockProvider {
        id: String,
        models: Vec<ModelInfo>,
    }

    impl MockProvider {
        fn new(id: &str, models: Vec<&str>) -> Self {
            Self {
                id: id.into(),
                models: models
                    .into_iter()
                    .map(|m| ModelInfo {
                        id: m.into(),
                        name: m.into(),
                        context_window: 128_000,
                        max_output_tokens: 4096,
                    })
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl ModelProvider for MockProvider {
        fn id(&self) -> &str {
            &self.id
        }
        fn name(&self) -> &str {
            "Mock"
        }
        fn models(&self) -> Vec<ModelInfo> {
            self.models.clone()
        }
        async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse, EvolveError> {
            Err(EvolveError::NoProvider)
        }
    }

    fn providers(list: Vec<MockProvider>) -> Vec<Arc<dyn ModelProvider>> {
        list.into_iter()
            .map(|p| Arc::new(p) as Arc<dyn ModelProvider>)
            .collect()
    }

    #[test]
    fn test_pick_default_prefers_openai() {
        let ps = providers(vec![
            MockProvider::new("anthropic", vec!["claude-sonnet-4-20250514"]),
            MockProvider::new("openai", vec!["gpt-4.1-mini"]),
        ]);
        let m = pick_default_model(&ps).unwrap();
        assert_eq!(m, ModelRef::new("openai", "gpt-4.1-mini"));
    }

    #[test]
    fn test_pick_default_ollama_uses_catalog() {
        let ps = providers(vec![MockProvider::new("ollama", vec!["mistral:7b"])]);
        let m = pick_default_model(&ps).unwrap();
        assert_eq!(m, ModelRef::new("ollama", "mistral:7b"));
    }

    #[test]
    fn test_pick_default_none() {
        assert!(pick_default_model(&[]).is_none());
    }

    #[test]
    fn test_resolve_explicit_model() {
        let ps = providers(vec![MockProvider::new("anthropic", vec!["claude-x"])]);
        let (r, p) = resolve(&ps, Some("anthropic/claude-x")).unwrap();
        assert_eq!(r.model, "claude-x");
        assert_eq!(p.id(), "anthropic");
    }

    #[test]
    fn test_resolve_rejects_malformed_model() {
        let ps = providers(vec![MockProvider::new("openai", vec!["gpt-4.1"])]);
        let err = resolve(&ps, Some("gpt-4.1")).err().unwrap();
        assert!(matches!(err, EvolveError::InvalidConfig(_)));
    }

    #[test]
    fn test_resolve_unknown_provider() {
        let ps = providers(vec![MockProvider::new("openai", vec!["gpt-4.1"])]);
        let err = resolve(&ps, Some("anthropic/claude-x")).err().unwrap();
        assert!(matches!(err, EvolveError::NoProvider));
    }

    #[test]
    fn test_suggest_model() {
        let p = MockProvider::new("openai", vec!["gpt-4.1", "gpt-4.1-mini"]);
        assert_eq!(suggest_model(&p, "gpt-4.1-mnii"), Some("gpt-4.1-mini".into()));
        assert!(suggest_model(&p, "gpt-4.1").is_none());
        assert!(suggest_model(&p, "zzzzzzzz").is_none());
    }

    #[test]
    fn test_normalize_ollama_host() {
        assert_eq!(normalize_ollama_host("127.0.0.1:11434"), "http://127.0.0.1:11434");
        assert_eq!(
            normalize_ollama_host("https://ollama.internal/"),
            "https://ollama.internal"
        );
    }
}
