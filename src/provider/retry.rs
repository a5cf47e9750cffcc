// src/provider/retry.rs — Exponential backoff around any ModelProvider
//
// Retries rate limits and errors the provider marks retriable. Anything else
// reaches the labeler or writer untouched and aborts the run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelInfo, ModelProvider};
use crate::infra::config::RetrySettings;
use crate::infra::errors::EvolveError;

const BACKOFF_FACTOR: f64 = 2.0;
const JITTER_FRACTION: f64 = 0.2;
/// Added to a server-provided retry-after hint.
const HINT_MARGIN: Duration = Duration::from_millis(100);
/// Floor for any computed backoff.
const MIN_DELAY_MS: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl From<&RetrySettings> for RetryConfig {
    fn from(s: &RetrySettings) -> Self {
        Self {
            max_retries: s.max_retries,
            initial_delay: Duration::from_millis(s.initial_delay_ms),
            backoff_factor: BACKOFF_FACTOR,
            max_delay: Duration::from_millis(s.max_delay_ms.max(s.initial_delay_ms)),
            jitter_fraction: JITTER_FRACTION,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

/// A provider wrapper that adds retry with exponential backoff.
///
/// Delegates all trait methods to the inner provider, retrying `chat()` on
/// transient errors. Non-retriable errors surface on the first attempt.
pub struct RetryProvider {
    inner: Arc<dyn ModelProvider>,
    config: RetryConfig,
}

impl RetryProvider {
    pub fn new(inner: Arc<dyn ModelProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Wait before retry number `attempt` (0-based). A server hint wins over
    /// the exponential schedule.
    fn delay_for_attempt(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint + HINT_MARGIN;
        }
        let cfg = &self.config;
        let exp_ms = cfg.initial_delay.as_millis() as f64 * cfg.backoff_factor.powi(attempt as i32);
        let ms = exp_ms.min(cfg.max_delay.as_millis() as f64)
            * deterministic_jitter(attempt, cfg.jitter_fraction);
        Duration::from_millis(ms.max(MIN_DELAY_MS) as u64)
    }
}

fn should_retry(error: &EvolveError) -> bool {
    matches!(
        error,
        EvolveError::RateLimited { .. } | EvolveError::Provider { retriable: true, .. }
    )
}

/// The server's retry-after hint, when it sent a non-zero one.
fn rate_limit_delay(error: &EvolveError) -> Option<Duration> {
    match error {
        EvolveError::RateLimited { retry_after_ms, .. } => {
            (*retry_after_ms > 0).then(|| Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

/// Hash-based multiplier in [1 - fraction, 1 + fraction], fixed per attempt.
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let unit = attempt.wrapping_mul(2_654_435_761) as f64 / u32::MAX as f64;
    1.0 + fraction * (2.0 * unit - 1.0)
}

#[async_trait]
impl ModelProvider for RetryProvider {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn models(&self) -> Vec<ModelInfo> {
        self.inner.models()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, EvolveError> {
        let mut attempt = 0;
        loop {
            match self.inner.chat(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if should_retry(&e) && attempt < self.config.max_retries => {
                    let delay = self.delay_for_attempt(attempt, rate_limit_delay(&e));
                    tracing::warn!(
                        provider = self.inner.id(),
                        model = %request.model,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
