// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub optimizer: OptimizerConfig,

    #[serde(default)]
    pub labeler: LabelerConfig,

    #[serde(default)]
    pub retry: RetrySettings,
}

/// Model assignment per role, in "provider/model" form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Used for any role that has no explicit entry.
    pub default: Option<String>,
    /// Rewrites instructions (adapt / regularize).
    pub writer: Option<String>,
    /// Predicts labels for dataset rows.
    pub labeler: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub generations: usize,
    pub top_k: usize,
    pub sample_size: usize,
    pub ground_truth_column: String,
    pub initial_instructions: Vec<String>,
    pub seed: Option<u64>,
    /// 0 disables the deadline.
    pub timeout_seconds: u64,
    pub writer_temperature: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            generations: 10,
            top_k: 5,
            sample_size: 5,
            ground_truth_column: "ground_truth".into(),
            initial_instructions: Vec::new(),
            seed: None,
            timeout_seconds: 0,
            writer_temperature: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelerConfig {
    /// Max in-flight labeling calls per scoring pass.
    pub concurrency: usize,
    pub output_column: String,
    pub max_tokens: u32,
}

impl Default for LabelerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            output_column: "predictions".into(),
            max_tokens: 64,
        }
    }
}

/// Backoff for transient provider failures (rate limits, 5xx).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// 0 turns retries off; the first failure aborts the run.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }
}
