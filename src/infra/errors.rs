// src/infra/errors.rs — Error types for instruct-evolve

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvolveError {
    // Provider errors (retriable)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    // User errors
    #[error("No provider configured. Set OPENAI_API_KEY, ANTHROPIC_API_KEY or OLLAMA_HOST.")]
    NoProvider,

    #[error("Dataset has no rows")]
    EmptyDataset,

    #[error("Column '{column}' not found in dataset (columns: {available})")]
    MissingColumn { column: String, available: String },

    #[error("Sample size {sample_size} exceeds dataset size of {rows} rows")]
    SampleTooLarge { sample_size: usize, rows: usize },

    #[error("Invalid run configuration: {0}")]
    InvalidConfig(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    // Run errors (not retriable)
    #[error("Labeler returned malformed output: {0}")]
    LabelerOutput(String),

    #[error("No candidates left to mutate")]
    NoCandidates,

    #[error("Run cancelled before generation {generation}")]
    Cancelled { generation: usize },

    #[error("Run exceeded its deadline of {timeout_seconds}s")]
    DeadlineExceeded { timeout_seconds: u64 },

    // Infra
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EvolveError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            EvolveError::Provider {
                retriable: true,
                ..
            } | EvolveError::RateLimited { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EvolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        let rl = EvolveError::RateLimited {
            provider: "openai".into(),
            retry_after_ms: 1000,
        };
        assert!(rl.is_retriable());

        let transient = EvolveError::Provider {
            provider: "openai".into(),
            message: "HTTP 503".into(),
            retriable: true,
        };
        assert!(transient.is_retriable());

        assert!(!EvolveError::EmptyDataset.is_retriable());
        assert!(!EvolveError::Cancelled { generation: 2 }.is_retriable());
    }

    #[test]
    fn test_sample_too_large_message_names_both_sizes() {
        let e = EvolveError::SampleTooLarge {
            sample_size: 20,
            rows: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("20"));
        assert!(msg.contains("10 rows"));
    }
}
