// src/labeler/mod.rs — Labeler capability: (rows, instruction, labels) -> predictions

pub mod coerce;
pub mod llm;

use async_trait::async_trait;

use crate::dataset::{Dataset, LabelSet};
use crate::infra::errors::Result;

pub use coerce::coerce;
pub use llm::LlmLabeler;

/// Predicts one label per row.
///
/// `data` never contains the ground-truth column. Implementations return the
/// same rows, in the same order, with `output_column` added.
#[async_trait]
pub trait Labeler: Send + Sync {
    async fn label(
        &self,
        data: &Dataset,
        instruction: &str,
        labels: &LabelSet,
        output_column: &str,
    ) -> Result<Dataset>;
}
