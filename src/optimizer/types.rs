// src/optimizer/types.rs — Candidate records, run configuration, progress events

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::report::BenchmarkTable;
use crate::dataset::{Dataset, LabelSet};
use crate::infra::config::Config;
use crate::infra::errors::{EvolveError, Result};

/// One instruction under evaluation, with its scoring history.
///
/// Treated as a value: scoring produces a new record via `rescored` rather
/// than editing the one held in the previous generation's list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub instruction: String,
    /// Running accuracy over every example this candidate has seen, in [0, 1].
    pub accuracy: f64,
    pub examples_seen: usize,
    /// Rows the most recent scoring pass got wrong.
    pub errors: Vec<MismatchedRow>,
}

impl Candidate {
    /// A fresh candidate with no scoring history.
    pub fn seed(instruction: impl Into<String>) -> Self {
        Self {
            id: short_id(),
            instruction: instruction.into(),
            accuracy: 0.0,
            examples_seen: 0,
            errors: Vec::new(),
        }
    }

    /// The record after one more scoring pass of `sample_size` rows.
    pub fn rescored(&self, matches: usize, sample_size: usize, errors: Vec<MismatchedRow>) -> Self {
        Self {
            id: self.id.clone(),
            instruction: self.instruction.clone(),
            accuracy: running_accuracy(self.examples_seen, self.accuracy, matches, sample_size),
            examples_seen: self.examples_seen + sample_size,
            errors,
        }
    }

    pub fn is_perfect(&self) -> bool {
        self.accuracy >= 1.0
    }

    /// The mismatched rows as the JSON array handed to the instruction writer.
    pub fn errors_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.errors)?)
    }
}

/// Four hex characters from a v4 UUID. Short enough to read in a table.
fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(4);
    id
}

/// Incremental mean: folds `matches` out of `sample_size` new examples into an
/// accuracy previously measured over `seen` examples.
///
/// With `seen == 0` this is plain sample accuracy. A zero denominator leaves
/// the accuracy unchanged.
pub fn running_accuracy(seen: usize, accuracy: f64, matches: usize, sample_size: usize) -> f64 {
    let total = seen + sample_size;
    if total == 0 {
        return accuracy;
    }
    (seen as f64 * accuracy + matches as f64) / total as f64
}

/// A row the labeler got wrong: the truth, the guess, and the inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MismatchedRow {
    pub ground_truth: String,
    #[serde(rename = "predictions")]
    pub prediction: String,
    #[serde(flatten)]
    pub features: BTreeMap<String, String>,
}

impl MismatchedRow {
    /// Keys taken by the truth and the guess; no feature column may use them.
    pub const RESERVED_KEYS: [&'static str; 2] = ["ground_truth", "predictions"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationMode {
    /// Rewrite driven by observed errors.
    Adapt,
    /// Light rephrase when every candidate scored perfectly.
    Regularize,
}

impl std::fmt::Display for MutationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationMode::Adapt => write!(f, "adapt"),
            MutationMode::Regularize => write!(f, "regularize"),
        }
    }
}

/// Parameters for one optimization run. All explicit; nothing global.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub generations: usize,
    /// Candidates kept after each scoring pass.
    pub top_k: usize,
    /// Rows drawn per scoring pass.
    pub sample_size: usize,
    /// Seed instructions; empty means a single empty instruction.
    pub initial_instructions: Vec<String>,
    pub ground_truth_column: String,
    /// Column the labeler writes predictions into.
    pub output_column: String,
    /// Fixed RNG seed for reproducible sampling.
    pub seed: Option<u64>,
    pub timeout: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RunConfig {
    fn from(cfg: &Config) -> Self {
        let opt = &cfg.optimizer;
        Self {
            generations: opt.generations,
            top_k: opt.top_k,
            sample_size: opt.sample_size,
            initial_instructions: opt.initial_instructions.clone(),
            ground_truth_column: opt.ground_truth_column.clone(),
            output_column: cfg.labeler.output_column.clone(),
            seed: opt.seed,
            timeout: (opt.timeout_seconds > 0).then(|| Duration::from_secs(opt.timeout_seconds)),
        }
    }
}

impl RunConfig {
    /// Parameter checks that don't need the dataset.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(EvolveError::InvalidConfig("top_k must be at least 1".into()));
        }
        if self.sample_size == 0 {
            return Err(EvolveError::InvalidConfig(
                "sample_size must be at least 1".into(),
            ));
        }
        if self.ground_truth_column == self.output_column {
            return Err(EvolveError::InvalidConfig(format!(
                "output column '{}' would overwrite the ground truth",
                self.output_column
            )));
        }
        Ok(())
    }

    /// Everything that can be rejected without calling a model. Returns the
    /// label set drawn from the ground-truth column.
    pub fn check_dataset(&self, data: &Dataset) -> Result<LabelSet> {
        self.validate()?;
        if data.is_empty() {
            return Err(EvolveError::EmptyDataset);
        }
        data.require_column(&self.ground_truth_column)?;
        if data.column_index(&self.output_column).is_some() {
            return Err(EvolveError::InvalidConfig(format!(
                "dataset already has a '{}' column; choose another output column",
                self.output_column
            )));
        }
        if let Some(key) = MismatchedRow::RESERVED_KEYS
            .iter()
            .find(|k| **k != self.ground_truth_column && data.column_index(k).is_some())
        {
            return Err(EvolveError::InvalidConfig(format!(
                "input column '{key}' collides with a key of the error rows; rename it"
            )));
        }
        if self.sample_size > data.len() {
            return Err(EvolveError::SampleTooLarge {
                sample_size: self.sample_size,
                rows: data.len(),
            });
        }
        data.labels(&self.ground_truth_column)
    }

    pub fn seed_candidates(&self) -> Vec<Candidate> {
        if self.initial_instructions.is_empty() {
            vec![Candidate::seed("")]
        } else {
            self.initial_instructions
                .iter()
                .map(|i| Candidate::seed(i.as_str()))
                .collect()
        }
    }
}

/// Lifecycle events emitted while a run progresses.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        candidates: usize,
        labels: usize,
        rows: usize,
        generations: usize,
    },
    /// After the scoring pass and top-K prune of a generation.
    GenerationScored {
        generation: usize,
        generations: usize,
        table: BenchmarkTable,
    },
    Mutated {
        generation: usize,
        mode: MutationMode,
        parent: String,
        child: String,
    },
    /// The candidate list carried into the next generation, new candidate included.
    GenerationEnd {
        generation: usize,
        table: BenchmarkTable,
    },
    /// The closing evaluation after the last generation.
    FinalScored {
        table: BenchmarkTable,
    },
    Complete {
        best_id: String,
        best_accuracy: f64,
        examples_seen: usize,
    },
}
