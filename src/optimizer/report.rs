// src/optimizer/report.rs — Benchmark table and final run result

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::Candidate;
use crate::dataset::LabelSet;
use crate::infra::errors::{EvolveError, Result};
use crate::util::truncate_str;

const INSTRUCTION_WIDTH: usize = 72;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRow {
    pub id: String,
    pub instruction: String,
    pub accuracy: f64,
    pub examples_seen: usize,
}

/// Candidates ranked by accuracy, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BenchmarkTable {
    pub rows: Vec<BenchmarkRow>,
}

impl BenchmarkTable {
    /// Stable: candidates with equal accuracy keep their input order.
    pub fn from_candidates(candidates: &[Candidate]) -> Self {
        let mut rows: Vec<BenchmarkRow> = candidates
            .iter()
            .map(|c| BenchmarkRow {
                id: c.id.clone(),
                instruction: c.instruction.clone(),
                accuracy: c.accuracy,
                examples_seen: c.examples_seen,
            })
            .collect();
        rows.sort_by(|a, b| b.accuracy.total_cmp(&a.accuracy));
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn best(&self) -> Option<&BenchmarkRow> {
        self.rows.first()
    }
}

impl fmt::Display for BenchmarkTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<6} {:>8} {:>6}  instruction", "id", "accuracy", "seen")?;
        for row in &self.rows {
            let flat = row.instruction.replace(['\n', '\r'], " ");
            let shown = truncate_str(&flat, INSTRUCTION_WIDTH);
            let ellipsis = if shown.len() < flat.len() { "..." } else { "" };
            let shown = if flat.is_empty() { "(empty)" } else { shown };
            writeln!(
                f,
                "{:<6} {:>8.3} {:>6}  {}{}",
                row.id, row.accuracy, row.examples_seen, shown, ellipsis
            )?;
        }
        Ok(())
    }
}

/// What a finished run hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub best_instruction: String,
    pub best_accuracy: f64,
    pub benchmark: BenchmarkTable,
    pub labels: LabelSet,
    pub generations: usize,
    pub finished_at: DateTime<Utc>,
}

impl OptimizationResult {
    pub fn from_final(candidates: &[Candidate], labels: LabelSet, generations: usize) -> Result<Self> {
        let benchmark = BenchmarkTable::from_candidates(candidates);
        let best = benchmark.best().ok_or(EvolveError::NoCandidates)?;
        Ok(Self {
            best_instruction: best.instruction.clone(),
            best_accuracy: best.accuracy,
            labels,
            generations,
            finished_at: Utc::now(),
            benchmark,
        })
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Result written");
        Ok(())
    }
}
