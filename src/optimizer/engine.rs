// src/optimizer/engine.rs — Generation loop: evaluate, select, mutate, append

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::guard::RunGuard;
use super::mutator::{InstructionWriter, Mutator};
use super::report::{BenchmarkTable, OptimizationResult};
use super::scorer::Scorer;
use super::types::{ProgressEvent, RunConfig};
use crate::dataset::Dataset;
use crate::infra::errors::Result;
use crate::labeler::Labeler;

/// Runs a fixed number of generations over a labeled dataset and returns the
/// best instruction found.
///
/// Each generation scores the live candidates on a fresh sample, keeps the
/// top `top_k`, and appends one mutated candidate. A final scoring pass after
/// the last generation ranks the survivors. Any labeler or writer failure
/// aborts the run.
pub struct InstructionOptimizer {
    scorer: Scorer,
    mutator: Mutator,
    config: RunConfig,
    cancel: Option<Arc<AtomicBool>>,
    /// Optional callback for real-time progress events.
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send + Sync>>,
}

impl InstructionOptimizer {
    pub fn new(
        labeler: Arc<dyn Labeler>,
        writer: Arc<dyn InstructionWriter>,
        config: RunConfig,
    ) -> Self {
        Self {
            scorer: Scorer::from_config(labeler, &config),
            mutator: Mutator::new(writer),
            config,
            cancel: None,
            on_progress: None,
        }
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    /// Abort the run once `flag` is set. Checked between LLM-bound steps.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    pub async fn run(&self, data: &Dataset) -> Result<OptimizationResult> {
        let labels = self.config.check_dataset(data)?;
        let guard = RunGuard::new(self.cancel.clone(), self.config.timeout);
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let generations = self.config.generations;
        let mut candidates = self.config.seed_candidates();

        tracing::info!(
            candidates = candidates.len(),
            labels = %labels,
            rows = data.len(),
            generations,
            top_k = self.config.top_k,
            sample_size = self.config.sample_size,
            "Optimization started"
        );
        self.emit(ProgressEvent::Started {
            candidates: candidates.len(),
            labels: labels.len(),
            rows: data.len(),
            generations,
        });

        for generation in 1..=generations {
            guard.check(generation)?;

            candidates = self
                .scorer
                .score(&candidates, data, &labels, &mut rng, &guard, generation)
                .await?;
            let table = BenchmarkTable::from_candidates(&candidates);
            tracing::info!(generation, "Scored {} candidates\n{}", candidates.len(), table);
            self.emit(ProgressEvent::GenerationScored {
                generation,
                generations,
                table,
            });

            let outcome = self.mutator.mutate(&candidates, &labels).await?;
            self.emit(ProgressEvent::Mutated {
                generation,
                mode: outcome.mode,
                parent: outcome.parent_id,
                child: outcome.candidate.id.clone(),
            });
            candidates.push(outcome.candidate);

            let table = BenchmarkTable::from_candidates(&candidates);
            tracing::info!(generation, "Results of generation {}\n{}", generation, table);
            self.emit(ProgressEvent::GenerationEnd { generation, table });
        }

        let closing = generations + 1;
        guard.check(closing)?;
        candidates = self
            .scorer
            .score(&candidates, data, &labels, &mut rng, &guard, closing)
            .await?;
        let table = BenchmarkTable::from_candidates(&candidates);
        tracing::info!("Final evaluation\n{}", table);
        self.emit(ProgressEvent::FinalScored { table });

        let result = OptimizationResult::from_final(&candidates, labels, generations)?;
        if let Some(best) = result.benchmark.best() {
            self.emit(ProgressEvent::Complete {
                best_id: best.id.clone(),
                best_accuracy: best.accuracy,
                examples_seen: best.examples_seen,
            });
        }
        Ok(result)
    }
}
