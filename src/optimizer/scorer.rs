// src/optimizer/scorer.rs — Fitness evaluation and top-N survival

use std::sync::Arc;

use rand::Rng;

use super::guard::RunGuard;
use super::types::{Candidate, MismatchedRow, RunConfig};
use crate::dataset::{Dataset, LabelSet};
use crate::infra::errors::{EvolveError, Result};
use crate::labeler::Labeler;

/// Scores candidates on a shared random sample and keeps the best `top_n`.
pub struct Scorer {
    labeler: Arc<dyn Labeler>,
    ground_truth_column: String,
    output_column: String,
    sample_size: usize,
    top_n: usize,
}

impl Scorer {
    pub fn new(
        labeler: Arc<dyn Labeler>,
        ground_truth_column: impl Into<String>,
        output_column: impl Into<String>,
        sample_size: usize,
        top_n: usize,
    ) -> Self {
        Self {
            labeler,
            ground_truth_column: ground_truth_column.into(),
            output_column: output_column.into(),
            sample_size,
            top_n,
        }
    }

    pub fn from_config(labeler: Arc<dyn Labeler>, config: &RunConfig) -> Self {
        Self::new(
            labeler,
            config.ground_truth_column.as_str(),
            config.output_column.as_str(),
            config.sample_size,
            config.top_k,
        )
    }

    /// Draw one sample for this round and score every candidate on it.
    pub async fn score<R: Rng + Send + ?Sized>(
        &self,
        candidates: &[Candidate],
        data: &Dataset,
        labels: &LabelSet,
        rng: &mut R,
        guard: &RunGuard,
        generation: usize,
    ) -> Result<Vec<Candidate>> {
        let indices = data.sample_indices(self.sample_size, rng)?;
        let sample = data.select_rows(&indices);
        self.score_sample(candidates, &sample, labels, guard, generation)
            .await
    }

    /// Score every candidate on a fixed sample, then rank and truncate.
    ///
    /// Returns new records; `candidates` is left as it was.
    pub async fn score_sample(
        &self,
        candidates: &[Candidate],
        sample: &Dataset,
        labels: &LabelSet,
        guard: &RunGuard,
        generation: usize,
    ) -> Result<Vec<Candidate>> {
        let truth = sample.column(&self.ground_truth_column)?;
        let inputs = sample.drop_column(&self.ground_truth_column)?;

        let mut scored = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            guard.check(generation)?;

            let labeled = self
                .labeler
                .label(&inputs, &candidate.instruction, labels, &self.output_column)
                .await?;
            let predictions = self.predictions(&labeled, inputs.len())?;

            let mut matches = 0;
            let mut errors = Vec::new();
            for (i, (expected, predicted)) in truth.iter().zip(predictions).enumerate() {
                if *expected == predicted {
                    matches += 1;
                } else {
                    errors.push(MismatchedRow {
                        ground_truth: expected.to_string(),
                        prediction: predicted.to_string(),
                        features: inputs.row_map(i),
                    });
                }
            }

            let next = candidate.rescored(matches, sample.len(), errors);
            tracing::debug!(
                generation,
                id = %next.id,
                matches,
                sample = sample.len(),
                accuracy = next.accuracy,
                "Candidate scored"
            );
            scored.push(next);
        }

        Ok(rank(scored, self.top_n))
    }

    fn predictions<'a>(&self, labeled: &'a Dataset, expected_rows: usize) -> Result<Vec<&'a str>> {
        if labeled.len() != expected_rows {
            return Err(EvolveError::LabelerOutput(format!(
                "returned {} rows for a sample of {}",
                labeled.len(),
                expected_rows
            )));
        }
        labeled.column(&self.output_column).map_err(|_| {
            EvolveError::LabelerOutput(format!("missing column '{}'", self.output_column))
        })
    }
}

/// Stable descending sort by accuracy, then keep the first `top_n`.
pub fn rank(mut candidates: Vec<Candidate>, top_n: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.accuracy.total_cmp(&a.accuracy));
    candidates.truncate(top_n);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Predicts the row's "answer" column when the instruction says "cheat",
    /// otherwise always "A".
    struct StubLabeler {
        calls: AtomicUsize,
        seen_columns: Mutex<Vec<Vec<String>>>,
    }

    impl StubLabeler {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen_columns: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl Labeler for StubLabeler {
        async fn label(
            &self,
            data: &Dataset,
            instruction: &str,
            _labels: &LabelSet,
            output_column: &str,
        ) -> Result<Dataset> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_columns.lock().unwrap().push(data.columns().to_vec());
            let preds = if instruction.contains("cheat") {
                data.column("answer")?.into_iter().map(String::from).collect()
            } else {
                vec!["A".to_string(); data.len()]
            };
            data.with_column(output_column, preds)
        }
    }

    /// Returns one row too few.
    struct ShortLabeler;

    #[async_trait]
    impl Labeler for ShortLabeler {
        async fn label(
            &self,
            data: &Dataset,
            _instruction: &str,
            _labels: &LabelSet,
            output_column: &str,
        ) -> Result<Dataset> {
            let idx: Vec<usize> = (1..data.len()).collect();
            let short = data.select_rows(&idx);
            let n = short.len();
            short.with_column(output_column, vec!["A".into(); n])
        }
    }

    /// Answer column mirrors ground truth, so a "cheat" instruction is perfect.
    fn data() -> Dataset {
        let truth = ["A", "B", "A", "A", "B", "A", "B", "A", "A", "B"];
        Dataset::new(
            vec!["text".into(), "answer".into(), "ground_truth".into()],
            truth
                .iter()
                .enumerate()
                .map(|(i, t)| vec![format!("row {i}"), t.to_string(), t.to_string()])
                .collect(),
        )
        .unwrap()
    }

    fn cand(instruction: &str, accuracy: f64, seen: usize) -> Candidate {
        Candidate {
            accuracy,
            examples_seen: seen,
            ..Candidate::seed(instruction)
        }
    }

    fn scorer(labeler: Arc<dyn Labeler>, sample_size: usize, top_n: usize) -> Scorer {
        Scorer::new(labeler, "ground_truth", "predictions", sample_size, top_n)
    }

    #[tokio::test]
    async fn test_first_scoring_is_sample_accuracy() {
        let s = scorer(Arc::new(StubLabeler::new()), 10, 5);
        let labels = data().labels("ground_truth").unwrap();
        let out = s
            .score_sample(&[cand("guess", 0.0, 0)], &data(), &labels, &RunGuard::default(), 1)
            .await
            .unwrap();
        // six of the ten rows are "A"
        assert_eq!(out[0].accuracy, 0.6);
        assert_eq!(out[0].examples_seen, 10);
        assert_eq!(out[0].errors.len(), 4);
    }

    #[tokio::test]
    async fn test_accuracy_folds_into_history() {
        let s = scorer(Arc::new(StubLabeler::new()), 10, 5);
        let labels = data().labels("ground_truth").unwrap();
        let out = s
            .score_sample(&[cand("cheat", 0.5, 10)], &data(), &labels, &RunGuard::default(), 2)
            .await
            .unwrap();
        assert_eq!(out[0].accuracy, 0.75);
        assert_eq!(out[0].examples_seen, 20);
        assert!(out[0].errors.is_empty());
    }

    #[tokio::test]
    async fn test_errors_carry_truth_prediction_and_features() {
        let s = scorer(Arc::new(StubLabeler::new()), 10, 5);
        let labels = data().labels("ground_truth").unwrap();
        let out = s
            .score_sample(&[cand("guess", 0.0, 0)], &data(), &labels, &RunGuard::default(), 1)
            .await
            .unwrap();
        let first = &out[0].errors[0];
        assert_eq!(first.ground_truth, "B");
        assert_eq!(first.prediction, "A");
        assert_eq!(first.features["text"], "row 1");
        assert_eq!(first.features["answer"], "B");
        assert!(!first.features.contains_key("ground_truth"));
        assert!(!first.features.contains_key("predictions"));
    }

    #[tokio::test]
    async fn test_labeler_never_sees_ground_truth() {
        let labeler = Arc::new(StubLabeler::new());
        let s = scorer(labeler.clone(), 4, 5);
        let labels = data().labels("ground_truth").unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        s.score(
            &[cand("a", 0.0, 0), cand("b", 0.0, 0)],
            &data(),
            &labels,
            &mut rng,
            &RunGuard::default(),
            1,
        )
        .await
        .unwrap();
        let seen = labeler.seen_columns.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|cols| !cols.contains(&"ground_truth".to_string())));
    }

    #[tokio::test]
    async fn test_ranks_and_truncates() {
        let s = scorer(Arc::new(StubLabeler::new()), 10, 2);
        let labels = data().labels("ground_truth").unwrap();
        let candidates = vec![cand("guess one", 0.0, 0), cand("cheat", 0.0, 0), cand("guess two", 0.0, 0)];
        let out = s
            .score_sample(&candidates, &data(), &labels, &RunGuard::default(), 1)
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].instruction, "cheat");
        // tie at 0.6: input order wins
        assert_eq!(out[1].instruction, "guess one");
    }

    #[tokio::test]
    async fn test_input_list_untouched() {
        let s = scorer(Arc::new(StubLabeler::new()), 10, 5);
        let labels = data().labels("ground_truth").unwrap();
        let before = vec![cand("cheat", 0.0, 0)];
        let snapshot = before.clone();
        let _ = s
            .score_sample(&before, &data(), &labels, &RunGuard::default(), 1)
            .await
            .unwrap();
        assert_eq!(before, snapshot);
    }

    #[tokio::test]
    async fn test_seeded_scoring_is_repeatable() {
        let s = scorer(Arc::new(StubLabeler::new()), 5, 5);
        let labels = data().labels("ground_truth").unwrap();
        let candidates = vec![cand("guess", 0.0, 0)];

        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let first = s
            .score(&candidates, &data(), &labels, &mut a, &RunGuard::default(), 1)
            .await
            .unwrap();
        let second = s
            .score(&candidates, &data(), &labels, &mut b, &RunGuard::default(), 1)
            .await
            .unwrap();
        assert_eq!(first[0].accuracy, second[0].accuracy);
        assert_eq!(first[0].errors, second[0].errors);
    }

    #[tokio::test]
    async fn test_sample_too_large() {
        let labeler = Arc::new(StubLabeler::new());
        let s = scorer(labeler.clone(), 11, 5);
        let labels = data().labels("ground_truth").unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let err = s
            .score(&[cand("", 0.0, 0)], &data(), &labels, &mut rng, &RunGuard::default(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, EvolveError::SampleTooLarge { .. }));
        assert_eq!(labeler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_labeler_output_is_fatal() {
        let s = scorer(Arc::new(ShortLabeler), 10, 5);
        let labels = data().labels("ground_truth").unwrap();
        let err = s
            .score_sample(&[cand("", 0.0, 0)], &data(), &labels, &RunGuard::default(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, EvolveError::LabelerOutput(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_scoring() {
        let labeler = Arc::new(StubLabeler::new());
        let s = scorer(labeler.clone(), 10, 5);
        let labels = data().labels("ground_truth").unwrap();
        let guard = RunGuard::new(Some(Arc::new(AtomicBool::new(true))), None);
        let err = s
            .score_sample(&[cand("", 0.0, 0)], &data(), &labels, &guard, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, EvolveError::Cancelled { generation: 4 }));
        assert_eq!(labeler.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rank_stable() {
        let ranked = rank(
            vec![cand("a", 0.2, 1), cand("b", 0.9, 1), cand("c", 0.2, 1), cand("d", 1.0, 1)],
            3,
        );
        let order: Vec<&str> = ranked.iter().map(|c| c.instruction.as_str()).collect();
        assert_eq!(order, vec!["d", "b", "a"]);
    }
}
