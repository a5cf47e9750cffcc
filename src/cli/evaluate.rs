// src/cli/evaluate.rs — `evaluate`: score one instruction on every row

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::Clients;
use crate::dataset::Dataset;
use crate::infra::config::Config;
use crate::optimizer::guard::RunGuard;
use crate::optimizer::{Candidate, RunConfig, Scorer};
use crate::util::truncate_str;

#[allow(clippy::too_many_arguments)]
pub async fn run_evaluate(
    dataset: &Path,
    instruction: &str,
    ground_truth: Option<&str>,
    show_errors: usize,
    config: &Config,
    model: Option<&str>,
    quiet: bool,
    cancel: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let data = Dataset::from_csv_path(dataset)?;
    let mut run_config = RunConfig::from(config);
    if let Some(gt) = ground_truth {
        run_config.ground_truth_column = gt.to_string();
    }
    run_config.sample_size = data.len().max(1);
    run_config.top_k = 1;
    let labels = run_config.check_dataset(&data)?;
    let clients = Clients::connect(config, model).await?;

    if !quiet {
        eprintln!(
            "[evaluate] {} row(s), labels {} | labeler: {}",
            data.len(),
            labels,
            clients.roles.labeler
        );
    }

    let scorer = Scorer::from_config(Arc::new(clients.labeler(config)), &run_config);
    let guard = RunGuard::new(Some(cancel), None);
    let scored = scorer
        .score_sample(&[Candidate::seed(instruction)], &data, &labels, &guard, 1)
        .await?;
    let Some(candidate) = scored.first() else {
        anyhow::bail!("no score produced");
    };

    let correct = candidate.examples_seen - candidate.errors.len();
    println!(
        "accuracy {:.3} ({}/{})",
        candidate.accuracy, correct, candidate.examples_seen
    );
    for row in candidate.errors.iter().take(show_errors) {
        let features = serde_json::to_string(&row.features)?;
        println!(
            "  expected {:?}, got {:?}: {}",
            row.ground_truth,
            row.prediction,
            truncate_str(&features, 120)
        );
    }
    if candidate.errors.len() > show_errors {
        println!("  ... {} more", candidate.errors.len() - show_errors);
    }
    Ok(())
}
