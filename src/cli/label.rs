// src/cli/label.rs — `label`: apply an instruction to every row

use std::path::Path;

use super::Clients;
use crate::dataset::{Dataset, LabelSet};
use crate::infra::config::Config;
use crate::labeler::Labeler;

/// Pick the label set: explicit list first, else the ground-truth values.
pub fn resolve_labels(data: &Dataset, explicit: &[String], ground_truth: &str) -> anyhow::Result<LabelSet> {
    if !explicit.is_empty() {
        return Ok(LabelSet::from_values(explicit.iter().map(|l| l.trim())));
    }
    if data.column_index(ground_truth).is_none() {
        anyhow::bail!(
            "no --labels given and the dataset has no '{}' column to take them from",
            ground_truth
        );
    }
    Ok(data.labels(ground_truth)?)
}

#[allow(clippy::too_many_arguments)]
pub async fn run_label(
    dataset: &Path,
    instruction: &str,
    labels: &[String],
    ground_truth: Option<&str>,
    output: Option<&Path>,
    config: &Config,
    model: Option<&str>,
    quiet: bool,
) -> anyhow::Result<()> {
    let gt = ground_truth.unwrap_or(&config.optimizer.ground_truth_column);
    let data = Dataset::from_csv_path(dataset)?;
    let labels = resolve_labels(&data, labels, gt)?;
    let inputs = if data.column_index(gt).is_some() {
        data.drop_column(gt)?
    } else {
        data.clone()
    };

    let clients = Clients::connect(config, model).await?;
    if !quiet {
        eprintln!(
            "[label] {} row(s), labels {} | labeler: {}",
            data.len(),
            labels,
            clients.roles.labeler
        );
    }

    let output_column = config.labeler.output_column.as_str();
    let labeled = clients
        .labeler(config)
        .label(&inputs, instruction, &labels, output_column)
        .await?;
    let predictions: Vec<String> = labeled
        .column(output_column)?
        .into_iter()
        .map(String::from)
        .collect();
    let out = data.with_column(output_column, predictions)?;

    match output {
        Some(path) => {
            out.write_csv(std::fs::File::create(path)?)?;
            if !quiet {
                eprintln!("  wrote {}", path.display());
            }
        }
        None => out.write_csv(std::io::stdout().lock())?,
    }
    Ok(())
}
