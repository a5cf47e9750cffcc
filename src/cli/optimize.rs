// src/cli/optimize.rs — `optimize`: run the generation loop over a dataset

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::{Clients, OptimizeArgs};
use crate::dataset::Dataset;
use crate::infra::config::Config;
use crate::infra::paths;
use crate::optimizer::{InstructionOptimizer, OptimizationResult, RunConfig};

pub async fn run_optimize(
    args: &OptimizeArgs,
    config: &Config,
    model: Option<&str>,
    quiet: bool,
    cancel: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let mut config = config.clone();
    args.apply(&mut config.optimizer);
    let run_config = RunConfig::from(&config);

    let data = Dataset::from_csv_path(&args.dataset)?;
    run_config.check_dataset(&data)?;
    let clients = Clients::connect(&config, model).await?;

    let mut optimizer = InstructionOptimizer::new(
        Arc::new(clients.labeler(&config)),
        Arc::new(clients.writer(&config)),
        run_config,
    )
    .with_cancel(cancel);
    if !quiet {
        optimizer = optimizer.with_progress(super::progress::terminal_progress());
        eprintln!(
            "[optimize] {} | writer: {} | labeler: {}",
            args.dataset.display(),
            clients.roles.writer,
            clients.roles.labeler,
        );
    }

    let result = optimizer.run(&data).await?;

    let path = args.output.clone().unwrap_or_else(|| default_result_path(&result));
    result.write_json(&path)?;

    println!("{}", result.best_instruction);
    if !quiet {
        eprintln!("  result saved to {}", path.display());
    }
    Ok(())
}

fn default_result_path(result: &OptimizationResult) -> PathBuf {
    paths::runs_dir().join(format!(
        "run-{}.json",
        result.finished_at.format("%Y%m%d-%H%M%S")
    ))
}
