// src/main.rs — instruct-evolve entry point

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use instruct_evolve::cli::{evaluate, label, optimize, Cli, Commands};
use instruct_evolve::infra::config::Config;
use instruct_evolve::infra::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging (respects RUST_LOG)
    logger::init_logging(logger::level_for(cli.verbose, cli.quiet));

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("[cancel] stopping after the current step (Ctrl-C again to force)");
                cancel.store(true, Ordering::Relaxed);
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            }
        });
    }

    let model = cli.model.as_deref();
    match &cli.command {
        Commands::Optimize(args) => {
            optimize::run_optimize(args, &config, model, cli.quiet, cancel).await
        }
        Commands::Evaluate {
            dataset,
            instruction,
            ground_truth,
            show_errors,
        } => {
            evaluate::run_evaluate(
                dataset,
                instruction,
                ground_truth.as_deref(),
                *show_errors,
                &config,
                model,
                cli.quiet,
                cancel,
            )
            .await
        }
        Commands::Label {
            dataset,
            instruction,
            labels,
            ground_truth,
            output,
        } => {
            label::run_label(
                dataset,
                instruction,
                labels,
                ground_truth.as_deref(),
                output.as_deref(),
                &config,
                model,
                cli.quiet,
            )
            .await
        }
    }
}
