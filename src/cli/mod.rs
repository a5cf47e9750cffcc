// src/cli/mod.rs — CLI definition (clap derive)

pub mod evaluate;
pub mod label;
pub mod optimize;
pub mod progress;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::infra::config::{Config, OptimizerConfig};
use crate::infra::errors::EvolveError;
use crate::labeler::LlmLabeler;
use crate::optimizer::LlmInstructionWriter;
use crate::provider::resolver;
use crate::provider::retry::RetryConfig;
use crate::provider::roles::ModelRoles;
use crate::provider::{ModelProvider, ModelRef};

#[derive(Parser)]
#[command(
    name = "instruct-evolve",
    about = "Evolve LLM labeling instructions against ground truth",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Model for every role (provider/model format)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress output (only emit final result)
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for the instruction that best reproduces the ground truth
    Optimize(OptimizeArgs),
    /// Score one instruction against every row
    Evaluate {
        /// CSV or TSV file with a ground-truth column
        dataset: PathBuf,
        /// Instruction to score
        #[arg(short, long)]
        instruction: String,
        /// Ground-truth column name
        #[arg(long)]
        ground_truth: Option<String>,
        /// Mismatched rows to print
        #[arg(long, default_value = "5")]
        show_errors: usize,
    },
    /// Apply an instruction to every row and write the predictions as CSV
    Label {
        /// CSV or TSV file to label
        dataset: PathBuf,
        /// Instruction to apply
        #[arg(short, long)]
        instruction: String,
        /// Allowed labels (comma separated); defaults to the ground-truth values
        #[arg(long, value_delimiter = ',')]
        labels: Vec<String>,
        /// Ground-truth column name, excluded from the model's input
        #[arg(long)]
        ground_truth: Option<String>,
        /// Output CSV path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct OptimizeArgs {
    /// CSV or TSV file with a ground-truth column
    pub dataset: PathBuf,

    /// Ground-truth column name
    #[arg(long)]
    pub ground_truth: Option<String>,

    /// Generations to run
    #[arg(short, long)]
    pub generations: Option<usize>,

    /// Candidates kept after each scoring pass
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Rows sampled per scoring pass
    #[arg(short, long)]
    pub sample_size: Option<usize>,

    /// Seed instruction (repeatable)
    #[arg(short, long = "instruction")]
    pub instructions: Vec<String>,

    /// RNG seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Abort the run after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Where to write the result JSON (defaults to the runs directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl OptimizeArgs {
    /// Flags win over file values.
    pub fn apply(&self, opt: &mut OptimizerConfig) {
        if let Some(ref gt) = self.ground_truth {
            opt.ground_truth_column = gt.clone();
        }
        if let Some(n) = self.generations {
            opt.generations = n;
        }
        if let Some(k) = self.top_k {
            opt.top_k = k;
        }
        if let Some(s) = self.sample_size {
            opt.sample_size = s;
        }
        if !self.instructions.is_empty() {
            opt.initial_instructions = self.instructions.clone();
        }
        if self.seed.is_some() {
            opt.seed = self.seed;
        }
        if let Some(t) = self.timeout {
            opt.timeout_seconds = t;
        }
    }
}

/// Providers resolved for the two roles of a run.
pub struct Clients {
    pub roles: ModelRoles,
    labeler_provider: Arc<dyn ModelProvider>,
    writer_provider: Arc<dyn ModelProvider>,
}

impl Clients {
    /// `--model` pins both roles; otherwise `[models]` from the config applies.
    pub async fn connect(config: &Config, model: Option<&str>) -> anyhow::Result<Self> {
        let providers = resolver::discover_providers(&RetryConfig::from(&config.retry)).await;
        let requested = model.or(config.models.default.as_deref());
        let (default_ref, _) = resolver::resolve(&providers, requested)?;

        let roles = if model.is_some() {
            ModelRoles::from_single(default_ref)
        } else {
            ModelRoles::from_config(
                default_ref,
                config.models.writer.as_deref(),
                config.models.labeler.as_deref(),
            )
        };

        let lookup = |r: &ModelRef| {
            resolver::find_provider(&providers, &r.provider)
                .cloned()
                .ok_or(EvolveError::NoProvider)
        };
        let labeler_provider = lookup(&roles.labeler)?;
        let writer_provider = lookup(&roles.writer)?;
        tracing::info!(writer = %roles.writer, labeler = %roles.labeler, "Models resolved");

        Ok(Self {
            roles,
            labeler_provider,
            writer_provider,
        })
    }

    pub fn labeler(&self, config: &Config) -> LlmLabeler {
        LlmLabeler::new(self.labeler_provider.clone(), self.roles.labeler.model.clone())
            .with_config(&config.labeler)
    }

    pub fn writer(&self, config: &Config) -> LlmInstructionWriter {
        LlmInstructionWriter::new(self.writer_provider.clone(), self.roles.writer.model.clone())
            .with_config(&config.optimizer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_optimize() {
        let cli = Cli::try_parse_from([
            "instruct-evolve",
            "optimize",
            "data.csv",
            "-g",
            "3",
            "-k",
            "2",
            "--sample-size",
            "4",
            "-i",
            "Label it.",
            "-i",
            "Be careful.",
            "--seed",
            "9",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Optimize(args) => {
                assert_eq!(args.dataset, PathBuf::from("data.csv"));
                assert_eq!(args.generations, Some(3));
                assert_eq!(args.top_k, Some(2));
                assert_eq!(args.sample_size, Some(4));
                assert_eq!(args.instructions, vec!["Label it.", "Be careful."]);
                assert_eq!(args.seed, Some(9));
            }
            _ => panic!("expected optimize"),
        }
    }

    #[test]
    fn test_parse_label_list() {
        let cli = Cli::try_parse_from([
            "instruct-evolve",
            "label",
            "rows.tsv",
            "-i",
            "Tag it.",
            "--labels",
            "Yes,No",
            "--model",
            "openai/gpt-4.1-mini",
        ])
        .unwrap();
        assert_eq!(cli.model.as_deref(), Some("openai/gpt-4.1-mini"));
        match cli.command {
            Commands::Label { labels, output, .. } => {
                assert_eq!(labels, vec!["Yes", "No"]);
                assert!(output.is_none());
            }
            _ => panic!("expected label"),
        }
    }

    #[test]
    fn test_apply_overrides_only_given_flags() {
        let mut opt = OptimizerConfig::default();
        let args = OptimizeArgs {
            generations: Some(2),
            instructions: vec!["x".into()],
            timeout: Some(60),
            ..Default::default()
        };
        args.apply(&mut opt);
        assert_eq!(opt.generations, 2);
        assert_eq!(opt.top_k, 5);
        assert_eq!(opt.sample_size, 5);
        assert_eq!(opt.initial_instructions, vec!["x"]);
        assert_eq!(opt.timeout_seconds, 60);
        assert_eq!(opt.ground_truth_column, "ground_truth");
    }
}
