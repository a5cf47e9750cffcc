// src/optimizer/mutator.rs — Produce one new candidate per generation

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{Candidate, MutationMode};
use crate::dataset::LabelSet;
use crate::infra::config::OptimizerConfig;
use crate::infra::errors::{EvolveError, Result};
use crate::provider::{ChatRequest, Message, ModelProvider};
use crate::util::{render_template, unquote};

/// Rewrites an instruction. One call per generation.
#[async_trait]
pub trait InstructionWriter: Send + Sync {
    /// Revise `instruction` so it stops making the errors in `errors_json`.
    async fn adapt(&self, instruction: &str, errors_json: &str, labels: &LabelSet)
        -> Result<String>;

    /// Lightly rephrase an instruction that already scores perfectly.
    async fn regularize(&self, instruction: &str) -> Result<String>;
}

const ADAPT_SYSTEM: &str = "\
You are an Instruction Tuner for a language model that labels records. You receive:
- CURRENT INSTRUCTION: the instruction the model followed.
- LABELS: the only labels the model may answer with.
- CURRENT ERRORS: a JSON list of records the model got wrong. Each entry has the \
correct label in \"ground_truth\", the model's answer in \"predictions\", and the \
record's input fields.

Study the errors, work out what the instruction failed to convey, and write a revised \
instruction that would have labeled those records correctly without breaking the ones it \
already gets right. Reply with the revised instruction only.";

const ADAPT_USER: &str = "\
CURRENT INSTRUCTION: \"{{ instruction }}\"
LABELS: {{ labels }}
CURRENT ERRORS: {{ errors }}

New refined instruction:";

const REGULARIZE_SYSTEM: &str = "\
You are an Instruction Optimizer for a language model. The instruction below already \
labels every record in a small sample correctly and may be overfitted to it. Rewrite it \
with minimal changes so it reads as plain common sense and generalizes to unseen records. \
Keep its intent and its label vocabulary. Reply with the new instruction only.";

const REGULARIZE_USER: &str = "\
CURRENT INSTRUCTION: \"{{ instruction }}\"

New instruction:";

/// Echoed headers some models put in front of their answer.
const REPLY_PREFIXES: &[&str] = &["New refined instruction:", "New instruction:"];

pub struct LlmInstructionWriter {
    provider: Arc<dyn ModelProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmInstructionWriter {
    pub fn new(provider: Arc<dyn ModelProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: OptimizerConfig::default().writer_temperature,
            max_tokens: 1024,
        }
    }

    pub fn with_config(mut self, config: &OptimizerConfig) -> Self {
        self.temperature = config.writer_temperature;
        self
    }

    async fn rewrite(&self, system: &str, user: String) -> Result<String> {
        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![Message::user(user)],
                max_tokens: Some(self.max_tokens),
                temperature: Some(self.temperature),
                system: Some(system.into()),
            })
            .await?;
        tracing::debug!(
            model = %self.model,
            tokens = response.usage.total(),
            "Instruction rewritten"
        );
        Ok(clean_reply(&response.content))
    }
}

/// Trim, drop an echoed header, then strip one layer of quotes.
fn clean_reply(raw: &str) -> String {
    let mut text = raw.trim();
    for prefix in REPLY_PREFIXES {
        if text
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        {
            text = &text[prefix.len()..];
            break;
        }
    }
    unquote(text).to_string()
}

#[async_trait]
impl InstructionWriter for LlmInstructionWriter {
    async fn adapt(
        &self,
        instruction: &str,
        errors_json: &str,
        labels: &LabelSet,
    ) -> Result<String> {
        let user = render_template(
            "adapt",
            ADAPT_USER,
            minijinja::context! {
                instruction => instruction,
                labels => labels.to_string(),
                errors => errors_json,
            },
        )?;
        self.rewrite(ADAPT_SYSTEM, user).await
    }

    async fn regularize(&self, instruction: &str) -> Result<String> {
        let user = render_template(
            "regularize",
            REGULARIZE_USER,
            minijinja::context! { instruction => instruction },
        )?;
        self.rewrite(REGULARIZE_SYSTEM, user).await
    }
}

/// Which candidate to mutate, and how.
#[derive(Debug, Clone, Copy)]
pub struct Mutation<'a> {
    pub mode: MutationMode,
    pub parent: &'a Candidate,
}

/// Pick the mutation target from a list ranked best-first.
///
/// The first candidate below perfect accuracy is adapted; when every candidate
/// is perfect the top one is regularized.
pub fn select_mutation(ranked: &[Candidate]) -> Option<Mutation<'_>> {
    if let Some(parent) = ranked.iter().find(|c| !c.is_perfect()) {
        return Some(Mutation {
            mode: MutationMode::Adapt,
            parent,
        });
    }
    ranked.first().map(|parent| Mutation {
        mode: MutationMode::Regularize,
        parent,
    })
}

/// The product of one mutation step.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub mode: MutationMode,
    pub parent_id: String,
    pub candidate: Candidate,
}

pub struct Mutator {
    writer: Arc<dyn InstructionWriter>,
}

impl Mutator {
    pub fn new(writer: Arc<dyn InstructionWriter>) -> Self {
        Self { writer }
    }

    /// Exactly one writer call. The new candidate has no scoring history.
    pub async fn mutate(&self, ranked: &[Candidate], labels: &LabelSet) -> Result<MutationOutcome> {
        let Mutation { mode, parent } = select_mutation(ranked).ok_or(EvolveError::NoCandidates)?;

        let instruction = match mode {
            MutationMode::Adapt => {
                tracing::info!(id = %parent.id, accuracy = parent.accuracy, "Adapting instruction");
                self.writer
                    .adapt(&parent.instruction, &parent.errors_json()?, labels)
                    .await?
            }
            MutationMode::Regularize => {
                tracing::info!(id = %parent.id, "All instructions perfect, regularizing the best");
                self.writer.regularize(&parent.instruction).await?
            }
        };

        Ok(MutationOutcome {
            mode,
            parent_id: parent.id.clone(),
            candidate: Candidate::seed(instruction),
        })
    }
}
