// src/labeler/llm.rs — Labeler backed by a chat model, one call per row

use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};

use super::{coerce, Labeler};
use crate::dataset::{Dataset, LabelSet};
use crate::infra::config::LabelerConfig;
use crate::infra::errors::Result;
use crate::provider::{ChatRequest, Message, ModelProvider};
use crate::util::render_template;

const SYSTEM_PROMPT: &str = "You are a precise data labeler. \
Follow the instruction, then answer with exactly one label from the allowed list and nothing else.";

const ROW_TEMPLATE: &str = "\
INSTRUCTION: {{ instruction }}

RECORD: {{ record }}

ALLOWED LABELS: {{ labels }}

LABEL:";

pub struct LlmLabeler {
    provider: Arc<dyn ModelProvider>,
    model: String,
    concurrency: usize,
    max_tokens: u32,
}

impl LlmLabeler {
    pub fn new(provider: Arc<dyn ModelProvider>, model: impl Into<String>) -> Self {
        let defaults = LabelerConfig::default();
        Self {
            provider,
            model: model.into(),
            concurrency: defaults.concurrency,
            max_tokens: defaults.max_tokens,
        }
    }

    pub fn with_config(mut self, config: &LabelerConfig) -> Self {
        self.concurrency = config.concurrency.max(1);
        self.max_tokens = config.max_tokens;
        self
    }

    fn row_prompt(
        &self,
        data: &Dataset,
        row: usize,
        instruction: &str,
        labels: &LabelSet,
    ) -> Result<String> {
        let record = serde_json::to_string(&data.row_map(row))?;
        render_template(
            "label_row",
            ROW_TEMPLATE,
            minijinja::context! {
                instruction => instruction,
                record => record,
                labels => labels.to_string(),
            },
        )
    }

    async fn predict(&self, prompt: String, labels: &LabelSet) -> Result<String> {
        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![Message::user(prompt)],
                max_tokens: Some(self.max_tokens),
                temperature: Some(0.0),
                system: Some(SYSTEM_PROMPT.into()),
            })
            .await?;
        let label = coerce(&response.content, labels);
        tracing::trace!(raw = %response.content, %label, "Row labeled");
        Ok(label)
    }
}

#[async_trait]
impl Labeler for LlmLabeler {
    async fn label(
        &self,
        data: &Dataset,
        instruction: &str,
        labels: &LabelSet,
        output_column: &str,
    ) -> Result<Dataset> {
        let prompts = (0..data.len())
            .map(|i| self.row_prompt(data, i, instruction, labels))
            .collect::<Result<Vec<_>>>()?;

        // `buffered` yields in submission order, so predictions line up with rows
        let predictions: Vec<String> = stream::iter(prompts)
            .map(|p| self.predict(p, labels))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        tracing::debug!(
            rows = data.len(),
            model = %self.model,
            "Labeled sample"
        );
        data.with_column(output_column, predictions)
    }
}
