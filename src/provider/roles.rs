// src/provider/roles.rs — Role-based model assignment

use super::ModelRef;

/// Assigns models to the two roles in an optimization run.
#[derive(Debug, Clone)]
pub struct ModelRoles {
    /// Rewrites instructions from observed errors.
    pub writer: ModelRef,
    /// Predicts a label for each dataset row.
    pub labeler: ModelRef,
}

impl ModelRoles {
    pub fn from_single(model: ModelRef) -> Self {
        Self {
            writer: model.clone(),
            labeler: model,
        }
    }

    /// Build from explicit config, filling gaps with the default model.
    /// Entries that don't parse as "provider/model" fall back to the default.
    pub fn from_config(default: ModelRef, writer: Option<&str>, labeler: Option<&str>) -> Self {
        Self {
            writer: writer
                .and_then(ModelRef::parse)
                .unwrap_or_else(|| default.clone()),
            labeler: labeler.and_then(ModelRef::parse).unwrap_or(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_single() {
        let model = ModelRef::new("openai", "gpt-4.1-mini");
        let roles = ModelRoles::from_single(model.clone());
        assert_eq!(roles.writer, model);
        assert_eq!(roles.labeler, model);
    }

    #[test]
    fn test_from_config_overrides() {
        let roles = ModelRoles::from_config(
            ModelRef::new("openai", "gpt-4.1-mini"),
            Some("anthropic/claude-sonnet-4-20250514"),
            None,
        );
        assert_eq!(roles.writer.provider, "anthropic");
        assert_eq!(roles.labeler.model, "gpt-4.1-mini");
    }

    #[test]
    fn test_from_config_invalid_falls_back() {
        let roles = ModelRoles::from_config(
            ModelRef::new("openai", "gpt-4.1"),
            Some("not-a-ref"),
            Some("ollama/llama3.1"),
        );
        assert_eq!(roles.writer, ModelRef::new("openai", "gpt-4.1"));
        assert_eq!(roles.labeler, ModelRef::new("ollama", "llama3.1"));
    }
}
