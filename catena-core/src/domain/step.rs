//! Step domain types
//!
//! A step definition is the serialized form of one unit of pipeline work.
//! Definitions are resolved into executable steps by the runner at
//! pipeline-construction time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::params::RawParams;

/// Serialized step as submitted by callers and stored with batch jobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Unique name within the pipeline; the step's output is stored under it
    pub name: String,

    /// Whether the step represents a pipeline input (informational)
    #[serde(default)]
    pub is_pipeline_input: bool,

    /// Whether the step's result is surfaced in the pipeline outputs
    #[serde(default = "default_is_output")]
    pub is_pipeline_output: bool,

    #[serde(flatten)]
    pub kind: StepKind,
}

fn default_is_output() -> bool {
    true
}

/// Step payload, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// Static text template
    Text { input: String },

    /// Templated prompt sent to a model provider
    Prompt {
        input: String,
        model_provider: String,
        #[serde(default)]
        parameters: RawParams,
    },

    /// Extracts the first `<tag>...</tag>` section of the resolved template
    TagParser { input: String, tag: String },

    /// Surfaces the named environment entries (per-row columns) as outputs
    Table { scheme: Vec<String> },

    /// Similarity search against a previously built embedding
    DocSearch {
        input: String,
        embedding_id: Uuid,
        #[serde(default)]
        parameters: DocSearchParams,
    },
}

impl StepKind {
    /// Short label used in logs and error messages
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::Text { .. } => "text",
            StepKind::Prompt { .. } => "prompt",
            StepKind::TagParser { .. } => "tag_parser",
            StepKind::Table { .. } => "table",
            StepKind::DocSearch { .. } => "doc_search",
        }
    }

    /// Model provider of a prompt step
    pub fn model_provider(&self) -> Option<&str> {
        match self {
            StepKind::Prompt { model_provider, .. } => Some(model_provider),
            _ => None,
        }
    }

    /// Raw `model_name` parameter of a prompt step, if present
    pub fn model_name(&self) -> Option<&str> {
        match self {
            StepKind::Prompt { parameters, .. } => {
                parameters.get("model_name").and_then(|v| v.as_str())
            }
            _ => None,
        }
    }
}

/// Parameters of a document search step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocSearchParams {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_top_n() -> usize {
    3
}

impl Default for DocSearchParams {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_text_step_defaults() {
        let step: StepDefinition =
            serde_json::from_value(json!({"type": "text", "name": "t", "input": "hi {a}"}))
                .unwrap();

        assert_eq!(step.name, "t");
        assert!(!step.is_pipeline_input);
        assert!(step.is_pipeline_output);
        assert_eq!(
            step.kind,
            StepKind::Text {
                input: "hi {a}".to_string()
            }
        );
    }

    #[test]
    fn test_deserialize_prompt_step() {
        let step: StepDefinition = serde_json::from_value(json!({
            "type": "prompt",
            "name": "answer",
            "is_pipeline_output": false,
            "input": "Q: {q}",
            "model_provider": "openai",
            "parameters": {"model_name": "gpt-4", "temperature": 0.2}
        }))
        .unwrap();

        assert!(!step.is_pipeline_output);
        assert_eq!(step.kind.label(), "prompt");
        assert_eq!(step.kind.model_provider(), Some("openai"));
        assert_eq!(step.kind.model_name(), Some("gpt-4"));
    }

    #[test]
    fn test_doc_search_top_n_defaults_to_three() {
        let step: StepDefinition = serde_json::from_value(json!({
            "type": "doc_search",
            "name": "docs",
            "input": "{q}",
            "embedding_id": Uuid::new_v4(),
        }))
        .unwrap();

        match step.kind {
            StepKind::DocSearch { parameters, .. } => assert_eq!(parameters.top_n, 3),
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_step_type_is_rejected() {
        let result: Result<StepDefinition, _> =
            serde_json::from_value(json!({"type": "youtube", "name": "x", "input": ""}));
        assert!(result.is_err());
    }
}
