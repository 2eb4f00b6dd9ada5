//! Executable steps
//!
//! A `Step` is a step definition with its external resources already built.
//! Execution reads the variable environment and produces the step's output;
//! writing that output back is the chain's job.

use catena_core::tag::TagPattern;
use catena_core::template::{Variables, resolve};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::error::StepError;
use crate::provider::{ModelProcessor, VectorStore};

/// Separator between passages returned by a document search step
pub const PASSAGE_SEPARATOR: &str = "\t";

pub enum Step {
    Text {
        template: String,
    },
    Prompt {
        template: String,
        processor: Arc<dyn ModelProcessor>,
    },
    TagParse {
        template: String,
        pattern: TagPattern,
    },
    TableBind {
        scheme: Vec<String>,
    },
    DocSearch {
        template: String,
        store: Arc<dyn VectorStore>,
        top_n: usize,
    },
}

/// What a step produced
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    /// Stored under the step's name
    Value(Value),
    /// Stored under each entry's own name
    Table(Variables),
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::Text { .. } => "text",
            Step::Prompt { .. } => "prompt",
            Step::TagParse { .. } => "tag_parser",
            Step::TableBind { .. } => "table",
            Step::DocSearch { .. } => "doc_search",
        }
    }

    pub async fn execute(&self, env: &Variables) -> Result<StepOutput, StepError> {
        match self {
            Step::Text { template } => Ok(text_output(resolve(template, env).text)),

            Step::Prompt {
                template,
                processor,
            } => {
                let prompt = resolve(template, env).text;
                let completion = processor.complete(&prompt).await?;
                Ok(text_output(completion.result))
            }

            Step::TagParse { template, pattern } => {
                let text = resolve(template, env).text;
                Ok(text_output(pattern.extract(&text)))
            }

            Step::TableBind { scheme } => {
                let bound: Variables = scheme
                    .iter()
                    .filter_map(|name| env.get(name).map(|v| (name.clone(), v.clone())))
                    .collect();
                if bound.len() < scheme.len() {
                    debug!(
                        "Table step bound {} of {} columns",
                        bound.len(),
                        scheme.len()
                    );
                }
                Ok(StepOutput::Table(bound))
            }

            Step::DocSearch {
                template,
                store,
                top_n,
            } => {
                let query = resolve(template, env).text;
                let passages = store.similarity_search(&query, *top_n).await?;
                Ok(text_output(passages.join(PASSAGE_SEPARATOR)))
            }
        }
    }
}

fn text_output(text: String) -> StepOutput {
    StepOutput::Value(Value::String(text))
}
