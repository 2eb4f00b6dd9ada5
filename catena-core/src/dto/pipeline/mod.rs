//! Pipeline DTOs

use serde::{Deserialize, Serialize};

use crate::domain::credentials::Credentials;
use crate::domain::params::RawParams;
use crate::domain::step::StepDefinition;
use crate::template::Variables;

/// Request to run a pipeline once, synchronously
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPipeline {
    pub steps: Vec<StepDefinition>,
    #[serde(default)]
    pub inputs: Variables,
    #[serde(default)]
    pub credentials: Credentials,
}

/// Named outputs of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutputs {
    pub outputs: Variables,
}

/// Request for a single model completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPrompt {
    pub input: String,
    pub model_provider: String,
    #[serde(default)]
    pub parameters: RawParams,
    #[serde(default)]
    pub inputs: Variables,
    #[serde(default)]
    pub credentials: Credentials,
}

/// Request to resolve a text template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertText {
    pub input: String,
    #[serde(default)]
    pub inputs: Variables,
}

/// Request to extract a tag section from a resolved template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseTag {
    pub input: String,
    pub tag: String,
    #[serde(default)]
    pub inputs: Variables,
}

/// Request to search a built embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDocuments {
    pub query: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default)]
    pub credentials: Credentials,
}

fn default_top_n() -> usize {
    3
}

/// Passages returned by a document search, best match first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub passages: Vec<String>,
}

/// Single text result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextResult {
    pub result: String,
}
