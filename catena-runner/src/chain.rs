//! Chain executor
//!
//! A chain is an ordered list of named steps sharing one variable
//! environment. Each step's output is written to the environment under the
//! step's name so later steps can reference it as `{name}`; output steps are
//! also collected into the run's outputs.
//!
//! Chains are built per invocation by `ChainLoader`, which resolves every
//! external resource up front so that construction failures surface before any
//! step runs.

use catena_core::domain::credentials::Credentials;
use catena_core::domain::params::{ModelParams, ModelProvider, RawParams};
use catena_core::domain::step::{StepDefinition, StepKind};
use catena_core::tag::TagPattern;
use catena_core::template::{Variables, resolve};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ConstructionError, StepError};
use crate::provider::{
    EmbeddingCatalog, ModelProcessor, ProviderFactory, VectorStore, open_embedding,
};
use crate::step::{Step, StepOutput};

/// Named outputs of one chain run
pub type Outputs = Variables;

struct NamedStep {
    name: String,
    is_output: bool,
    step: Step,
}

/// An immutable, ready-to-run pipeline
pub struct Chain {
    steps: Vec<NamedStep>,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.name.as_str())
    }

    /// Runs every step in order against an environment seeded from `inputs`
    ///
    /// The first failing step aborts the run.
    pub async fn run(&self, inputs: Variables) -> Result<Outputs, StepError> {
        let mut env = inputs;
        let mut outputs = Outputs::new();

        for (index, named) in self.steps.iter().enumerate() {
            debug!(
                "Running step {} '{}' ({})",
                index,
                named.name,
                named.step.label()
            );

            match named.step.execute(&env).await? {
                StepOutput::Value(value) => {
                    if named.is_output {
                        outputs.insert(named.name.clone(), value.clone());
                    }
                    env.insert(named.name.clone(), value);
                }
                StepOutput::Table(bound) => {
                    for (column, value) in bound {
                        if named.is_output {
                            outputs.insert(column.clone(), value.clone());
                        }
                        env.insert(column, value);
                    }
                }
            }
        }

        Ok(outputs)
    }
}

/// Builds chains and standalone provider handles
#[derive(Clone)]
pub struct ChainLoader {
    providers: Arc<dyn ProviderFactory>,
    catalog: Arc<dyn EmbeddingCatalog>,
}

impl ChainLoader {
    pub fn new(providers: Arc<dyn ProviderFactory>, catalog: Arc<dyn EmbeddingCatalog>) -> Self {
        Self { providers, catalog }
    }

    pub fn providers(&self) -> &Arc<dyn ProviderFactory> {
        &self.providers
    }

    /// Resolves step definitions into a chain run on behalf of `viewer`
    pub async fn load(
        &self,
        definitions: &[StepDefinition],
        viewer: &str,
        credentials: &Credentials,
    ) -> Result<Chain, ConstructionError> {
        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(definitions.len());

        for definition in definitions {
            if !seen.insert(definition.name.as_str()) {
                return Err(ConstructionError::DuplicateStep(definition.name.clone()));
            }

            steps.push(NamedStep {
                name: definition.name.clone(),
                is_output: definition.is_pipeline_output,
                step: self
                    .build_step(&definition.kind, viewer, credentials)
                    .await?,
            });
        }

        info!("Loaded chain with {} steps", steps.len());
        Ok(Chain { steps })
    }

    async fn build_step(
        &self,
        kind: &StepKind,
        viewer: &str,
        credentials: &Credentials,
    ) -> Result<Step, ConstructionError> {
        Ok(match kind {
            StepKind::Text { input } => Step::Text {
                template: input.clone(),
            },
            StepKind::Prompt {
                input,
                model_provider,
                parameters,
            } => Step::Prompt {
                template: input.clone(),
                processor: self.model_processor(model_provider, parameters, credentials)?,
            },
            StepKind::TagParser { input, tag } => Step::TagParse {
                template: input.clone(),
                pattern: tag_pattern(tag)?,
            },
            StepKind::Table { scheme } => Step::TableBind {
                scheme: scheme.clone(),
            },
            StepKind::DocSearch {
                input,
                embedding_id,
                parameters,
            } => Step::DocSearch {
                template: input.clone(),
                store: self
                    .open_embedding(viewer, *embedding_id, credentials)
                    .await?,
                top_n: parameters.top_n,
            },
        })
    }

    /// Model processor for a provider name and raw parameters
    pub fn model_processor(
        &self,
        provider: &str,
        parameters: &RawParams,
        credentials: &Credentials,
    ) -> Result<Arc<dyn ModelProcessor>, ConstructionError> {
        let provider: ModelProvider = provider.parse()?;
        let params = ModelParams::parse(provider, parameters)?;
        self.providers.model_processor(params, credentials)
    }

    /// Read-only vector store of a built embedding
    pub async fn open_embedding(
        &self,
        viewer: &str,
        embedding_id: Uuid,
        credentials: &Credentials,
    ) -> Result<Arc<dyn VectorStore>, ConstructionError> {
        open_embedding(
            self.providers.as_ref(),
            self.catalog.as_ref(),
            viewer,
            embedding_id,
            credentials,
        )
        .await
    }
}

fn tag_pattern(tag: &str) -> Result<TagPattern, ConstructionError> {
    TagPattern::new(tag).map_err(|source| ConstructionError::InvalidTag {
        tag: tag.to_string(),
        source,
    })
}

/// Resolves a text template on its own
pub fn convert_text(template: &str, vars: &Variables) -> String {
    resolve(template, vars).text
}

/// Resolves a template and extracts its first `<tag>` section
pub fn parse_tag(tag: &str, template: &str, vars: &Variables) -> Result<String, ConstructionError> {
    let text = resolve(template, vars).text;
    Ok(tag_pattern(tag)?.extract(&text))
}
