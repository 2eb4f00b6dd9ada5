//! Provider parameter allow-lists
//!
//! Each supported provider has an explicit parameter struct. Raw parameter maps
//! coming from callers are filtered against the struct's allowed keys (unknown
//! keys are dropped with a warning) and then deserialized, filling defaults for
//! anything missing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Untyped parameters as submitted by callers
pub type RawParams = serde_json::Map<String, serde_json::Value>;

/// Errors raised while interpreting provider configuration
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("{0} is not supported")]
    UnsupportedProvider(String),

    #[error("invalid parameters for {provider}: {source}")]
    Invalid {
        provider: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Chat/completion providers the runner can construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
}

impl ModelProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProvider::OpenAi => "openai",
            ModelProvider::Anthropic => "anthropic",
        }
    }
}

impl FromStr for ModelProvider {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(ModelProvider::OpenAi),
            "anthropic" => Ok(ModelProvider::Anthropic),
            other => Err(ParamError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl std::fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameter struct with a fixed set of accepted keys
pub trait AllowList: DeserializeOwned {
    const KEYS: &'static [&'static str];

    /// Filters `raw` to the allowed keys and deserializes it
    fn from_raw(context: &str, raw: &RawParams) -> Result<Self, ParamError> {
        let filtered = filter_allowed(context, raw, Self::KEYS);
        serde_json::from_value(serde_json::Value::Object(filtered)).map_err(|source| {
            ParamError::Invalid {
                provider: context.to_string(),
                source,
            }
        })
    }
}

/// Keeps only `allowed` keys, warning about each dropped key
pub fn filter_allowed(context: &str, raw: &RawParams, allowed: &[&str]) -> RawParams {
    raw.iter()
        .filter(|(key, _)| {
            let keep = allowed.contains(&key.as_str());
            if !keep {
                warn!("{} is not a valid parameter for {}", key, context);
            }
            keep
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// OpenAI chat completion parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiParams {
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub n: u32,
    /// Seconds
    pub request_timeout: u64,
}

impl Default for OpenAiParams {
    fn default() -> Self {
        Self {
            model_name: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 256,
            n: 1,
            request_timeout: 600,
        }
    }
}

impl AllowList for OpenAiParams {
    const KEYS: &'static [&'static str] =
        &["model_name", "temperature", "max_tokens", "n", "request_timeout"];
}

/// Anthropic messages parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicParams {
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for AnthropicParams {
    fn default() -> Self {
        Self {
            model_name: "claude-2".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            top_p: 1.0,
        }
    }
}

impl AllowList for AnthropicParams {
    const KEYS: &'static [&'static str] = &["model_name", "temperature", "max_tokens", "top_p"];
}

/// OpenAI embedding parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiEmbeddingParams {
    pub model: String,
    /// Seconds
    pub request_timeout: u64,
}

impl Default for OpenAiEmbeddingParams {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            request_timeout: 60,
        }
    }
}

impl AllowList for OpenAiEmbeddingParams {
    const KEYS: &'static [&'static str] = &["model", "request_timeout"];
}

/// Typed model parameters for a supported provider
#[derive(Debug, Clone, PartialEq)]
pub enum ModelParams {
    OpenAi(OpenAiParams),
    Anthropic(AnthropicParams),
}

impl ModelParams {
    pub fn parse(provider: ModelProvider, raw: &RawParams) -> Result<Self, ParamError> {
        match provider {
            ModelProvider::OpenAi => {
                OpenAiParams::from_raw(provider.as_str(), raw).map(ModelParams::OpenAi)
            }
            ModelProvider::Anthropic => {
                AnthropicParams::from_raw(provider.as_str(), raw).map(ModelParams::Anthropic)
            }
        }
    }

    pub fn provider(&self) -> ModelProvider {
        match self {
            ModelParams::OpenAi(_) => ModelProvider::OpenAi,
            ModelParams::Anthropic(_) => ModelProvider::Anthropic,
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            ModelParams::OpenAi(p) => &p.model_name,
            ModelParams::Anthropic(p) => &p.model_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawParams {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("openai".parse::<ModelProvider>().unwrap(), ModelProvider::OpenAi);
        assert_eq!(
            "anthropic".parse::<ModelProvider>().unwrap(),
            ModelProvider::Anthropic
        );
        assert!(matches!(
            "google".parse::<ModelProvider>(),
            Err(ParamError::UnsupportedProvider(p)) if p == "google"
        ));
    }

    #[test]
    fn test_openai_params_defaults_and_unknown_keys() {
        let params = ModelParams::parse(
            ModelProvider::OpenAi,
            &raw(json!({"model_name": "gpt-4", "stream": true, "cache_enable": false})),
        )
        .unwrap();

        match params {
            ModelParams::OpenAi(p) => {
                assert_eq!(p.model_name, "gpt-4");
                assert_eq!(p.max_tokens, 256);
                assert_eq!(p.n, 1);
                assert_eq!(p.request_timeout, 600);
            }
            other => panic!("unexpected params: {:?}", other),
        }
    }

    #[test]
    fn test_anthropic_params_parse() {
        let params = ModelParams::parse(
            ModelProvider::Anthropic,
            &raw(json!({"temperature": 0.1, "max_tokens": 50})),
        )
        .unwrap();

        assert_eq!(params.provider(), ModelProvider::Anthropic);
        assert_eq!(params.model_name(), "claude-2");
        match params {
            ModelParams::Anthropic(p) => {
                assert_eq!(p.max_tokens, 50);
                assert_eq!(p.top_p, 1.0);
            }
            other => panic!("unexpected params: {:?}", other),
        }
    }

    #[test]
    fn test_wrongly_typed_known_key_is_invalid() {
        let result = ModelParams::parse(
            ModelProvider::OpenAi,
            &raw(json!({"max_tokens": "lots"})),
        );
        assert!(matches!(result, Err(ParamError::Invalid { .. })));
    }

    #[test]
    fn test_filter_allowed_keeps_only_listed_keys() {
        let filtered = filter_allowed(
            "test",
            &raw(json!({"model": "m", "chunk_size": 10})),
            OpenAiEmbeddingParams::KEYS,
        );
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("model"));
    }
}
