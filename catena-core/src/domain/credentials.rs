//! Provider credentials
//!
//! Credentials map a provider name (e.g. "openai") to the API key that should
//! be used for it. Each key records whether it belongs to the user or was
//! supplied by the platform; only platform-keyed calls are billed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Origin of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// The user's own key
    Personal,
    /// A deployment-wide key
    Platform,
}

/// An API key and its origin; callers must always state the source
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub source: KeySource,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Keys available to one pipeline run or job, by provider name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials {
    keys: HashMap<String, ApiKey>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the key for a provider
    pub fn with_key(
        mut self,
        provider: impl Into<String>,
        key: impl Into<String>,
        source: KeySource,
    ) -> Self {
        self.keys.insert(
            provider.into(),
            ApiKey {
                key: key.into(),
                source,
            },
        );
        self
    }

    /// Fills in a platform key for a provider the caller did not supply a key for
    pub fn with_platform_fallback(mut self, provider: &str, key: Option<&str>) -> Self {
        if let Some(key) = key {
            self.keys.entry(provider.to_string()).or_insert(ApiKey {
                key: key.to_string(),
                source: KeySource::Platform,
            });
        }
        self
    }

    pub fn get(&self, provider: &str) -> Option<&ApiKey> {
        self.keys.get(provider)
    }

    /// Whether the user supplied their own key for this provider
    pub fn has_personal(&self, provider: &str) -> bool {
        matches!(
            self.keys.get(provider),
            Some(ApiKey {
                source: KeySource::Personal,
                ..
            })
        )
    }
}
