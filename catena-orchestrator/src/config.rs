//! Orchestrator configuration
//!
//! Defines all configurable parameters for the orchestrator: storage, HTTP
//! binding, worker pool size, billing rules, provider endpoints and the
//! platform-wide API keys used when a caller brings none.

use catena_core::domain::credentials::Credentials;
use catena_core::domain::quota::QuotaPolicy;
use catena_runner::provider::ProviderSettings;
use std::collections::HashSet;
use std::net::SocketAddr;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; in-memory stores are used when absent
    pub database_url: Option<String>,

    /// HTTP bind address (e.g., "0.0.0.0:8080")
    pub bind_addr: String,

    /// Maximum number of jobs executing at once
    pub max_workers: usize,

    /// Billing rules
    pub quota: QuotaPolicy,

    /// Provider API endpoints
    pub providers: ProviderSettings,

    /// Deployment keys used for providers the caller supplied no key for
    pub platform_keys: PlatformKeys,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Environment variables (all optional):
    /// - DATABASE_URL
    /// - BIND_ADDR (default: 0.0.0.0:8080)
    /// - MAX_WORKERS (default: 4)
    /// - INITIAL_QUOTA (default: 100)
    /// - BILLABLE_PROVIDERS (comma separated, default: openai,google,anthropic)
    /// - PREMIUM_MODELS (comma separated, default: gpt-4,gpt-4-1106-preview)
    /// - PREMIUM_SURCHARGE (default: 4)
    /// - EMBEDDING_BILLING_INTERVAL (default: 100)
    /// - OPENAI_BASE_URL, ANTHROPIC_BASE_URL
    /// - PLATFORM_OPENAI_API_KEY, PLATFORM_ANTHROPIC_API_KEY
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable source
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let quota = QuotaPolicy {
            initial_quota: var("INITIAL_QUOTA")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.quota.initial_quota),
            billable_providers: var("BILLABLE_PROVIDERS")
                .map(|s| parse_list(&s))
                .unwrap_or(defaults.quota.billable_providers),
            premium_models: var("PREMIUM_MODELS")
                .map(|s| parse_list(&s))
                .unwrap_or(defaults.quota.premium_models),
            premium_surcharge: var("PREMIUM_SURCHARGE")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.quota.premium_surcharge),
            embedding_billing_interval: var("EMBEDDING_BILLING_INTERVAL")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.quota.embedding_billing_interval),
        };

        let providers = ProviderSettings {
            openai_base_url: var("OPENAI_BASE_URL").unwrap_or(defaults.providers.openai_base_url),
            anthropic_base_url: var("ANTHROPIC_BASE_URL")
                .unwrap_or(defaults.providers.anthropic_base_url),
        };

        let platform_keys = PlatformKeys::default()
            .with_key("openai", var("PLATFORM_OPENAI_API_KEY"))
            .with_key("anthropic", var("PLATFORM_ANTHROPIC_API_KEY"));

        Self {
            database_url: var("DATABASE_URL"),
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_workers: var("MAX_WORKERS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.max_workers),
            quota,
            providers,
            platform_keys,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!("bind_addr must be a socket address, got {}", self.bind_addr);
        }

        if self.max_workers == 0 {
            anyhow::bail!("max_workers must be greater than 0");
        }

        if self.quota.initial_quota < 0 {
            anyhow::bail!("initial_quota cannot be negative");
        }

        if self.quota.premium_surcharge < 0 {
            anyhow::bail!("premium_surcharge cannot be negative");
        }

        if self.quota.embedding_billing_interval == 0 {
            anyhow::bail!("embedding_billing_interval must be greater than 0");
        }

        for url in [
            &self.providers.openai_base_url,
            &self.providers.anthropic_base_url,
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("provider base URL must start with http:// or https://: {}", url);
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:8080".to_string(),
            max_workers: 4,
            quota: QuotaPolicy::default(),
            providers: ProviderSettings::default(),
            platform_keys: PlatformKeys::default(),
        }
    }
}

fn parse_list(value: &str) -> HashSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Platform API keys by provider name
#[derive(Clone, Default)]
pub struct PlatformKeys {
    keys: Vec<(String, String)>,
}

impl PlatformKeys {
    pub fn with_key(mut self, provider: &str, key: Option<String>) -> Self {
        if let Some(key) = key {
            self.keys.push((provider.to_string(), key));
        }
        self
    }

    /// Fills in platform keys for providers `supplied` has no key for
    pub fn apply(&self, supplied: Credentials) -> Credentials {
        self.keys
            .iter()
            .fold(supplied, |creds, (provider, key)| {
                creds.with_platform_fallback(provider, Some(key))
            })
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|(p, _)| p.as_str())
    }
}

impl std::fmt::Debug for PlatformKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.providers()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catena_core::domain::credentials::KeySource;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.quota.initial_quota, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://catena@localhost/catena"),
            ("MAX_WORKERS", "8"),
            ("INITIAL_QUOTA", "250"),
            ("BILLABLE_PROVIDERS", "openai, anthropic"),
            ("PREMIUM_MODELS", "gpt-4o"),
            ("EMBEDDING_BILLING_INTERVAL", "50"),
            ("OPENAI_BASE_URL", "http://localhost:9000/v1"),
        ]));

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://catena@localhost/catena")
        );
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.quota.initial_quota, 250);
        assert_eq!(config.quota.billable_providers.len(), 2);
        assert!(config.quota.billable_providers.contains("anthropic"));
        assert!(config.quota.premium_models.contains("gpt-4o"));
        assert_eq!(config.quota.premium_surcharge, 4);
        assert_eq!(config.quota.embedding_billing_interval, 50);
        assert_eq!(config.providers.openai_base_url, "http://localhost:9000/v1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unparseable_numbers_use_defaults() {
        let config = Config::from_lookup(lookup(&[("MAX_WORKERS", "many"), ("DATABASE_URL", "")]));
        assert_eq!(config.max_workers, 4);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.max_workers = 0;
        assert!(config.validate().is_err());
        config.max_workers = 2;

        config.bind_addr = "localhost".to_string();
        assert!(config.validate().is_err());
        config.bind_addr = "127.0.0.1:3000".to_string();

        config.providers.anthropic_base_url = "api.anthropic.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_platform_keys_fill_gaps_only() {
        let config = Config::from_lookup(lookup(&[
            ("PLATFORM_OPENAI_API_KEY", "sk-platform"),
            ("PLATFORM_ANTHROPIC_API_KEY", "sk-ant"),
        ]));
        let supplied = Credentials::new().with_key("openai", "sk-user", KeySource::Personal);

        let creds = config.platform_keys.apply(supplied);
        assert_eq!(creds.get("openai").unwrap().key, "sk-user");
        assert_eq!(creds.get("anthropic").unwrap().source, KeySource::Platform);
        assert!(!format!("{:?}", config.platform_keys).contains("sk-"));
    }
}
