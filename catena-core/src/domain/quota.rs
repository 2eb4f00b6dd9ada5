//! Quota domain types
//!
//! The ledger tracks how many billed units a user may still spend. The policy
//! holds the billing rules so that provider lists and premium surcharges are
//! configuration rather than code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::domain::credentials::Credentials;
use crate::domain::step::{StepDefinition, StepKind};

/// Per-user quota ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLedger {
    pub user_id: String,
    pub quota_available: i64,
    pub quota_used: i64,
    pub updated_at: DateTime<Utc>,
}

/// A debit that would leave the ledger negative
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Quota limit exceeded: required {required}, available {available}")]
pub struct QuotaExceeded {
    pub required: i64,
    pub available: i64,
}

impl QuotaLedger {
    /// Ledger for a user that has never been debited
    pub fn fresh(user_id: impl Into<String>, initial: i64) -> Self {
        Self {
            user_id: user_id.into(),
            quota_available: initial,
            quota_used: 0,
            updated_at: Utc::now(),
        }
    }

    /// Applies a debit, leaving the ledger untouched if it would go negative
    pub fn debit(&mut self, amount: i64) -> Result<(), QuotaExceeded> {
        if self.quota_available < amount {
            return Err(QuotaExceeded {
                required: amount,
                available: self.quota_available,
            });
        }
        self.quota_available -= amount;
        self.quota_used += amount;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Billing rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaPolicy {
    /// Allowance granted to a ledger on creation
    pub initial_quota: i64,
    /// Providers whose platform-keyed calls are billed
    pub billable_providers: HashSet<String>,
    /// Models that carry the premium surcharge
    pub premium_models: HashSet<String>,
    /// Extra cost per call of a premium model
    pub premium_surcharge: i64,
    /// Embedding chunks are billed on the first chunk and every n-th chunk
    pub embedding_billing_interval: usize,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            initial_quota: 100,
            billable_providers: ["openai", "google", "anthropic"]
                .into_iter()
                .map(String::from)
                .collect(),
            premium_models: ["gpt-4", "gpt-4-1106-preview"]
                .into_iter()
                .map(String::from)
                .collect(),
            premium_surcharge: 4,
            embedding_billing_interval: 100,
        }
    }
}

impl QuotaPolicy {
    /// Cost of one model call
    pub fn model_cost(
        &self,
        provider: &str,
        model_name: Option<&str>,
        credentials: &Credentials,
    ) -> i64 {
        if !self.billable_providers.contains(provider) || credentials.has_personal(provider) {
            return 0;
        }

        match model_name {
            Some(model) if self.premium_models.contains(model) => 1 + self.premium_surcharge,
            _ => 1,
        }
    }

    /// Cost of one run of a pipeline
    pub fn pipeline_cost(&self, steps: &[StepDefinition], credentials: &Credentials) -> i64 {
        steps
            .iter()
            .map(|step| match &step.kind {
                StepKind::Prompt { model_provider, .. } => {
                    self.model_cost(model_provider, step.kind.model_name(), credentials)
                }
                _ => 0,
            })
            .sum()
    }

    /// Cost of ingesting the chunk at 1-based `position`
    pub fn embedding_chunk_cost(
        &self,
        position: usize,
        provider: &str,
        credentials: &Credentials,
    ) -> i64 {
        if credentials.has_personal(provider) {
            return 0;
        }

        let interval = self.embedding_billing_interval.max(1);
        if position == 1 || position % interval == 0 {
            1
        } else {
            0
        }
    }
}
