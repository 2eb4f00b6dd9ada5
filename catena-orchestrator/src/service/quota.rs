//! Quota Service
//!
//! Admission control: prices pipeline runs, single model calls and embedding
//! chunks under the configured `QuotaPolicy`, checks them against the user's
//! ledger and debits the ledger once work has been done.

use catena_core::domain::credentials::Credentials;
use catena_core::domain::quota::{QuotaLedger, QuotaPolicy};
use catena_core::domain::step::StepDefinition;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::repository::{DebitOutcome, QuotaRepository, RepositoryError};

/// Admission was refused or could not be decided
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Insufficient quota: required {required}, available {available}")]
    InsufficientQuota { required: i64, available: i64 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct QuotaService {
    repository: Arc<dyn QuotaRepository>,
    policy: QuotaPolicy,
}

impl QuotaService {
    pub fn new(repository: Arc<dyn QuotaRepository>, policy: QuotaPolicy) -> Self {
        Self { repository, policy }
    }

    pub fn pipeline_cost(&self, steps: &[StepDefinition], credentials: &Credentials) -> i64 {
        self.policy.pipeline_cost(steps, credentials)
    }

    pub fn model_cost(
        &self,
        provider: &str,
        model_name: Option<&str>,
        credentials: &Credentials,
    ) -> i64 {
        self.policy.model_cost(provider, model_name, credentials)
    }

    pub fn embedding_chunk_cost(
        &self,
        position: usize,
        provider: &str,
        credentials: &Credentials,
    ) -> i64 {
        self.policy
            .embedding_chunk_cost(position, provider, credentials)
    }

    /// The user's ledger, or a fresh one if they have never been debited
    pub async fn ledger(&self, user_id: &str) -> Result<QuotaLedger, RepositoryError> {
        Ok(self
            .repository
            .find(user_id)
            .await?
            .unwrap_or_else(|| QuotaLedger::fresh(user_id, self.policy.initial_quota)))
    }

    /// Fails unless the user can afford `required`
    pub async fn check(&self, user_id: &str, required: i64) -> Result<(), AdmissionError> {
        let available = self.ledger(user_id).await?.quota_available;
        if available < required {
            return Err(AdmissionError::InsufficientQuota {
                required,
                available,
            });
        }
        Ok(())
    }

    /// Charges `amount` to the user; a zero amount never touches the ledger
    pub async fn debit(&self, user_id: &str, amount: i64) -> Result<(), AdmissionError> {
        if amount <= 0 {
            return Ok(());
        }

        match self
            .repository
            .debit(user_id, amount, self.policy.initial_quota)
            .await?
        {
            DebitOutcome::Applied(ledger) => {
                debug!(
                    "Debited {} from {} ({} remaining)",
                    amount, user_id, ledger.quota_available
                );
                Ok(())
            }
            DebitOutcome::Rejected(exceeded) => Err(AdmissionError::InsufficientQuota {
                required: exceeded.required,
                available: exceeded.available,
            }),
        }
    }
}
