//! Quota Repository
//!
//! Per-user quota ledgers. Debits are atomic check-and-write operations so
//! that concurrent jobs of one user can never drive a ledger negative.

use async_trait::async_trait;
use catena_core::domain::quota::{QuotaExceeded, QuotaLedger};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::RepositoryError;

/// Result of a debit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitOutcome {
    Applied(QuotaLedger),
    Rejected(QuotaExceeded),
}

#[async_trait]
pub trait QuotaRepository: Send + Sync {
    async fn find(&self, user_id: &str) -> Result<Option<QuotaLedger>, RepositoryError>;

    /// Debits `amount`, creating the ledger with `initial` first if needed
    ///
    /// A debit exceeding the available quota is rejected and leaves the
    /// ledger untouched.
    async fn debit(
        &self,
        user_id: &str,
        amount: i64,
        initial: i64,
    ) -> Result<DebitOutcome, RepositoryError>;
}

// =============================================================================
// Postgres
// =============================================================================

/// Postgres implementation of QuotaRepository
pub struct PgQuotaRepository {
    pool: PgPool,
}

impl PgQuotaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaRepository for PgQuotaRepository {
    async fn find(&self, user_id: &str) -> Result<Option<QuotaLedger>, RepositoryError> {
        let row = sqlx::query_as::<_, QuotaRow>(
            r#"
            SELECT user_id, quota_available, quota_used, updated_at
            FROM user_quotas
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn debit(
        &self,
        user_id: &str,
        amount: i64,
        initial: i64,
    ) -> Result<DebitOutcome, RepositoryError> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO user_quotas (user_id, quota_available, quota_used, updated_at)
            VALUES ($1, $2, 0, $3)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(initial)
        .bind(now)
        .execute(&self.pool)
        .await?;

        // Conditional update: a concurrent debit cannot overdraw the ledger
        let updated = sqlx::query_as::<_, QuotaRow>(
            r#"
            UPDATE user_quotas
            SET quota_available = quota_available - $2,
                quota_used = quota_used + $2,
                updated_at = $3
            WHERE user_id = $1 AND quota_available >= $2
            RETURNING user_id, quota_available, quota_used, updated_at
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(DebitOutcome::Applied(row.into()));
        }

        let available = self
            .find(user_id)
            .await?
            .map(|ledger| ledger.quota_available)
            .unwrap_or_default();

        Ok(DebitOutcome::Rejected(QuotaExceeded {
            required: amount,
            available,
        }))
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// In-memory implementation of QuotaRepository
#[derive(Default)]
pub struct InMemoryQuotaRepository {
    ledgers: Mutex<HashMap<String, QuotaLedger>>,
}

impl InMemoryQuotaRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuotaRepository for InMemoryQuotaRepository {
    async fn find(&self, user_id: &str) -> Result<Option<QuotaLedger>, RepositoryError> {
        Ok(self.ledgers.lock().await.get(user_id).cloned())
    }

    async fn debit(
        &self,
        user_id: &str,
        amount: i64,
        initial: i64,
    ) -> Result<DebitOutcome, RepositoryError> {
        let mut ledgers = self.ledgers.lock().await;
        let ledger = ledgers
            .entry(user_id.to_string())
            .or_insert_with(|| QuotaLedger::fresh(user_id, initial));

        Ok(match ledger.debit(amount) {
            Ok(()) => DebitOutcome::Applied(ledger.clone()),
            Err(exceeded) => DebitOutcome::Rejected(exceeded),
        })
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct QuotaRow {
    user_id: String,
    quota_available: i64,
    quota_used: i64,
    updated_at: DateTime<Utc>,
}

impl From<QuotaRow> for QuotaLedger {
    fn from(row: QuotaRow) -> Self {
        QuotaLedger {
            user_id: row.user_id,
            quota_available: row.quota_available,
            quota_used: row.quota_used,
            updated_at: row.updated_at,
        }
    }
}
