//! Quota DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::quota::QuotaLedger;

/// A user's remaining and spent quota
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaView {
    pub user_id: String,
    pub quota_available: i64,
    pub quota_used: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<QuotaLedger> for QuotaView {
    fn from(ledger: QuotaLedger) -> Self {
        Self {
            user_id: ledger.user_id,
            quota_available: ledger.quota_available,
            quota_used: ledger.quota_used,
            updated_at: Some(ledger.updated_at),
        }
    }
}
