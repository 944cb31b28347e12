use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::StorageError;
use crate::providers::{
    NormalizedMetrics, NormalizedRecord, PaymentBreakdown, PlatformCredentials, PlatformKind,
};
use crate::sync::{ConnectionStatus, PlatformConnection, StoredConnection};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbConnectionRow {
    pub id: i64,
    pub user_id: String,
    pub platform: String,
    pub account_id: String,
    pub account_name: Option<String>,
    pub status: String,
    pub credentials: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbRecordRow {
    pub id: i64,
    pub user_id: String,
    pub platform: String,
    pub account_id: String,
    pub product_id: Option<String>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
    pub revenue_cents: i64,
    pub ad_spend_cents: i64,
    pub transaction_count: i64,
    pub refunded_amount_cents: i64,
    pub refunded_count: i64,
    pub chargeback_count: i64,
    pub pending_amount_cents: i64,
    pub pending_count: i64,
    pub tax_cents: i64,
    pub pix_cents: i64,
    pub card_cents: i64,
    pub boleto_cents: i64,
    pub other_cents: i64,
    pub partial: bool,
}

fn parse_platform(raw: &str) -> Result<PlatformKind, StorageError> {
    PlatformKind::parse(raw).ok_or_else(|| StorageError::Corrupt(format!("unknown platform {raw:?}")))
}

fn count(column: &str, value: i64) -> Result<u64, StorageError> {
    u64::try_from(value)
        .map_err(|_| StorageError::Corrupt(format!("negative {column}: {value}")))
}

/// Counts are stored as SQLite INTEGER (i64).
pub(crate) fn count_to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl TryFrom<DbConnectionRow> for StoredConnection {
    type Error = StorageError;

    fn try_from(row: DbConnectionRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<ConnectionStatus>()
            .map_err(StorageError::Corrupt)?;
        let credentials = row
            .credentials
            .as_deref()
            .map(serde_json::from_str::<PlatformCredentials>)
            .transpose()?;

        Ok(StoredConnection {
            connection: PlatformConnection {
                user_id: row.user_id,
                platform: parse_platform(&row.platform)?,
                account_id: row.account_id,
                account_name: row.account_name,
                status,
                last_sync_at: row.last_sync_at,
                last_error: row.last_error,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            credentials,
        })
    }
}

impl TryFrom<DbRecordRow> for NormalizedRecord {
    type Error = StorageError;

    fn try_from(row: DbRecordRow) -> Result<Self, Self::Error> {
        Ok(NormalizedRecord {
            platform: parse_platform(&row.platform)?,
            user_id: row.user_id,
            account_id: row.account_id,
            product_id: row.product_id,
            timestamp: row.window_start,
            window_end: row.window_end,
            synced_at: row.synced_at,
            metrics: NormalizedMetrics {
                revenue_cents: row.revenue_cents,
                ad_spend_cents: row.ad_spend_cents,
                transaction_count: count("transaction_count", row.transaction_count)?,
                refunded_amount_cents: row.refunded_amount_cents,
                refunded_count: count("refunded_count", row.refunded_count)?,
                chargeback_count: count("chargeback_count", row.chargeback_count)?,
                pending_amount_cents: row.pending_amount_cents,
                pending_count: count("pending_count", row.pending_count)?,
                tax_cents: row.tax_cents,
                payments: PaymentBreakdown {
                    pix_cents: row.pix_cents,
                    card_cents: row.card_cents,
                    boleto_cents: row.boleto_cents,
                    other_cents: row.other_cents,
                },
                partial: row.partial,
            },
        })
    }
}
