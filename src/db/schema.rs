//! SQL DDL for initializing the database schema.
//! SQLite-first; statements are idempotent and run on every start.

/// SQLite schema includes:
/// - `platform_connections` (one (user_id, platform, account_id) per row, credentials as JSON)
/// - `normalized_records` (one (user_id, platform, account_id, window_start) per row)
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Platform connections
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS platform_connections (
    id INTEGER PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    platform TEXT NOT NULL,
    account_id TEXT NOT NULL,
    account_name TEXT NULL,
    status TEXT NOT NULL,
    credentials TEXT NULL, -- JSON object
    last_sync_at TEXT NULL, -- RFC3339
    last_error TEXT NULL,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL, -- RFC3339
    UNIQUE(user_id, platform, account_id)
);

CREATE INDEX IF NOT EXISTS idx_platform_connections_user ON platform_connections(user_id);

-- ---------------------------------------------------------------------------
-- Normalized sync records (amounts in centavos)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS normalized_records (
    id INTEGER PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    platform TEXT NOT NULL,
    account_id TEXT NOT NULL,
    product_id TEXT NULL,
    window_start TEXT NOT NULL, -- RFC3339
    window_end TEXT NOT NULL, -- RFC3339
    synced_at TEXT NOT NULL, -- RFC3339
    revenue_cents INTEGER NOT NULL DEFAULT 0,
    ad_spend_cents INTEGER NOT NULL DEFAULT 0,
    transaction_count INTEGER NOT NULL DEFAULT 0,
    refunded_amount_cents INTEGER NOT NULL DEFAULT 0,
    refunded_count INTEGER NOT NULL DEFAULT 0,
    chargeback_count INTEGER NOT NULL DEFAULT 0,
    pending_amount_cents INTEGER NOT NULL DEFAULT 0,
    pending_count INTEGER NOT NULL DEFAULT 0,
    tax_cents INTEGER NOT NULL DEFAULT 0,
    pix_cents INTEGER NOT NULL DEFAULT 0,
    card_cents INTEGER NOT NULL DEFAULT 0,
    boleto_cents INTEGER NOT NULL DEFAULT 0,
    other_cents INTEGER NOT NULL DEFAULT 0,
    partial INTEGER NOT NULL DEFAULT 0,
    UNIQUE(user_id, platform, account_id, window_start)
);

CREATE INDEX IF NOT EXISTS idx_normalized_records_user_window ON normalized_records(user_id, window_start);
"#;
