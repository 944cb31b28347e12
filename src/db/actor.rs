use crate::db::models::{DbConnectionRow, DbRecordRow, count_to_db};
use crate::db::schema::SQLITE_INIT;
use crate::error::StorageError;
use crate::providers::NormalizedRecord;
use crate::store::{MetricsStore, RecordQuery};
use crate::sync::{ConnectionKey, StoredConnection};
use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::info;

#[derive(Debug)]
pub enum DbActorMessage {
    /// Upsert a record by (user_id, platform, account_id, window_start).
    PutRecord(
        Box<NormalizedRecord>,
        RpcReplyPort<Result<(), StorageError>>,
    ),

    ListRecords(
        RecordQuery,
        RpcReplyPort<Result<Vec<NormalizedRecord>, StorageError>>,
    ),

    /// Upsert a connection by (user_id, platform, account_id).
    PutConnection(
        Box<StoredConnection>,
        RpcReplyPort<Result<(), StorageError>>,
    ),

    GetConnection(
        ConnectionKey,
        RpcReplyPort<Result<Option<StoredConnection>, StorageError>>,
    ),

    DeleteConnection(ConnectionKey, RpcReplyPort<Result<bool, StorageError>>),

    ListConnections(
        String,
        RpcReplyPort<Result<Vec<StoredConnection>, StorageError>>,
    ),

    ListUsers(RpcReplyPort<Result<Vec<String>, StorageError>>),
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

#[async_trait]
impl MetricsStore for DbActorHandle {
    async fn put_record(&self, record: &NormalizedRecord) -> Result<(), StorageError> {
        ractor::call!(
            self.actor,
            DbActorMessage::PutRecord,
            Box::new(record.clone())
        )
        .map_err(|e| StorageError::Actor(format!("DbActor PutRecord RPC failed: {e}")))?
    }

    async fn list_records(
        &self,
        query: &RecordQuery,
    ) -> Result<Vec<NormalizedRecord>, StorageError> {
        ractor::call!(self.actor, DbActorMessage::ListRecords, query.clone())
            .map_err(|e| StorageError::Actor(format!("DbActor ListRecords RPC failed: {e}")))?
    }

    async fn put_connection(&self, connection: &StoredConnection) -> Result<(), StorageError> {
        ractor::call!(
            self.actor,
            DbActorMessage::PutConnection,
            Box::new(connection.clone())
        )
        .map_err(|e| StorageError::Actor(format!("DbActor PutConnection RPC failed: {e}")))?
    }

    async fn get_connection(
        &self,
        key: &ConnectionKey,
    ) -> Result<Option<StoredConnection>, StorageError> {
        ractor::call!(self.actor, DbActorMessage::GetConnection, key.clone())
            .map_err(|e| StorageError::Actor(format!("DbActor GetConnection RPC failed: {e}")))?
    }

    async fn delete_connection(&self, key: &ConnectionKey) -> Result<bool, StorageError> {
        ractor::call!(self.actor, DbActorMessage::DeleteConnection, key.clone()).map_err(|e| {
            StorageError::Actor(format!("DbActor DeleteConnection RPC failed: {e}"))
        })?
    }

    async fn list_connections(
        &self,
        user_id: &str,
    ) -> Result<Vec<StoredConnection>, StorageError> {
        ractor::call!(
            self.actor,
            DbActorMessage::ListConnections,
            user_id.to_string()
        )
        .map_err(|e| StorageError::Actor(format!("DbActor ListConnections RPC failed: {e}")))?
    }

    async fn list_users(&self) -> Result<Vec<String>, StorageError> {
        ractor::call!(self.actor, DbActorMessage::ListUsers)
            .map_err(|e| StorageError::Actor(format!("DbActor ListUsers RPC failed: {e}")))?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbActorMessage::PutRecord(record, reply) => {
                let res = self.put_record(&state.pool, &record).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListRecords(query, reply) => {
                let res = self.list_records(&state.pool, &query).await;
                let _ = reply.send(res);
            }
            DbActorMessage::PutConnection(connection, reply) => {
                let res = self.put_connection(&state.pool, &connection).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetConnection(key, reply) => {
                let res = self.get_connection(&state.pool, &key).await;
                let _ = reply.send(res);
            }
            DbActorMessage::DeleteConnection(key, reply) => {
                let res = self.delete_connection(&state.pool, &key).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListConnections(user_id, reply) => {
                let res = self.list_connections(&state.pool, &user_id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListUsers(reply) => {
                let res = self.list_users(&state.pool).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

const CONNECTION_COLUMNS: &str = "id, user_id, platform, account_id, account_name, status, \
    credentials, last_sync_at, last_error, created_at, updated_at";

const RECORD_COLUMNS: &str = "id, user_id, platform, account_id, product_id, window_start, \
    window_end, synced_at, revenue_cents, ad_spend_cents, transaction_count, \
    refunded_amount_cents, refunded_count, chargeback_count, pending_amount_cents, \
    pending_count, tax_cents, pix_cents, card_cents, boleto_cents, other_cents, partial";

impl DbActor {
    async fn put_record(
        &self,
        pool: &SqlitePool,
        record: &NormalizedRecord,
    ) -> Result<(), StorageError> {
        let m = &record.metrics;
        sqlx::query(
            r#"
        INSERT INTO normalized_records (
            user_id, platform, account_id, product_id, window_start, window_end, synced_at,
            revenue_cents, ad_spend_cents, transaction_count, refunded_amount_cents,
            refunded_count, chargeback_count, pending_amount_cents, pending_count, tax_cents,
            pix_cents, card_cents, boleto_cents, other_cents, partial
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, platform, account_id, window_start) DO UPDATE SET
            product_id = excluded.product_id,
            window_end = excluded.window_end,
            synced_at = excluded.synced_at,
            revenue_cents = excluded.revenue_cents,
            ad_spend_cents = excluded.ad_spend_cents,
            transaction_count = excluded.transaction_count,
            refunded_amount_cents = excluded.refunded_amount_cents,
            refunded_count = excluded.refunded_count,
            chargeback_count = excluded.chargeback_count,
            pending_amount_cents = excluded.pending_amount_cents,
            pending_count = excluded.pending_count,
            tax_cents = excluded.tax_cents,
            pix_cents = excluded.pix_cents,
            card_cents = excluded.card_cents,
            boleto_cents = excluded.boleto_cents,
            other_cents = excluded.other_cents,
            partial = excluded.partial
        "#,
        )
        .bind(&record.user_id)
        .bind(record.platform.as_str())
        .bind(&record.account_id)
        .bind(&record.product_id)
        .bind(record.timestamp)
        .bind(record.window_end)
        .bind(record.synced_at)
        .bind(m.revenue_cents)
        .bind(m.ad_spend_cents)
        .bind(count_to_db(m.transaction_count))
        .bind(m.refunded_amount_cents)
        .bind(count_to_db(m.refunded_count))
        .bind(count_to_db(m.chargeback_count))
        .bind(m.pending_amount_cents)
        .bind(count_to_db(m.pending_count))
        .bind(m.tax_cents)
        .bind(m.payments.pix_cents)
        .bind(m.payments.card_cents)
        .bind(m.payments.boleto_cents)
        .bind(m.payments.other_cents)
        .bind(m.partial)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn list_records(
        &self,
        pool: &SqlitePool,
        query: &RecordQuery,
    ) -> Result<Vec<NormalizedRecord>, StorageError> {
        let sql = format!(
            r#"
        SELECT {RECORD_COLUMNS}
        FROM normalized_records
        WHERE user_id = ?1
          AND (?2 IS NULL OR platform = ?2)
          AND (?3 IS NULL OR account_id = ?3)
          AND (?4 IS NULL OR product_id = ?4)
          AND (?5 IS NULL OR window_start >= ?5)
          AND (?6 IS NULL OR window_start <= ?6)
        ORDER BY window_start, platform, account_id
        "#
        );
        let rows = sqlx::query_as::<_, DbRecordRow>(&sql)
            .bind(&query.user_id)
            .bind(query.platform.map(|p| p.as_str()))
            .bind(&query.account_id)
            .bind(&query.product_id)
            .bind(query.from)
            .bind(query.to)
            .fetch_all(pool)
            .await?;

        rows.into_iter().map(NormalizedRecord::try_from).collect()
    }

    async fn put_connection(
        &self,
        pool: &SqlitePool,
        stored: &StoredConnection,
    ) -> Result<(), StorageError> {
        let c = &stored.connection;
        let credentials = stored
            .credentials
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
        INSERT INTO platform_connections (
            user_id, platform, account_id, account_name, status, credentials,
            last_sync_at, last_error, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, platform, account_id) DO UPDATE SET
            account_name = excluded.account_name,
            status = excluded.status,
            credentials = excluded.credentials,
            last_sync_at = excluded.last_sync_at,
            last_error = excluded.last_error,
            updated_at = excluded.updated_at
        "#,
        )
        .bind(&c.user_id)
        .bind(c.platform.as_str())
        .bind(&c.account_id)
        .bind(&c.account_name)
        .bind(c.status.as_str())
        .bind(credentials)
        .bind(c.last_sync_at)
        .bind(&c.last_error)
        .bind(c.created_at)
        .bind(c.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn get_connection(
        &self,
        pool: &SqlitePool,
        key: &ConnectionKey,
    ) -> Result<Option<StoredConnection>, StorageError> {
        let sql = format!(
            "SELECT {CONNECTION_COLUMNS} FROM platform_connections \
             WHERE user_id = ? AND platform = ? AND account_id = ?"
        );
        let row = sqlx::query_as::<_, DbConnectionRow>(&sql)
            .bind(&key.user_id)
            .bind(key.platform.as_str())
            .bind(&key.account_id)
            .fetch_optional(pool)
            .await?;

        row.map(StoredConnection::try_from).transpose()
    }

    async fn delete_connection(
        &self,
        pool: &SqlitePool,
        key: &ConnectionKey,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "DELETE FROM platform_connections WHERE user_id = ? AND platform = ? AND account_id = ?",
        )
        .bind(&key.user_id)
        .bind(key.platform.as_str())
        .bind(&key.account_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_connections(
        &self,
        pool: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<StoredConnection>, StorageError> {
        let sql = format!(
            "SELECT {CONNECTION_COLUMNS} FROM platform_connections \
             WHERE user_id = ? ORDER BY platform, account_id"
        );
        let rows = sqlx::query_as::<_, DbConnectionRow>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        rows.into_iter().map(StoredConnection::try_from).collect()
    }

    async fn list_users(&self, pool: &SqlitePool) -> Result<Vec<String>, StorageError> {
        let users = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT user_id FROM platform_connections ORDER BY user_id",
        )
        .fetch_all(pool)
        .await?;

        Ok(users)
    }
}

/// Spawn the database actor and return a cloneable handle.
pub async fn spawn(database_url: &str) -> Result<DbActorHandle, StorageError> {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .map_err(|e| StorageError::Actor(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), StorageError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
