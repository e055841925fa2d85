//! SQLite storage for chat subscriptions.

use crate::subscription::{Subscription, SubscriptionKind};
use chrono::{DateTime, Utc};
use proposal_core::{SymbolToken, ALL_SYMBOLS};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::SqliteExecutor;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
    #[error("Subscription not found: {symbol} ({kind}) for chat {chat_id}")]
    NotFound {
        chat_id: i64,
        symbol: String,
        kind: SubscriptionKind,
    },
    #[error("Unexpected stored value: {0}")]
    Decode(String),
}

impl DbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

type SubscriptionRow = (i64, i64, String, String, i64, i64);

const SUBSCRIPTION_COLUMNS: &str = "id, chat_id, symbol, kind, created_at, updated_at";

/// Subscription store backed by a SQLite pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to SQLite database at the given path.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subscriptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL,
                symbol TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(chat_id, symbol, kind)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_subscriptions_symbol_kind
            ON subscriptions(symbol, kind)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Subscribe a chat to a symbol.
    ///
    /// Re-subscribing refreshes `updated_at` on the existing row. Subscribing
    /// to `all` replaces every other subscription of that kind.
    pub async fn subscribe(
        &self,
        chat_id: i64,
        kind: SubscriptionKind,
        symbol: &SymbolToken,
    ) -> Result<Subscription, DbError> {
        if symbol.is_all() {
            return self.subscribe_all(chat_id, kind).await;
        }
        upsert(&self.pool, chat_id, kind, symbol.as_str()).await
    }

    /// Clear the chat's subscriptions of `kind` and insert the `all` row,
    /// in one transaction.
    pub async fn subscribe_all(
        &self,
        chat_id: i64,
        kind: SubscriptionKind,
    ) -> Result<Subscription, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM subscriptions WHERE chat_id = ? AND kind = ? AND symbol != ?")
            .bind(chat_id)
            .bind(kind.as_str())
            .bind(ALL_SYMBOLS)
            .execute(&mut *tx)
            .await?;

        let sub = upsert(&mut *tx, chat_id, kind, ALL_SYMBOLS).await?;
        tx.commit().await?;
        Ok(sub)
    }

    /// Remove one subscription. Returns `DbError::NotFound` if nothing matched.
    pub async fn unsubscribe(
        &self,
        chat_id: i64,
        kind: SubscriptionKind,
        symbol: &SymbolToken,
    ) -> Result<(), DbError> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE chat_id = ? AND symbol = ? AND kind = ?")
                .bind(chat_id)
                .bind(symbol.as_str())
                .bind(kind.as_str())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                chat_id,
                symbol: symbol.to_string(),
                kind,
            });
        }
        Ok(())
    }

    /// Remove every subscription of `kind` for a chat. Returns rows removed.
    pub async fn unsubscribe_all(
        &self,
        chat_id: i64,
        kind: SubscriptionKind,
    ) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE chat_id = ? AND kind = ?")
            .bind(chat_id)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// All subscriptions for a chat, newest first.
    pub async fn list_subscriptions(&self, chat_id: i64) -> Result<Vec<Subscription>, DbError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions \
             WHERE chat_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(subscription_from_row).collect()
    }

    /// Chats subscribed to `symbol` or to `all`, for the given kind.
    pub async fn list_subscribers(
        &self,
        symbol: &str,
        kind: SubscriptionKind,
    ) -> Result<Vec<i64>, DbError> {
        let chat_ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT DISTINCT chat_id FROM subscriptions
            WHERE (symbol = ? OR symbol = ?) AND kind = ?
            ORDER BY chat_id
            "#,
        )
        .bind(symbol)
        .bind(ALL_SYMBOLS)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(chat_ids)
    }
}

async fn upsert<'e, E: SqliteExecutor<'e>>(
    executor: E,
    chat_id: i64,
    kind: SubscriptionKind,
    symbol: &str,
) -> Result<Subscription, DbError> {
    let now = Utc::now().timestamp_micros();

    let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
        r#"
        INSERT INTO subscriptions (chat_id, symbol, kind, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(chat_id, symbol, kind)
        DO UPDATE SET updated_at = excluded.updated_at
        RETURNING {SUBSCRIPTION_COLUMNS}
        "#
    ))
    .bind(chat_id)
    .bind(symbol)
    .bind(kind.as_str())
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await?;

    subscription_from_row(row)
}

fn subscription_from_row(
    (id, chat_id, symbol, kind, created_at, updated_at): SubscriptionRow,
) -> Result<Subscription, DbError> {
    let kind = SubscriptionKind::parse(&kind)
        .ok_or_else(|| DbError::Decode(format!("subscription kind {kind:?}")))?;

    Ok(Subscription {
        id,
        chat_id,
        symbol,
        kind,
        created_at: timestamp(created_at)?,
        updated_at: timestamp(updated_at)?,
    })
}

fn timestamp(micros: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| DbError::Decode(format!("timestamp {micros}")))
}
