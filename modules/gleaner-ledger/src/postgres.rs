use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::store::SeenStore;

/// Postgres-backed seen ledger.
pub struct PgSeenStore {
    pool: PgPool,
}

impl PgSeenStore {
    /// Connect with a small pool; the bot is single-threaded so five
    /// connections is already generous.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `seen` table if this is a fresh database.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seen (
                question_id TEXT PRIMARY KEY,
                last_seen   TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Seen ledger schema ready");
        Ok(())
    }
}

#[async_trait]
impl SeenStore for PgSeenStore {
    async fn upsert(&self, question_id: &str, seen_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO seen (question_id, last_seen)
            VALUES ($1, $2)
            ON CONFLICT (question_id) DO UPDATE SET last_seen = EXCLUDED.last_seen
            "#,
        )
        .bind(question_id)
        .bind(seen_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn contains(&self, question_id: &str) -> Result<bool> {
        let found: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM seen WHERE question_id = $1)"#)
                .bind(question_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(found)
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM seen"#)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn delete_oldest(&self, n: u64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM seen
            WHERE question_id IN (
                SELECT question_id FROM seen
                ORDER BY last_seen ASC, question_id ASC
                LIMIT $1
            )
            "#,
        )
        .bind(n as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
