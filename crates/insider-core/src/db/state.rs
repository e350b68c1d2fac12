//! Key-value application state, including the scheduler checkpoint.

use super::track;
use crate::Result;
use chrono::Utc;
use sqlx::{PgPool, Row};

/// The checkpoint key: the most recent trade timestamp fully dispatched.
pub const LAST_PROCESSED_TS: &str = "last_processed_ts";

#[derive(Clone)]
pub struct AppStateRepo {
    pool: PgPool,
}

impl AppStateRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = track(
            "get_state",
            sqlx::query("SELECT state_value FROM app_state WHERE state_key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await,
        )?;
        Ok(row.map(|r| r.get("state_value")))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        track(
            "set_state",
            sqlx::query(
                r#"
                INSERT INTO app_state (state_key, state_value, updated_ts)
                VALUES ($1, $2, $3)
                ON CONFLICT (state_key) DO UPDATE SET
                    state_value = EXCLUDED.state_value,
                    updated_ts = EXCLUDED.updated_ts
                "#,
            )
            .bind(key)
            .bind(value)
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await,
        )?;
        Ok(())
    }

    /// Read the scheduler checkpoint; zero when unset or unparseable.
    pub async fn checkpoint(&self) -> Result<i64> {
        let value = self.get(LAST_PROCESSED_TS).await?;
        Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    pub async fn set_checkpoint(&self, ts: i64) -> Result<()> {
        self.set(LAST_PROCESSED_TS, &ts.to_string()).await
    }
}
