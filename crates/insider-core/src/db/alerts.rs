//! Persisted alerts and the per-wallet cooldown lookup.

use super::track;
use crate::types::AlertRecord;
use crate::Result;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct AlertRepo {
    pool: PgPool,
}

impl AlertRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an alert row; returns the generated id.
    pub async fn insert(&self, alert: &AlertRecord) -> Result<i64> {
        let row = track(
            "insert_alert",
            sqlx::query(
                r#"
                INSERT INTO alerts (
                    alert_type, wallet_address, condition_id, market_title, market_slug,
                    market_url, side, outcome, notional_usd, price, wallet_age_days,
                    suspicion_score, transaction_hash, trade_timestamp_sec, created_ts
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                RETURNING id
                "#,
            )
            .bind(&alert.alert_type)
            .bind(&alert.wallet_address)
            .bind(&alert.condition_id)
            .bind(&alert.market_title)
            .bind(&alert.market_slug)
            .bind(&alert.market_url)
            .bind(&alert.side)
            .bind(&alert.outcome)
            .bind(alert.notional_usd)
            .bind(alert.price)
            .bind(alert.wallet_age_days)
            .bind(alert.suspicion_score)
            .bind(&alert.transaction_hash)
            .bind(alert.trade_timestamp_sec)
            .bind(alert.created_ts)
            .fetch_one(&self.pool)
            .await,
        )?;
        Ok(row.get("id"))
    }

    /// Creation time of the wallet's most recent alert, for cooldown checks.
    pub async fn last_alert_ts(&self, wallet: &str) -> Result<Option<i64>> {
        let row = track(
            "get_last_alert",
            sqlx::query(
                r#"
                SELECT created_ts FROM alerts
                WHERE wallet_address = $1
                ORDER BY created_ts DESC
                LIMIT 1
                "#,
            )
            .bind(wallet)
            .fetch_optional(&self.pool)
            .await,
        )?;
        Ok(row.map(|r| r.get("created_ts")))
    }
}
