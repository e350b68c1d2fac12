//! Processed-trade rows: the dedup barrier and the lookback queries that
//! feed the velocity, concentration, and coordination signals.

use super::track;
use crate::types::TradeRecord;
use crate::Result;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct TradeRepo {
    pool: PgPool,
}

impl TradeRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn has_seen(&self, trade_hash: &str) -> Result<bool> {
        let row = track(
            "has_trade_seen",
            sqlx::query("SELECT 1 AS one FROM trades_seen WHERE trade_hash = $1")
                .bind(trade_hash)
                .fetch_optional(&self.pool)
                .await,
        )?;
        Ok(row.is_some())
    }

    /// Insert the trade row. Returns false when another worker already
    /// inserted the same fingerprint; the caller must then treat the trade
    /// as a duplicate before any further side effect.
    pub async fn insert(&self, record: &TradeRecord) -> Result<bool> {
        let result = track(
            "insert_trade",
            sqlx::query(
                r#"
                INSERT INTO trades_seen (
                    trade_hash, transaction_hash, condition_id, proxy_wallet,
                    timestamp_sec, notional_usd, side, outcome, price, created_ts
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (trade_hash) DO NOTHING
                "#,
            )
            .bind(&record.trade_hash)
            .bind(&record.transaction_hash)
            .bind(&record.condition_id)
            .bind(&record.proxy_wallet)
            .bind(record.timestamp_sec)
            .bind(record.notional_usd)
            .bind(&record.side)
            .bind(&record.outcome)
            .bind(record.price)
            .bind(record.created_ts)
            .execute(&self.pool)
            .await,
        )?;
        Ok(result.rows_affected() > 0)
    }

    /// Count a wallet's trades at or after `since_ts`, excluding one
    /// fingerprint (the trade currently being processed).
    pub async fn count_recent_for_wallet(
        &self,
        wallet: &str,
        since_ts: i64,
        exclude_hash: &str,
    ) -> Result<i64> {
        let row = track(
            "count_recent_trades",
            sqlx::query(
                r#"
                SELECT COUNT(*) AS n FROM trades_seen
                WHERE proxy_wallet = $1 AND timestamp_sec >= $2 AND trade_hash <> $3
                "#,
            )
            .bind(wallet)
            .bind(since_ts)
            .bind(exclude_hash)
            .fetch_one(&self.pool)
            .await,
        )?;
        Ok(row.get::<i64, _>("n"))
    }

    /// A wallet's trades in one market at or after `since_ts`, excluding one
    /// fingerprint.
    pub async fn recent_for_wallet_market(
        &self,
        wallet: &str,
        condition_id: &str,
        since_ts: i64,
        exclude_hash: &str,
    ) -> Result<Vec<TradeRecord>> {
        let rows = track(
            "recent_wallet_market_trades",
            sqlx::query(
                r#"
                SELECT trade_hash, transaction_hash, condition_id, proxy_wallet,
                       timestamp_sec, notional_usd, side, outcome, price, created_ts
                FROM trades_seen
                WHERE proxy_wallet = $1 AND condition_id = $2
                  AND timestamp_sec >= $3 AND trade_hash <> $4
                "#,
            )
            .bind(wallet)
            .bind(condition_id)
            .bind(since_ts)
            .bind(exclude_hash)
            .fetch_all(&self.pool)
            .await,
        )?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    /// Trades by any of the given wallets in one market at or after
    /// `since_ts`, excluding one fingerprint. Feeds coordination detection.
    pub async fn recent_for_wallets_market(
        &self,
        wallets: &[String],
        condition_id: &str,
        since_ts: i64,
        exclude_hash: &str,
    ) -> Result<Vec<TradeRecord>> {
        let rows = track(
            "recent_cluster_trades",
            sqlx::query(
                r#"
                SELECT trade_hash, transaction_hash, condition_id, proxy_wallet,
                       timestamp_sec, notional_usd, side, outcome, price, created_ts
                FROM trades_seen
                WHERE proxy_wallet = ANY($1) AND condition_id = $2
                  AND timestamp_sec >= $3 AND trade_hash <> $4
                "#,
            )
            .bind(wallets)
            .bind(condition_id)
            .bind(since_ts)
            .bind(exclude_hash)
            .fetch_all(&self.pool)
            .await,
        )?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    /// All trades recorded for one market (win-rate attribution).
    pub async fn by_condition_id(&self, condition_id: &str) -> Result<Vec<TradeRecord>> {
        let rows = track(
            "trades_by_condition",
            sqlx::query(
                r#"
                SELECT trade_hash, transaction_hash, condition_id, proxy_wallet,
                       timestamp_sec, notional_usd, side, outcome, price, created_ts
                FROM trades_seen
                WHERE condition_id = $1
                "#,
            )
            .bind(condition_id)
            .fetch_all(&self.pool)
            .await,
        )?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    /// Every distinct market seen in the trade log.
    pub async fn distinct_condition_ids(&self) -> Result<Vec<String>> {
        let rows = track(
            "distinct_condition_ids",
            sqlx::query("SELECT DISTINCT condition_id FROM trades_seen")
                .fetch_all(&self.pool)
                .await,
        )?;
        Ok(rows.iter().map(|r| r.get("condition_id")).collect())
    }
}

fn row_to_record(r: &PgRow) -> TradeRecord {
    TradeRecord {
        trade_hash: r.get("trade_hash"),
        transaction_hash: r.get("transaction_hash"),
        condition_id: r.get("condition_id"),
        proxy_wallet: r.get("proxy_wallet"),
        timestamp_sec: r.get("timestamp_sec"),
        notional_usd: r.get::<Decimal, _>("notional_usd"),
        side: r.get("side"),
        outcome: r.get("outcome"),
        price: r.get::<Decimal, _>("price"),
        created_ts: r.get("created_ts"),
    }
}
