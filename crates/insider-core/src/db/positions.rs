//! Rolling windowed net positions per (wallet, market).

use super::track;
use crate::Result;
use rust_decimal::Decimal;
use sqlx::PgPool;

#[derive(Clone)]
pub struct NetPositionRepo {
    pool: PgPool,
}

/// Window start for a trade timestamp: the enclosing `window_hrs`-hour
/// bucket boundary.
pub fn window_start(timestamp: i64, window_hrs: i64) -> i64 {
    let window_secs = window_hrs * 3_600;
    (timestamp / window_secs) * window_secs
}

impl NetPositionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Accumulate one trade into the window. The addition happens inside the
    /// database so concurrent workers on the same key never lose an update.
    pub async fn apply(
        &self,
        wallet: &str,
        condition_id: &str,
        window_start_ts: i64,
        signed_notional: Decimal,
        now: i64,
    ) -> Result<()> {
        track(
            "upsert_net_position",
            sqlx::query(
                r#"
                INSERT INTO wallet_market_net (
                    wallet_address, condition_id, window_start_ts,
                    net_notional_usd, trade_count, updated_ts
                )
                VALUES ($1, $2, $3, $4, 1, $5)
                ON CONFLICT (wallet_address, condition_id, window_start_ts) DO UPDATE SET
                    net_notional_usd = wallet_market_net.net_notional_usd + EXCLUDED.net_notional_usd,
                    trade_count = wallet_market_net.trade_count + 1,
                    updated_ts = EXCLUDED.updated_ts
                "#,
            )
            .bind(wallet)
            .bind(condition_id)
            .bind(window_start_ts)
            .bind(signed_notional)
            .bind(now)
            .execute(&self.pool)
            .await,
        )?;
        Ok(())
    }
}
