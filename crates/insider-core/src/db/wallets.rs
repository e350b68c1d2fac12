//! Wallet rows and per-wallet win/loss statistics.

use super::track;
use crate::types::{Wallet, WalletStats};
use crate::Result;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct WalletRepo {
    pool: PgPool,
}

impl WalletRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, address: &str) -> Result<Option<Wallet>> {
        let row = track(
            "get_wallet",
            sqlx::query(
                r#"
                SELECT wallet_address, first_seen_ts, funding_received_ts,
                       total_trades, total_volume_usd, last_activity_ts, updated_ts
                FROM wallets
                WHERE wallet_address = $1
                "#,
            )
            .bind(address)
            .fetch_optional(&self.pool)
            .await,
        )?;
        Ok(row.as_ref().map(row_to_wallet))
    }

    /// Insert a newly sighted wallet. A concurrent creator winning the race
    /// is fine; `first_seen_ts` is immutable either way.
    pub async fn insert_new(&self, wallet: &Wallet) -> Result<()> {
        track(
            "insert_wallet",
            sqlx::query(
                r#"
                INSERT INTO wallets (
                    wallet_address, first_seen_ts, funding_received_ts,
                    total_trades, total_volume_usd, last_activity_ts, updated_ts
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (wallet_address) DO NOTHING
                "#,
            )
            .bind(&wallet.address)
            .bind(wallet.first_seen_ts)
            .bind(wallet.funding_received_ts)
            .bind(wallet.total_trades)
            .bind(wallet.total_volume_usd)
            .bind(wallet.last_activity_ts)
            .bind(wallet.updated_ts)
            .execute(&self.pool)
            .await,
        )?;
        Ok(())
    }

    /// Apply one trade to the running totals. The increment happens inside
    /// the database so concurrent workers never lose an update.
    pub async fn record_trade(
        &self,
        address: &str,
        notional: Decimal,
        trade_ts: i64,
        now: i64,
    ) -> Result<()> {
        track(
            "update_wallet",
            sqlx::query(
                r#"
                UPDATE wallets SET
                    total_trades = total_trades + 1,
                    total_volume_usd = total_volume_usd + $2,
                    last_activity_ts = GREATEST(last_activity_ts, $3),
                    updated_ts = $4
                WHERE wallet_address = $1
                "#,
            )
            .bind(address)
            .bind(notional)
            .bind(trade_ts)
            .bind(now)
            .execute(&self.pool)
            .await,
        )?;
        Ok(())
    }

    pub async fn get_stats(&self, address: &str) -> Result<Option<WalletStats>> {
        let row = track(
            "get_wallet_stats",
            sqlx::query(
                r#"
                SELECT wallet_address, total_resolved_trades, winning_trades,
                       losing_trades, win_rate, total_profit_usd, last_calculated_ts
                FROM wallet_stats
                WHERE wallet_address = $1
                "#,
            )
            .bind(address)
            .fetch_optional(&self.pool)
            .await,
        )?;
        Ok(row.map(|r| WalletStats {
            address: r.get("wallet_address"),
            total_resolved_trades: r.get("total_resolved_trades"),
            winning_trades: r.get("winning_trades"),
            losing_trades: r.get("losing_trades"),
            win_rate: r.get::<Decimal, _>("win_rate").to_f64().unwrap_or(0.0),
            total_profit_usd: r.get("total_profit_usd"),
            last_calculated_ts: r.get("last_calculated_ts"),
        }))
    }

    pub async fn upsert_stats(&self, stats: &WalletStats) -> Result<()> {
        track(
            "upsert_wallet_stats",
            sqlx::query(
                r#"
                INSERT INTO wallet_stats (
                    wallet_address, total_resolved_trades, winning_trades,
                    losing_trades, win_rate, total_profit_usd, last_calculated_ts
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (wallet_address) DO UPDATE SET
                    total_resolved_trades = EXCLUDED.total_resolved_trades,
                    winning_trades = EXCLUDED.winning_trades,
                    losing_trades = EXCLUDED.losing_trades,
                    win_rate = EXCLUDED.win_rate,
                    total_profit_usd = EXCLUDED.total_profit_usd,
                    last_calculated_ts = EXCLUDED.last_calculated_ts
                "#,
            )
            .bind(&stats.address)
            .bind(stats.total_resolved_trades)
            .bind(stats.winning_trades)
            .bind(stats.losing_trades)
            .bind(
                Decimal::from_f64_retain(stats.win_rate)
                    .unwrap_or(Decimal::ZERO)
                    .round_dp(4),
            )
            .bind(stats.total_profit_usd)
            .bind(stats.last_calculated_ts)
            .execute(&self.pool)
            .await,
        )?;
        Ok(())
    }
}

fn row_to_wallet(r: &PgRow) -> Wallet {
    Wallet {
        address: r.get("wallet_address"),
        first_seen_ts: r.get("first_seen_ts"),
        funding_received_ts: r.get("funding_received_ts"),
        total_trades: r.get("total_trades"),
        total_volume_usd: r.get("total_volume_usd"),
        last_activity_ts: r.get("last_activity_ts"),
        updated_ts: r.get("updated_ts"),
    }
}
