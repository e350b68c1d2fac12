//! Funding sources, wallet clusters, and coordinated-trade records.

use super::track;
use crate::types::{cluster_id_for, CoordinatedTrade, FundingSource, WalletCluster};
use crate::Result;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct ClusterRepo {
    pool: PgPool,
}

impl ClusterRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a wallet's funding source and grow its cluster.
    ///
    /// The funding-source row is unique per wallet; the cluster member count
    /// is incremented only when this call actually inserted the mapping, so
    /// re-recording the same wallet never inflates the cluster.
    pub async fn record_funding(&self, source: &FundingSource) -> Result<()> {
        let inserted = track(
            "insert_funding_source",
            sqlx::query(
                r#"
                INSERT INTO wallet_funding_sources (wallet_address, funding_source, funding_ts)
                VALUES ($1, $2, $3)
                ON CONFLICT (wallet_address) DO NOTHING
                "#,
            )
            .bind(&source.wallet_address)
            .bind(&source.funding_source)
            .bind(source.funding_ts)
            .execute(&self.pool)
            .await,
        )?
        .rows_affected()
            > 0;

        if !inserted {
            return Ok(());
        }

        track(
            "upsert_wallet_cluster",
            sqlx::query(
                r#"
                INSERT INTO wallet_clusters (
                    cluster_id, funding_source, wallet_count, first_seen_ts, last_activity_ts
                )
                VALUES ($1, $2, 1, $3, $3)
                ON CONFLICT (funding_source) DO UPDATE SET
                    wallet_count = wallet_clusters.wallet_count + 1,
                    last_activity_ts = EXCLUDED.last_activity_ts
                "#,
            )
            .bind(cluster_id_for(&source.funding_source))
            .bind(&source.funding_source)
            .bind(source.funding_ts)
            .execute(&self.pool)
            .await,
        )?;
        Ok(())
    }

    pub async fn funding_source(&self, wallet: &str) -> Result<Option<FundingSource>> {
        let row = track(
            "get_funding_source",
            sqlx::query(
                r#"
                SELECT wallet_address, funding_source, funding_ts
                FROM wallet_funding_sources
                WHERE wallet_address = $1
                "#,
            )
            .bind(wallet)
            .fetch_optional(&self.pool)
            .await,
        )?;
        Ok(row.map(|r| FundingSource {
            wallet_address: r.get("wallet_address"),
            funding_source: r.get("funding_source"),
            funding_ts: r.get("funding_ts"),
        }))
    }

    pub async fn cluster_by_source(&self, funding_source: &str) -> Result<Option<WalletCluster>> {
        let row = track(
            "get_wallet_cluster",
            sqlx::query(
                r#"
                SELECT cluster_id, funding_source, wallet_count, first_seen_ts, last_activity_ts
                FROM wallet_clusters
                WHERE funding_source = $1
                "#,
            )
            .bind(funding_source)
            .fetch_optional(&self.pool)
            .await,
        )?;
        Ok(row.map(|r| WalletCluster {
            cluster_id: r.get("cluster_id"),
            funding_source: r.get("funding_source"),
            wallet_count: r.get("wallet_count"),
            first_seen_ts: r.get("first_seen_ts"),
            last_activity_ts: r.get("last_activity_ts"),
        }))
    }

    /// All wallet addresses funded by one source.
    pub async fn wallets_by_source(&self, funding_source: &str) -> Result<Vec<String>> {
        let rows = track(
            "get_cluster_wallets",
            sqlx::query(
                "SELECT wallet_address FROM wallet_funding_sources WHERE funding_source = $1",
            )
            .bind(funding_source)
            .fetch_all(&self.pool)
            .await,
        )?;
        Ok(rows.iter().map(|r| r.get("wallet_address")).collect())
    }

    pub async fn insert_coordinated(&self, coordinated: &CoordinatedTrade) -> Result<()> {
        track(
            "insert_coordinated_trade",
            sqlx::query(
                r#"
                INSERT INTO coordinated_trades (
                    cluster_id, condition_id, wallet_count, total_notional_usd,
                    time_window_sec, first_trade_ts, last_trade_ts, market_title
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(&coordinated.cluster_id)
            .bind(&coordinated.condition_id)
            .bind(coordinated.wallet_count)
            .bind(coordinated.total_notional_usd)
            .bind(coordinated.time_window_sec)
            .bind(coordinated.first_trade_ts)
            .bind(coordinated.last_trade_ts)
            .bind(&coordinated.market_title)
            .execute(&self.pool)
            .await,
        )?;
        Ok(())
    }
}
