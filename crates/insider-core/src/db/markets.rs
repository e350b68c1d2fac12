//! Market metadata cache and market resolutions.

use super::track;
use crate::types::{MarketMapEntry, MarketResolution};
use crate::Result;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct MarketRepo {
    pool: PgPool,
}

impl MarketRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_map(&self, condition_id: &str) -> Result<Option<MarketMapEntry>> {
        let row = track(
            "get_market_map",
            sqlx::query(
                r#"
                SELECT condition_id, market_slug, market_title, market_url, category,
                       end_date, volume_num, liquidity_num, is_active, updated_ts
                FROM market_map
                WHERE condition_id = $1
                "#,
            )
            .bind(condition_id)
            .fetch_optional(&self.pool)
            .await,
        )?;
        Ok(row.map(|r| MarketMapEntry {
            condition_id: r.get("condition_id"),
            market_slug: r.get("market_slug"),
            market_title: r.get("market_title"),
            market_url: r.get("market_url"),
            category: r.get("category"),
            end_date: r.get("end_date"),
            volume_num: r.get::<Decimal, _>("volume_num"),
            liquidity_num: r.get::<Decimal, _>("liquidity_num"),
            is_active: r.get("is_active"),
            updated_ts: r.get("updated_ts"),
        }))
    }

    /// Cache a resolved market. Concurrent resolvers may both write; last
    /// write wins and the entry is idempotent.
    pub async fn upsert_map(&self, entry: &MarketMapEntry) -> Result<()> {
        track(
            "upsert_market_map",
            sqlx::query(
                r#"
                INSERT INTO market_map (
                    condition_id, market_slug, market_title, market_url, category,
                    end_date, volume_num, liquidity_num, is_active, updated_ts
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (condition_id) DO UPDATE SET
                    market_slug = EXCLUDED.market_slug,
                    market_title = EXCLUDED.market_title,
                    market_url = EXCLUDED.market_url,
                    category = EXCLUDED.category,
                    end_date = EXCLUDED.end_date,
                    volume_num = EXCLUDED.volume_num,
                    liquidity_num = EXCLUDED.liquidity_num,
                    is_active = EXCLUDED.is_active,
                    updated_ts = EXCLUDED.updated_ts
                "#,
            )
            .bind(&entry.condition_id)
            .bind(&entry.market_slug)
            .bind(&entry.market_title)
            .bind(&entry.market_url)
            .bind(&entry.category)
            .bind(entry.end_date)
            .bind(entry.volume_num)
            .bind(entry.liquidity_num)
            .bind(entry.is_active)
            .bind(entry.updated_ts)
            .execute(&self.pool)
            .await,
        )?;
        Ok(())
    }

    pub async fn get_resolution(&self, condition_id: &str) -> Result<Option<MarketResolution>> {
        let row = track(
            "get_market_resolution",
            sqlx::query(
                r#"
                SELECT condition_id, winning_outcome, resolved_ts, market_title
                FROM market_resolutions
                WHERE condition_id = $1
                "#,
            )
            .bind(condition_id)
            .fetch_optional(&self.pool)
            .await,
        )?;
        Ok(row.map(|r| MarketResolution {
            condition_id: r.get("condition_id"),
            winning_outcome: r.get("winning_outcome"),
            resolved_ts: r.get("resolved_ts"),
            market_title: r.get("market_title"),
        }))
    }

    pub async fn upsert_resolution(&self, resolution: &MarketResolution) -> Result<()> {
        track(
            "upsert_market_resolution",
            sqlx::query(
                r#"
                INSERT INTO market_resolutions (
                    condition_id, winning_outcome, resolved_ts, market_title
                )
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (condition_id) DO UPDATE SET
                    winning_outcome = EXCLUDED.winning_outcome,
                    resolved_ts = EXCLUDED.resolved_ts,
                    market_title = EXCLUDED.market_title
                "#,
            )
            .bind(&resolution.condition_id)
            .bind(&resolution.winning_outcome)
            .bind(resolution.resolved_ts)
            .bind(&resolution.market_title)
            .execute(&self.pool)
            .await,
        )?;
        Ok(())
    }
}
