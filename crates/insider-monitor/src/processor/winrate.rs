//! Win-rate reconciliation.
//!
//! Sweeps every market seen in the trade log, records newly resolved
//! markets, and attributes wins and losses to wallets by their net position
//! in the winning outcome. Runs on a 24-hour ticker and once at startup.

use super::Processor;
use chrono::Utc;
use insider_core::types::{MarketResolution, TradeRecord, TradeSide};
use insider_core::{metrics, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A wallet's aggregate exposure to a resolved market.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletOutcome {
    /// Positive = long the winning outcome, negative = short it.
    pub net_position: Decimal,
    pub trade_count: i64,
}

/// Determine the winning outcome from parallel outcome/price lists.
///
/// Returns `None` when the lists are empty or mismatched, or no outcome has
/// a price of at least 0.95. Unparseable price elements are skipped.
pub fn determine_winner(outcomes: &[String], prices: &[String]) -> Option<String> {
    if outcomes.is_empty() || prices.is_empty() || outcomes.len() != prices.len() {
        return None;
    }

    for (outcome, price_str) in outcomes.iter().zip(prices) {
        let Ok(price) = price_str.parse::<f64>() else {
            continue;
        };
        if price >= 0.95 {
            return Some(outcome.clone());
        }
    }

    None
}

/// Attribute each wallet's signed position in the winning outcome.
///
/// BUY of the winner counts positive, BUY of a loser negative; SELLs invert.
/// A perfectly hedged position nets to exactly zero and is later counted as
/// resolved but neither won nor lost.
pub fn attribute_positions(
    trades: &[TradeRecord],
    winning_outcome: &str,
) -> HashMap<String, WalletOutcome> {
    let mut positions: HashMap<String, WalletOutcome> = HashMap::new();

    for trade in trades {
        let Some(side) = TradeSide::parse(&trade.side) else {
            continue;
        };
        let entry = positions.entry(trade.proxy_wallet.clone()).or_default();
        entry.trade_count += 1;

        let won = trade.outcome == winning_outcome;
        let signed = match (side, won) {
            (TradeSide::Buy, true) | (TradeSide::Sell, false) => trade.notional_usd,
            (TradeSide::Buy, false) | (TradeSide::Sell, true) => -trade.notional_usd,
        };
        entry.net_position += signed;
    }

    positions
}

impl Processor {
    /// Sweep all known markets for new resolutions and update wallet stats.
    pub async fn reconcile_win_rates(&self) -> Result<()> {
        let started = Instant::now();
        info!("Starting win rate reconciliation");

        let condition_ids = self.store.trades.distinct_condition_ids().await?;
        info!(markets = condition_ids.len(), "Checking markets for resolution");

        let mut resolved_count = 0u64;
        for condition_id in condition_ids {
            if *self.shutdown.borrow() {
                break;
            }
            match self.reconcile_market(&condition_id).await {
                Ok(true) => resolved_count += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(condition_id = %condition_id, error = %e, "Failed to reconcile market");
                }
            }
        }

        metrics::record_win_rate_run(started.elapsed(), resolved_count);
        info!(resolved = resolved_count, "Win rate reconciliation complete");
        Ok(())
    }

    /// Returns true when the market newly resolved this sweep.
    async fn reconcile_market(&self, condition_id: &str) -> Result<bool> {
        if self.store.markets.get_resolution(condition_id).await?.is_some() {
            return Ok(false);
        }

        let Some(market) = self.gamma.market_by_condition_id(condition_id).await? else {
            debug!(condition_id = %condition_id, "Market not found upstream");
            return Ok(false);
        };
        if !market.closed {
            return Ok(false);
        }

        let Some(winner) =
            determine_winner(market.outcomes.as_slice(), market.outcome_prices.as_slice())
        else {
            debug!(
                condition_id = %condition_id,
                market = %market.question,
                "Market closed but no outcome above the winner threshold"
            );
            return Ok(false);
        };

        self.store
            .markets
            .upsert_resolution(&MarketResolution {
                condition_id: condition_id.to_string(),
                winning_outcome: winner.clone(),
                resolved_ts: Utc::now().timestamp(),
                market_title: market.question.clone(),
            })
            .await?;

        self.apply_resolution(condition_id, &winner).await?;

        info!(
            condition_id = %condition_id,
            market = %market.question,
            winning_outcome = %winner,
            "Resolved market and updated wallet stats"
        );
        Ok(true)
    }

    async fn apply_resolution(&self, condition_id: &str, winner: &str) -> Result<()> {
        let trades = self.store.trades.by_condition_id(condition_id).await?;
        let positions = attribute_positions(&trades, winner);
        let now = Utc::now().timestamp();

        for (wallet, outcome) in positions {
            let mut stats = match self.store.wallets.get_stats(&wallet).await {
                Ok(Some(stats)) => stats,
                Ok(None) => insider_core::types::WalletStats::empty(&wallet),
                Err(e) => {
                    warn!(wallet = %wallet, error = %e, "Failed to load wallet stats");
                    continue;
                }
            };

            stats.total_resolved_trades += 1;
            if outcome.net_position > Decimal::ZERO {
                stats.winning_trades += 1;
            } else if outcome.net_position < Decimal::ZERO {
                stats.losing_trades += 1;
            }
            stats.total_profit_usd += outcome.net_position;
            stats.recompute_rate();
            stats.last_calculated_ts = now;

            if let Err(e) = self.store.wallets.upsert_stats(&stats).await {
                warn!(wallet = %wallet, error = %e, "Failed to update wallet stats");
            }
        }

        Ok(())
    }
}
