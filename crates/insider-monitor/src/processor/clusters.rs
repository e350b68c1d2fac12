//! Funding-source cluster tracking and coordinated-trade detection.

use super::Processor;
use insider_core::types::{CoordinatedTrade, FundingSource, Trade};
use insider_core::Result;
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Two cluster wallets trading one market within this span is coordinated.
const COORDINATION_SPAN_SECS: i64 = 3_600;

impl Processor {
    /// Record a newly created wallet's funding source and grow its cluster.
    pub(crate) async fn track_funding_source(
        &self,
        wallet: &str,
        funding_source: &str,
        funding_ts: i64,
    ) {
        let source = FundingSource {
            wallet_address: wallet.to_string(),
            funding_source: funding_source.to_string(),
            funding_ts,
        };
        if let Err(e) = self.store.clusters.record_funding(&source).await {
            warn!(wallet = %wallet, error = %e, "Failed to track funding source");
            return;
        }

        match self.store.clusters.cluster_by_source(funding_source).await {
            Ok(Some(cluster)) if cluster.wallet_count > 1 => {
                info!(
                    cluster_id = %cluster.cluster_id,
                    wallet_count = cluster.wallet_count,
                    "Wallet joined a multi-wallet funding cluster"
                );
            }
            Ok(_) => {}
            Err(e) => warn!(wallet = %wallet, error = %e, "Failed to read funding cluster"),
        }
    }

    /// The wallet's cluster, when it belongs to one: (cluster id, size).
    pub(crate) async fn cluster_size(&self, wallet: &str) -> Result<Option<(String, i64)>> {
        let Some(source) = self.store.clusters.funding_source(wallet).await? else {
            return Ok(None);
        };
        let Some(cluster) = self
            .store
            .clusters
            .cluster_by_source(&source.funding_source)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some((cluster.cluster_id, cluster.wallet_count)))
    }

    /// Check whether this trade is part of coordinated cluster activity.
    ///
    /// The current trade joins the wallet set before the >= 2 distinct
    /// wallets comparison, so one earlier sibling-wallet trade inside the
    /// span is enough to flag. Returns the cluster id on detection.
    pub(crate) async fn detect_coordinated(
        &self,
        trade: &Trade,
        trade_hash: &str,
        notional: Decimal,
    ) -> Result<Option<String>> {
        let Some(source) = self.store.clusters.funding_source(&trade.proxy_wallet).await? else {
            return Ok(None);
        };
        let Some(cluster) = self
            .store
            .clusters
            .cluster_by_source(&source.funding_source)
            .await?
        else {
            return Ok(None);
        };
        if cluster.wallet_count <= 1 {
            return Ok(None);
        }

        let members = self
            .store
            .clusters
            .wallets_by_source(&source.funding_source)
            .await?;
        let lookback_ts =
            trade.timestamp - self.cfg.detection.cluster_lookback_hours * 3_600;
        let sibling_trades = self
            .store
            .trades
            .recent_for_wallets_market(&members, &trade.condition_id, lookback_ts, trade_hash)
            .await?;

        let mut wallets = std::collections::HashSet::new();
        wallets.insert(trade.proxy_wallet.clone());
        let mut total_notional = notional;
        let mut first_ts = trade.timestamp;
        let mut last_ts = trade.timestamp;

        for sibling in &sibling_trades {
            wallets.insert(sibling.proxy_wallet.clone());
            total_notional += sibling.notional_usd;
            first_ts = first_ts.min(sibling.timestamp_sec);
            last_ts = last_ts.max(sibling.timestamp_sec);
        }

        let span = last_ts - first_ts;
        if wallets.len() < 2 || span > COORDINATION_SPAN_SECS {
            return Ok(None);
        }

        let coordinated = CoordinatedTrade {
            cluster_id: cluster.cluster_id.clone(),
            condition_id: trade.condition_id.clone(),
            wallet_count: wallets.len() as i64,
            total_notional_usd: total_notional,
            time_window_sec: span,
            first_trade_ts: first_ts,
            last_trade_ts: last_ts,
            market_title: trade.title.clone(),
        };
        if let Err(e) = self.store.clusters.insert_coordinated(&coordinated).await {
            warn!(cluster_id = %cluster.cluster_id, error = %e, "Failed to record coordinated trade");
        }

        info!(
            cluster_id = %cluster.cluster_id,
            condition_id = %trade.condition_id,
            wallet_count = wallets.len(),
            time_window_sec = span,
            total_notional = %total_notional,
            "Detected coordinated trading activity"
        );
        Ok(Some(cluster.cluster_id))
    }
}
