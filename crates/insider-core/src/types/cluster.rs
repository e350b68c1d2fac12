//! Funding-source clusters and coordinated-trade records.

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

/// The funding source recorded for a wallet (unique per wallet).
#[derive(Debug, Clone)]
pub struct FundingSource {
    pub wallet_address: String,
    pub funding_source: String,
    pub funding_ts: i64,
}

/// A set of wallets sharing one funding source.
#[derive(Debug, Clone)]
pub struct WalletCluster {
    pub cluster_id: String,
    pub funding_source: String,
    pub wallet_count: i64,
    pub first_seen_ts: i64,
    pub last_activity_ts: i64,
}

/// Deterministic cluster identity derived from the funding source address.
pub fn cluster_id_for(funding_source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(funding_source.as_bytes());
    format!("cluster_{}", hex::encode(hasher.finalize()))
}

/// A detected burst of same-market trading from one cluster.
#[derive(Debug, Clone)]
pub struct CoordinatedTrade {
    pub cluster_id: String,
    pub condition_id: String,
    pub wallet_count: i64,
    pub total_notional_usd: Decimal,
    pub time_window_sec: i64,
    pub first_trade_ts: i64,
    pub last_trade_ts: i64,
    pub market_title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_id_is_deterministic() {
        let a = cluster_id_for("0xsource");
        let b = cluster_id_for("0xsource");
        assert_eq!(a, b);
        assert!(a.starts_with("cluster_"));
        assert_eq!(a.len(), "cluster_".len() + 64);
    }

    #[test]
    fn cluster_id_differs_per_source() {
        assert_ne!(cluster_id_for("0xaaa"), cluster_id_for("0xbbb"));
    }
}
