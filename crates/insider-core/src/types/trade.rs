//! Trade and activity types from the Polymarket Data API.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Validated trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Parse the wire value. Anything other than BUY/SELL is malformed.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(TradeSide::Buy),
            "SELL" => Some(TradeSide::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

/// A trade as returned by `GET /trades`.
///
/// The side is kept as the raw string so a single malformed trade fails
/// validation in the pipeline instead of poisoning the whole batch decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    #[serde(default)]
    pub proxy_wallet: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub condition_id: String,
    #[serde(default)]
    pub size: Decimal,
    #[serde(default)]
    pub price: Decimal,
    pub timestamp: i64,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub event_slug: String,
    #[serde(default)]
    pub transaction_hash: String,
    /// Preferred notional; zero when the API omits it.
    #[serde(default)]
    pub usdc_size: Decimal,
}

impl Trade {
    /// USD notional: the reported cash size when present, else size x price.
    pub fn notional(&self) -> Decimal {
        if self.usdc_size > Decimal::ZERO {
            self.usdc_size
        } else {
            self.size * self.price
        }
    }

    /// Deterministic identity for deduplication.
    ///
    /// Uses the transaction hash verbatim when present; otherwise a SHA-256
    /// digest over the canonical `wallet:market:ts:size:price` string with
    /// size and price fixed to six decimal places.
    pub fn fingerprint(&self) -> String {
        if !self.transaction_hash.is_empty() {
            return self.transaction_hash.clone();
        }

        let canonical = format!(
            "{}:{}:{}:{:.6}:{:.6}",
            self.proxy_wallet,
            self.condition_id,
            self.timestamp,
            self.size.to_f64().unwrap_or(0.0),
            self.price.to_f64().unwrap_or(0.0),
        );
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn parsed_side(&self) -> Option<TradeSide> {
        TradeSide::parse(&self.side)
    }
}

/// A persisted `trades_seen` row.
#[derive(Debug, Clone)]
pub struct TradeRecord {
    pub trade_hash: String,
    pub transaction_hash: String,
    pub condition_id: String,
    pub proxy_wallet: String,
    pub timestamp_sec: i64,
    pub notional_usd: Decimal,
    pub side: String,
    pub outcome: String,
    pub price: Decimal,
    pub created_ts: i64,
}

/// An activity event from `GET /activity`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub activity_type: String,
    #[serde(default)]
    pub user: String,
    pub timestamp: i64,
    /// Counterparty address, used as the funding source for new wallets.
    #[serde(rename = "fromAddress", default)]
    pub from_address: String,
}

impl ActivityEvent {
    pub fn is_trade(&self) -> bool {
        self.activity_type == "TRADE"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade() -> Trade {
        Trade {
            proxy_wallet: "0xabc123".into(),
            side: "BUY".into(),
            condition_id: "0xcond".into(),
            size: Decimal::new(10_000, 0),
            price: Decimal::new(62, 2),
            timestamp: 1_700_000_000,
            outcome: "Yes".into(),
            title: "Will it happen?".into(),
            slug: "will-it-happen".into(),
            event_slug: String::new(),
            transaction_hash: String::new(),
            usdc_size: Decimal::ZERO,
        }
    }

    #[test]
    fn notional_prefers_usdc_size() {
        let mut trade = sample_trade();
        trade.usdc_size = Decimal::new(7_500, 0);
        assert_eq!(trade.notional(), Decimal::new(7_500, 0));
    }

    #[test]
    fn notional_falls_back_to_size_times_price() {
        let trade = sample_trade();
        assert_eq!(trade.notional(), Decimal::new(6_200, 0));
    }

    #[test]
    fn fingerprint_uses_transaction_hash_when_present() {
        let mut trade = sample_trade();
        trade.transaction_hash = "0xdeadbeef".into();
        assert_eq!(trade.fingerprint(), "0xdeadbeef");
    }

    #[test]
    fn fingerprint_is_deterministic_without_hash() {
        let a = sample_trade();
        let b = sample_trade();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn fingerprint_distinguishes_sixth_decimal_of_size() {
        let a = sample_trade();
        let mut b = sample_trade();
        b.size += Decimal::new(1, 6);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn side_parsing_rejects_unknown_values() {
        assert_eq!(TradeSide::parse("BUY"), Some(TradeSide::Buy));
        assert_eq!(TradeSide::parse("SELL"), Some(TradeSide::Sell));
        assert_eq!(TradeSide::parse("buy"), None);
        assert_eq!(TradeSide::parse("HOLD"), None);
    }

    #[test]
    fn trade_decodes_from_api_json() {
        let json = r#"{
            "proxyWallet": "0xabc",
            "side": "SELL",
            "conditionId": "0xcond",
            "size": 150.5,
            "price": 0.87,
            "timestamp": 1700000123,
            "outcome": "No",
            "title": "Some market",
            "slug": "some-market",
            "transactionHash": "0xfeed",
            "usdcSize": 130.93
        }"#;
        let trade: Trade = serde_json::from_str(json).unwrap();
        assert_eq!(trade.parsed_side(), Some(TradeSide::Sell));
        assert_eq!(trade.notional(), Decimal::new(13_093, 2));
    }
}
