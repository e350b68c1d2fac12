//! Alert severity and persisted alert rows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Alert severity. INFO-level results are never emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Alert,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Alert => "ALERT",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted alert. Appended, never mutated.
#[derive(Debug, Clone)]
pub struct AlertRecord {
    pub alert_type: String,
    pub wallet_address: String,
    pub condition_id: String,
    pub market_title: String,
    pub market_slug: String,
    pub market_url: String,
    pub side: String,
    pub outcome: String,
    pub notional_usd: Decimal,
    pub price: Decimal,
    pub wallet_age_days: i64,
    pub suspicion_score: Decimal,
    pub transaction_hash: String,
    pub trade_timestamp_sec: i64,
    pub created_ts: i64,
}
