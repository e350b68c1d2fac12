//! Wallet records and per-wallet performance statistics.

use rust_decimal::Decimal;

/// A tracked wallet.
///
/// Created on first sighting and never deleted. `first_seen_ts` never
/// changes after creation; `total_trades` is monotonic non-decreasing.
#[derive(Debug, Clone)]
pub struct Wallet {
    pub address: String,
    pub first_seen_ts: i64,
    /// When the wallet first received funds; zero when unknown.
    pub funding_received_ts: i64,
    pub total_trades: i64,
    pub total_volume_usd: Decimal,
    pub last_activity_ts: i64,
    pub updated_ts: i64,
}

impl Wallet {
    /// Whole days between a trade timestamp and first sighting.
    pub fn age_days(&self, at_ts: i64) -> i64 {
        (at_ts - self.first_seen_ts) / 86_400
    }

    /// Seconds between funding and first sighting; zero when funding is
    /// unknown or recorded after first sighting.
    pub fn funding_age_secs(&self) -> i64 {
        if self.funding_received_ts > 0
            && self.first_seen_ts > 0
            && self.first_seen_ts >= self.funding_received_ts
        {
            self.first_seen_ts - self.funding_received_ts
        } else {
            0
        }
    }
}

/// Win/loss statistics accumulated by the win-rate reconciler.
#[derive(Debug, Clone)]
pub struct WalletStats {
    pub address: String,
    pub total_resolved_trades: i64,
    pub winning_trades: i64,
    pub losing_trades: i64,
    pub win_rate: f64,
    pub total_profit_usd: Decimal,
    pub last_calculated_ts: i64,
}

impl WalletStats {
    pub fn empty(address: &str) -> Self {
        Self {
            address: address.to_string(),
            total_resolved_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            total_profit_usd: Decimal::ZERO,
            last_calculated_ts: 0,
        }
    }

    /// Recompute the win rate from the counters.
    pub fn recompute_rate(&mut self) {
        self.win_rate = if self.total_resolved_trades > 0 {
            self.winning_trades as f64 / self.total_resolved_trades as f64
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_is_whole_days() {
        let wallet = Wallet {
            address: "0xabc".into(),
            first_seen_ts: 1_000_000,
            funding_received_ts: 0,
            total_trades: 0,
            total_volume_usd: Decimal::ZERO,
            last_activity_ts: 1_000_000,
            updated_ts: 1_000_000,
        };
        assert_eq!(wallet.age_days(1_000_000), 0);
        assert_eq!(wallet.age_days(1_000_000 + 86_400 - 1), 0);
        assert_eq!(wallet.age_days(1_000_000 + 2 * 86_400), 2);
    }

    #[test]
    fn funding_age_zero_when_funding_after_first_seen() {
        let wallet = Wallet {
            address: "0xabc".into(),
            first_seen_ts: 1_000_000,
            funding_received_ts: 1_000_500,
            total_trades: 0,
            total_volume_usd: Decimal::ZERO,
            last_activity_ts: 1_000_000,
            updated_ts: 1_000_000,
        };
        assert_eq!(wallet.funding_age_secs(), 0);
    }

    #[test]
    fn win_rate_recompute_handles_zero_resolved() {
        let mut stats = WalletStats::empty("0xabc");
        stats.recompute_rate();
        assert_eq!(stats.win_rate, 0.0);

        stats.total_resolved_trades = 4;
        stats.winning_trades = 3;
        stats.recompute_rate();
        assert_eq!(stats.win_rate, 0.75);
    }
}
