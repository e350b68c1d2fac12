//! Alert delivery: payload shaping and sink fan-out.

pub mod discord;
pub mod log;
pub mod multi;
pub mod smtp;

use crate::processor::scoring::ScoreBreakdown;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use insider_core::config::Config;
use insider_core::types::Severity;
use insider_core::{Error, Result};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::warn;

/// Everything a sink needs to render one alert.
#[derive(Debug, Clone)]
pub struct AlertPayload {
    pub severity: Severity,
    pub wallet_address: String,
    pub wallet_short: String,
    pub market_title: String,
    pub market_url: String,
    pub side: String,
    pub outcome: String,
    pub notional_usd: f64,
    pub price: f64,
    pub wallet_age_days: i64,
    pub first_seen_date: String,
    pub suspicion_score: f64,
    pub breakdown: ScoreBreakdown,
    pub transaction_hash: String,
    pub tx_hash_short: String,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
}

/// An alert sink. Sinks run independently; one failing never blocks another.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, payload: &AlertPayload) -> Result<()>;

    /// Short sink name used in metrics labels.
    fn name(&self) -> &'static str;
}

/// Build the configured sink fan-out from `ALERT_MODE`.
///
/// Config validation has already rejected unknown modes and missing sink
/// settings, so construction failures here are limited to transport setup.
pub fn build_sender(cfg: &Config) -> Result<Arc<dyn Sender>> {
    let mut senders: Vec<Box<dyn Sender>> = Vec::new();

    for mode in cfg.alert_modes() {
        match mode.as_str() {
            "log" => senders.push(Box::new(log::LogSender::new())),
            "discord" => {
                for url in &cfg.alerts.discord_webhook_urls {
                    senders.push(Box::new(discord::DiscordSender::new(url.clone())?));
                }
            }
            "smtp" => senders.push(Box::new(smtp::SmtpSender::new(&cfg.alerts.smtp)?)),
            other => {
                warn!(mode = %other, "Unknown alert mode, skipping");
            }
        }
    }

    if senders.is_empty() {
        return Err(Error::Config(
            "no alert senders could be constructed from ALERT_MODE".into(),
        ));
    }

    Ok(Arc::new(multi::MultiSender::new(senders)))
}

/// `0x1234...abcd` style shortening for display.
pub fn shorten_address(addr: &str) -> String {
    if addr.len() <= 10 {
        return addr.to_string();
    }
    format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
}

pub fn shorten_hash(hash: &str) -> String {
    if hash.len() <= 16 {
        return hash.to_string();
    }
    format!("{}...{}", &hash[..8], &hash[hash.len() - 8..])
}

/// One-line rendering of the multipliers that actually applied.
pub fn format_breakdown(b: &ScoreBreakdown) -> String {
    let mut out = format!("base={:.0}", b.base_score);

    if b.time_to_close > 1.0 {
        let _ = write!(out, ", time_to_close={:.2}x({:.1}h)", b.time_to_close, b.hours_to_close);
    }
    if b.win_rate > 1.0 {
        let _ = write!(
            out,
            ", win_rate={:.2}x({:.0}%, {}t)",
            b.win_rate,
            b.win_rate_value * 100.0,
            b.resolved_trades
        );
    }
    if b.first_trade_large > 1.0 {
        let _ = write!(out, ", first_large={:.1}x", b.first_trade_large);
    }
    if b.flash_funding > 1.0 {
        let _ = write!(
            out,
            ", flash_fund={:.1}x({:.1}m)",
            b.flash_funding,
            b.funding_age_hours * 60.0
        );
    }
    if b.liquidity > 1.0 {
        let _ = write!(
            out,
            ", liquidity={:.2}x({:.1}%)",
            b.liquidity,
            b.liquidity_ratio * 100.0
        );
    }
    if b.price_confidence > 1.0 {
        let _ = write!(out, ", extreme_price={:.1}x", b.price_confidence);
    }
    if b.concentration > 1.0 {
        let _ = write!(
            out,
            ", concentration={:.1}x({:.0}%)",
            b.concentration,
            b.net_concentration * 100.0
        );
    }
    if b.velocity > 1.0 {
        let _ = write!(out, ", velocity={:.1}x({}t)", b.velocity, b.velocity_count);
    }
    if b.cluster > 1.0 {
        let _ = write!(out, ", cluster={:.1}x", b.cluster);
    }
    if b.coordinated > 1.0 {
        let _ = write!(out, ", coordinated={:.1}x", b.coordinated);
    }
    if b.funding_age > 1.0 {
        let _ = write!(
            out,
            ", fast_fund={:.2}x({:.1}h)",
            b.funding_age,
            b.funding_age_hours
        );
    }

    let _ = write!(out, " => final={:.0}", b.final_score);
    out
}

#[cfg(test)]
pub(crate) fn test_payload() -> AlertPayload {
    let breakdown = ScoreBreakdown {
        base_score: 25_000.0,
        time_to_close: 3.0,
        win_rate: 1.0,
        first_trade_large: 2.0,
        flash_funding: 1.0,
        liquidity: 1.0,
        price_confidence: 1.0,
        concentration: 1.0,
        velocity: 1.0,
        cluster: 1.0,
        coordinated: 1.0,
        funding_age: 1.0,
        final_score: 150_000.0,
        win_rate_value: 0.0,
        resolved_trades: 0,
        funding_age_hours: 0.0,
        hours_to_close: 24.0,
        liquidity_ratio: 0.0,
        net_concentration: 0.0,
        velocity_count: 0,
        cluster_id: None,
        is_coordinated: false,
    };
    AlertPayload {
        severity: Severity::Alert,
        wallet_address: "0x1234567890abcdef1234".into(),
        wallet_short: shorten_address("0x1234567890abcdef1234"),
        market_title: "Will the merger close by June?".into(),
        market_url: "https://polymarket.com/market/merger-june".into(),
        side: "BUY".into(),
        outcome: "Yes".into(),
        notional_usd: 75_000.0,
        price: 0.62,
        wallet_age_days: 1,
        first_seen_date: "2026-07-30".into(),
        suspicion_score: 150_000.0,
        breakdown,
        transaction_hash: "0xdeadbeefdeadbeefdeadbeef".into(),
        tx_hash_short: shorten_hash("0xdeadbeefdeadbeefdeadbeef"),
        timestamp: Utc::now(),
        environment: "test".into(),
    }
}
