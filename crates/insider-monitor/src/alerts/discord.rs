//! Discord webhook alert sink.

use super::{format_breakdown, AlertPayload, Sender};
use async_trait::async_trait;
use insider_core::types::Severity;
use insider_core::{Error, Result};
use serde_json::{json, Value};
use std::time::Duration;

/// Timeout for webhook posts; alert sinks must not stall the pipeline.
const WEBHOOK_TIMEOUT_SECS: u64 = 10;

pub struct DiscordSender {
    webhook_url: String,
    http: reqwest::Client,
}

impl DiscordSender {
    pub fn new(webhook_url: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()?;
        Ok(Self { webhook_url, http })
    }
}

#[async_trait]
impl Sender for DiscordSender {
    async fn send(&self, payload: &AlertPayload) -> Result<()> {
        let body = json!({ "embeds": [build_embed(payload)] });

        let response = self
            .http
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::AlertDelivery(format!("discord webhook: {e}")))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::AlertDelivery(format!(
                "discord webhook returned {status}"
            )))
        }
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

fn build_embed(payload: &AlertPayload) -> Value {
    let (title, color) = match payload.severity {
        Severity::Alert => ("🚨 New wallet big bet (ALERT)", 0xFF0000),
        Severity::Warn => ("⚠️ Suspicious big bet (WARN)", 0xFFA500),
        Severity::Info => ("ℹ️ Big trade detected", 0x0099FF),
    };

    let description = format!(
        "**${:.2}** on **{}** @ **{:.2}**\nWallet age **{}d** (first seen {})",
        payload.notional_usd,
        payload.outcome,
        payload.price,
        payload.wallet_age_days,
        payload.first_seen_date,
    );

    json!({
        "title": title,
        "url": payload.market_url,
        "description": description,
        "color": color,
        "fields": [
            { "name": "Wallet", "value": format!("`{}`", payload.wallet_short), "inline": true },
            { "name": "Market", "value": truncate(&payload.market_title, 100), "inline": true },
            { "name": "Side", "value": format!("{} {}", payload.side, payload.outcome), "inline": true },
            { "name": "Bet Total", "value": format!("${:.2}", payload.notional_usd), "inline": true },
            { "name": "Bet Price", "value": format!("{:.2}", payload.price), "inline": true },
            { "name": "Wallet Age", "value": format!("{} days", payload.wallet_age_days), "inline": true },
            { "name": "Suspicion Score", "value": format!("{:.2}", payload.suspicion_score), "inline": true },
            { "name": "Score Breakdown", "value": truncate(&format_breakdown(&payload.breakdown), 1024), "inline": false },
            { "name": "Tx", "value": format!("`{}`", payload.tx_hash_short), "inline": true },
        ],
        "footer": {
            "text": format!(
                "Insider Monitor • {} • {}",
                payload.environment,
                payload.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            )
        },
        "timestamp": payload.timestamp.to_rfc3339(),
    })
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{cut}...")
}
