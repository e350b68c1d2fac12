//! Structured-log alert sink.

use super::{format_breakdown, AlertPayload, Sender};
use async_trait::async_trait;
use insider_core::Result;
use tracing::info;

pub struct LogSender;

impl LogSender {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sender for LogSender {
    async fn send(&self, payload: &AlertPayload) -> Result<()> {
        info!(
            severity = %payload.severity,
            wallet = %payload.wallet_short,
            market = %payload.market_title,
            side = %payload.side,
            outcome = %payload.outcome,
            notional_usd = payload.notional_usd,
            price = payload.price,
            wallet_age_days = payload.wallet_age_days,
            suspicion_score = payload.suspicion_score,
            tx_hash = %payload.tx_hash_short,
            score_breakdown = %format_breakdown(&payload.breakdown),
            "Alert generated"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
