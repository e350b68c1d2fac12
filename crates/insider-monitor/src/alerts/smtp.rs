//! SMTP alert sink (plain-text email via lettre).

use super::{format_breakdown, AlertPayload, Sender};
use async_trait::async_trait;
use chrono::Utc;
use insider_core::config::SmtpConfig;
use insider_core::{Error, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

pub struct SmtpSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl SmtpSender {
    pub fn new(cfg: &SmtpConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .map_err(|e| Error::Config(format!("SMTP relay {}: {e}", cfg.host)))?
            .port(cfg.port)
            .timeout(Some(Duration::from_secs(10)));

        if !cfg.user.is_empty() {
            builder = builder.credentials(Credentials::new(cfg.user.clone(), cfg.password.clone()));
        }

        let from = cfg
            .from
            .parse()
            .map_err(|e| Error::Config(format!("SMTP_FROM {}: {e}", cfg.from)))?;
        let to = cfg
            .to
            .iter()
            .map(|addr| {
                addr.parse()
                    .map_err(|e| Error::Config(format!("SMTP_TO {addr}: {e}")))
            })
            .collect::<Result<Vec<Mailbox>>>()?;
        if to.is_empty() {
            return Err(Error::Config("SMTP_TO must list at least one recipient".into()));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
            to,
        })
    }
}

#[async_trait]
impl Sender for SmtpSender {
    async fn send(&self, payload: &AlertPayload) -> Result<()> {
        let subject = format!(
            "[{}] Suspicious trade: ${:.2} on {}",
            payload.severity, payload.notional_usd, payload.market_title
        );
        let body = build_email_body(payload);

        for recipient in &self.to {
            let message = Message::builder()
                .from(self.from.clone())
                .to(recipient.clone())
                .subject(&subject)
                .header(ContentType::TEXT_PLAIN)
                .body(body.clone())
                .map_err(|e| Error::AlertDelivery(format!("build email: {e}")))?;

            self.mailer
                .send(message)
                .await
                .map_err(|e| Error::AlertDelivery(format!("send email: {e}")))?;
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

fn build_email_body(payload: &AlertPayload) -> String {
    let mut body = format!("INSIDER MONITOR ALERT - {}\n", payload.severity);
    body.push_str("=======================================\n\n");
    body.push_str("A suspicious trade has been detected:\n\n");
    body.push_str("TRADE DETAILS\n");
    body.push_str("---------------------------------------\n");
    body.push_str(&format!("Notional:        ${:.2}\n", payload.notional_usd));
    body.push_str(&format!("Side:            {} {}\n", payload.side, payload.outcome));
    body.push_str(&format!("Price:           {:.2}\n", payload.price));
    body.push_str(&format!("Market:          {}\n", payload.market_title));
    body.push_str(&format!("Market URL:      {}\n\n", payload.market_url));
    body.push_str("WALLET DETAILS\n");
    body.push_str("---------------------------------------\n");
    body.push_str(&format!("Address:         {}\n", payload.wallet_address));
    body.push_str(&format!(
        "Age:             {} days (first seen {})\n",
        payload.wallet_age_days, payload.first_seen_date
    ));
    body.push_str(&format!("Suspicion Score: {:.2}\n\n", payload.suspicion_score));
    body.push_str("SCORE CALCULATION\n");
    body.push_str("---------------------------------------\n");
    body.push_str(&format_breakdown(&payload.breakdown));
    body.push_str("\n\nTRANSACTION\n");
    body.push_str("---------------------------------------\n");
    body.push_str(&format!("Hash:            {}\n", payload.transaction_hash));
    body.push_str(&format!("Time:            {}\n\n", payload.timestamp.to_rfc3339()));
    body.push_str("=======================================\n");
    body.push_str(&format!("Environment: {}\n", payload.environment));
    body.push_str(&format!(
        "Generated: {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    body.push_str("\nNote: This system detects suspicious behavior;\n");
    body.push_str("it does NOT prove insider trading.\n");
    body
}
