//! Polymarket Gamma API client (market metadata). Public, no auth.

use crate::config::GammaApiConfig;
use crate::metrics;
use crate::ratelimit::RateLimiter;
use crate::types::GammaMarket;
use crate::{Error, Result};
use std::time::{Duration, Instant};
use tokio::sync::watch;

pub struct GammaClient {
    base_url: String,
    http: reqwest::Client,
    limiter: RateLimiter,
}

impl GammaClient {
    pub fn new(cfg: &GammaApiConfig, shutdown: watch::Receiver<bool>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(super::HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            http,
            limiter: RateLimiter::new(cfg.markets_rps, shutdown),
        })
    }

    /// Fetch market details by condition id. Returns `None` when the API
    /// reports no market for the id.
    pub async fn market_by_condition_id(&self, condition_id: &str) -> Result<Option<GammaMarket>> {
        self.limiter.acquire().await?;

        let url = format!("{}/markets", self.base_url);
        let started = Instant::now();
        let result = self
            .fetch_market(self.http.get(&url).query(&[("condition_ids", condition_id)]))
            .await;
        metrics::record_api_request("gamma", "/markets", result.is_ok(), started.elapsed());
        result
    }

    /// Fetch market details by slug.
    pub async fn market_by_slug(&self, slug: &str) -> Result<Option<GammaMarket>> {
        self.limiter.acquire().await?;

        let url = format!("{}/markets/slug/{}", self.base_url, urlencode(slug));
        let started = Instant::now();
        let result = self.fetch_market(self.http.get(&url)).await;
        metrics::record_api_request("gamma", "/markets/slug", result.is_ok(), started.elapsed());
        result
    }

    /// Fetch market details by numeric market id.
    pub async fn market_by_id(&self, id: &str) -> Result<Option<GammaMarket>> {
        self.limiter.acquire().await?;

        let url = format!("{}/markets/{}", self.base_url, urlencode(id));
        let started = Instant::now();
        let result = self.fetch_market(self.http.get(&url)).await;
        metrics::record_api_request("gamma", "/markets/id", result.is_ok(), started.elapsed());
        result
    }

    async fn fetch_market(&self, request: reqwest::RequestBuilder) -> Result<Option<GammaMarket>> {
        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                message: format!("unexpected status {status}: {body}"),
                status: Some(status.as_u16()),
            });
        }

        let body = response.bytes().await?;
        Ok(decode_market(&body)?)
    }
}

/// The Gamma API answers with either a single market object or an array of
/// markets depending on the endpoint; accept both.
fn decode_market(body: &[u8]) -> Result<Option<GammaMarket>> {
    if let Ok(markets) = serde_json::from_slice::<Vec<GammaMarket>>(body) {
        return Ok(markets.into_iter().next());
    }

    let market = serde_json::from_slice::<GammaMarket>(body)?;
    Ok(Some(market))
}

fn urlencode(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') {
                c.to_string()
            } else {
                c.to_string()
                    .bytes()
                    .map(|b| format!("%{b:02X}"))
                    .collect()
            }
        })
        .collect()
}
