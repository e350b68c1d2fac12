//! Polymarket Data API client (trades and wallet activity).

use crate::config::{AuthMode, DataApiConfig};
use crate::metrics;
use crate::ratelimit::RateLimiter;
use crate::types::{ActivityEvent, Trade};
use crate::{Error, Result};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Query parameters for `GET /trades`.
#[derive(Debug, Clone, Default)]
pub struct TradeQuery {
    pub limit: u32,
    pub offset: u32,
    pub taker_only: bool,
    /// `CASH` for notional-based filtering.
    pub filter_type: String,
    /// USD floor applied server-side.
    pub filter_amount: f64,
    pub market: String,
    pub user: String,
    pub side: String,
    pub sort_by: String,
    pub sort_direction: String,
}

impl TradeQuery {
    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if self.limit > 0 {
            params.push(("limit", self.limit.to_string()));
        }
        if self.offset > 0 {
            params.push(("offset", self.offset.to_string()));
        }
        if self.taker_only {
            params.push(("takerOnly", "true".to_string()));
        }
        if !self.filter_type.is_empty() {
            params.push(("filterType", self.filter_type.clone()));
        }
        if self.filter_amount > 0.0 {
            params.push(("filterAmount", format!("{:.2}", self.filter_amount)));
        }
        if !self.market.is_empty() {
            params.push(("market", self.market.clone()));
        }
        if !self.user.is_empty() {
            params.push(("user", self.user.clone()));
        }
        if !self.side.is_empty() {
            params.push(("side", self.side.clone()));
        }
        if !self.sort_by.is_empty() {
            params.push(("sortBy", self.sort_by.clone()));
        }
        if !self.sort_direction.is_empty() {
            params.push(("sortDirection", self.sort_direction.clone()));
        }
        params
    }
}

/// Client for the Data API, with per-endpoint rate limiting.
pub struct DataClient {
    base_url: String,
    http: reqwest::Client,
    auth_mode: AuthMode,
    bearer_token: String,
    api_key: String,
    extra_headers: Vec<(String, String)>,
    trades_limiter: RateLimiter,
    activity_limiter: RateLimiter,
}

impl DataClient {
    pub fn new(cfg: &DataApiConfig, shutdown: watch::Receiver<bool>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(super::HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            http,
            auth_mode: cfg.auth_mode,
            bearer_token: cfg.bearer_token.clone(),
            api_key: cfg.api_key.clone(),
            extra_headers: cfg
                .extra_headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            trades_limiter: RateLimiter::new(cfg.trades_rps, shutdown.clone()),
            activity_limiter: RateLimiter::new(cfg.activity_rps, shutdown),
        })
    }

    /// Fetch a batch of recent trades.
    pub async fn trades(&self, query: &TradeQuery) -> Result<Vec<Trade>> {
        self.trades_limiter.acquire().await?;

        let url = format!("{}/trades", self.base_url);
        let started = Instant::now();
        let result = self.execute_json::<Vec<Trade>>(&url, &query.to_params()).await;
        metrics::record_api_request("data", "/trades", result.is_ok(), started.elapsed());
        result
    }

    /// Fetch the wallet's earliest recorded activity event, if any.
    pub async fn earliest_activity(&self, wallet: &str) -> Result<Option<ActivityEvent>> {
        let events = self.activity(wallet, "ASC", 1).await?;
        Ok(events.into_iter().next())
    }

    /// Fetch the wallet's most recent activity events.
    pub async fn recent_activity(&self, wallet: &str, limit: u32) -> Result<Vec<ActivityEvent>> {
        self.activity(wallet, "DESC", limit).await
    }

    async fn activity(
        &self,
        wallet: &str,
        direction: &str,
        limit: u32,
    ) -> Result<Vec<ActivityEvent>> {
        self.activity_limiter.acquire().await?;

        let url = format!("{}/activity", self.base_url);
        let params = vec![
            ("user", wallet.to_string()),
            ("sortBy", "timestamp".to_string()),
            ("sortDirection", direction.to_string()),
            ("limit", limit.to_string()),
        ];
        let started = Instant::now();
        let result = self.execute_json::<Vec<ActivityEvent>>(&url, &params).await;
        metrics::record_api_request("data", "/activity", result.is_ok(), started.elapsed());
        result
    }

    async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<T> {
        let mut request = self.http.get(url).query(params);
        request = self.apply_auth(request);

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Api {
                message: format!(
                    "401 Unauthorized (auth_mode={}) - check credentials",
                    self.auth_mode
                ),
                status: Some(401),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                message: format!("unexpected status {status}: {body}"),
                status: Some(status.as_u16()),
            });
        }

        Ok(response.json().await?)
    }

    fn apply_auth(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_mode {
            AuthMode::Bearer => {
                request = request.bearer_auth(&self.bearer_token);
            }
            AuthMode::ApiKey => {
                request = request.header("X-API-KEY", &self.api_key);
            }
            AuthMode::None => {}
        }
        for (key, value) in &self.extra_headers {
            request = request.header(key, value);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_query_omits_empty_fields() {
        let query = TradeQuery {
            limit: 10_000,
            taker_only: true,
            filter_type: "CASH".into(),
            filter_amount: 10_000.0,
            sort_by: "timestamp".into(),
            sort_direction: "DESC".into(),
            ..Default::default()
        };
        let params = query.to_params();

        assert!(params.contains(&("limit", "10000".to_string())));
        assert!(params.contains(&("takerOnly", "true".to_string())));
        assert!(params.contains(&("filterType", "CASH".to_string())));
        assert!(params.contains(&("filterAmount", "10000.00".to_string())));
        assert!(params.contains(&("sortDirection", "DESC".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "market" || *k == "user"));
    }

    #[test]
    fn trade_query_includes_optional_filters() {
        let query = TradeQuery {
            market: "0xcond".into(),
            user: "0xwallet".into(),
            side: "BUY".into(),
            ..Default::default()
        };
        let params = query.to_params();

        assert!(params.contains(&("market", "0xcond".to_string())));
        assert!(params.contains(&("user", "0xwallet".to_string())));
        assert!(params.contains(&("side", "BUY".to_string())));
    }
}
