//! The trade-processing pipeline.
//!
//! Each poll cycle fetches a batch of large trades and runs every trade past
//! the checkpoint through: dedup, market resolution, category and temporal
//! filters, validation, wallet load-or-create, ledger updates, signal
//! gathering, scoring, and alert emission. Workers run concurrently; all
//! shared state lives in the database and is updated with atomic upserts.

pub mod clusters;
pub mod scoring;
pub mod winrate;

use crate::alerts::{AlertPayload, Sender};
use chrono::{TimeZone, Utc};
use dashmap::DashMap;
use insider_core::api::{DataClient, GammaClient, TradeQuery};
use insider_core::config::Config;
use insider_core::db::{positions::window_start, Store};
use insider_core::types::{
    AlertRecord, MarketInfo, MarketMapEntry, Severity, Trade, TradeRecord, TradeSide, Wallet,
};
use insider_core::{metrics, Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use scoring::{score_trade, severity_for, ScoreBreakdown, ScoreInputs};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Market categories that cannot plausibly involve insider information.
const EXCLUDED_CATEGORIES: &[&str] = &[
    "sports",
    "nfl",
    "nba",
    "mlb",
    "nhl",
    "soccer",
    "football",
    "basketball",
    "baseball",
    "hockey",
    "mma",
    "ufc",
    "boxing",
    "tennis",
    "golf",
    "racing",
    "f1",
    "nascar",
];

/// Batch size for each `/trades` poll.
const POLL_BATCH_LIMIT: u32 = 10_000;

pub struct Processor {
    pub(crate) cfg: Arc<Config>,
    pub(crate) store: Store,
    pub(crate) data: DataClient,
    pub(crate) gamma: GammaClient,
    sender: Arc<dyn Sender>,
    workers: Arc<Semaphore>,
    /// Per-address locks guarding the wallet create path only.
    wallet_locks: DashMap<String, Arc<Mutex<()>>>,
    pub(crate) shutdown: watch::Receiver<bool>,
}

impl Processor {
    pub fn new(
        cfg: Arc<Config>,
        store: Store,
        data: DataClient,
        gamma: GammaClient,
        sender: Arc<dyn Sender>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let workers = Arc::new(Semaphore::new(cfg.detection.wallet_lookup_workers.max(1)));
        Self {
            cfg,
            store,
            data,
            gamma,
            sender,
            workers,
            wallet_locks: DashMap::new(),
            shutdown,
        }
    }

    /// One poll cycle: fetch recent trades, dispatch everything past the
    /// checkpoint to the worker pool, then advance the checkpoint.
    pub async fn process_cycle(self: &Arc<Self>) -> Result<()> {
        let checkpoint = self.store.state.checkpoint().await?;

        let query = TradeQuery {
            limit: POLL_BATCH_LIMIT,
            taker_only: true,
            filter_type: "CASH".into(),
            filter_amount: self.cfg.detection.big_trade_usd,
            sort_by: "timestamp".into(),
            sort_direction: "DESC".into(),
            ..Default::default()
        };
        let trades = self.data.trades(&query).await?;

        info!(
            count = trades.len(),
            last_processed_ts = checkpoint,
            "Fetched trades from Data API"
        );

        let mut tasks = JoinSet::new();
        let mut shutdown = self.shutdown.clone();
        let mut cancelled = false;

        for trade in &trades {
            if trade.timestamp <= checkpoint {
                continue;
            }
            if *shutdown.borrow() {
                cancelled = true;
                break;
            }

            let permit = tokio::select! {
                permit = self.workers.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.changed() => {
                    cancelled = true;
                    break;
                }
            };

            let processor = Arc::clone(self);
            let trade = trade.clone();
            tasks.spawn(async move {
                let _permit = permit;
                if let Err(e) = processor.process_trade(&trade).await {
                    error!(
                        trade_hash = %trade.fingerprint(),
                        error = %e,
                        "Failed to process trade"
                    );
                }
            });
        }

        // Always drain in-flight workers, cancelled or not.
        while tasks.join_next().await.is_some() {}

        if cancelled {
            info!("Poll cycle cancelled; checkpoint left unchanged");
            return Ok(());
        }

        let max_ts = trades.iter().map(|t| t.timestamp).max().unwrap_or(0);
        if max_ts > checkpoint {
            self.store.state.set_checkpoint(max_ts).await?;
        }

        Ok(())
    }

    /// Run one trade through the full pipeline. Errors are logged and
    /// metered by the dispatcher; they never abort the cycle.
    pub async fn process_trade(&self, trade: &Trade) -> Result<()> {
        let started = Instant::now();
        match self.run_pipeline(trade).await {
            Ok(status) => {
                metrics::record_trade(status, started.elapsed());
                Ok(())
            }
            Err(e) => {
                metrics::record_trade_duration(started.elapsed());
                Err(e)
            }
        }
    }

    async fn run_pipeline(&self, trade: &Trade) -> Result<&'static str> {
        let trade_hash = trade.fingerprint();

        if self.store.trades.has_seen(&trade_hash).await? {
            return Ok("duplicate");
        }

        let market = self.resolve_market(trade).await?;

        if is_excluded_category(&market.category) {
            debug!(
                category = %market.category,
                condition_id = %trade.condition_id,
                title = %market.title,
                "Skipping sports/entertainment market"
            );
            return Ok("filtered_category");
        }

        let now = Utc::now().timestamp();
        let horizon_ts = now + self.cfg.detection.end_date_horizon_days * 86_400;
        if market.end_date > 0 && (trade.timestamp >= market.end_date || market.end_date > horizon_ts)
        {
            debug!(
                condition_id = %trade.condition_id,
                trade_time = trade.timestamp,
                end_date = market.end_date,
                "Skipping trade for ended or distant market"
            );
            return Ok("filtered_temporal");
        }

        // Validation failures drop the trade without recording the
        // fingerprint, so the next poll re-validates.
        let Some(side) = trade.parsed_side() else {
            warn!(side = %trade.side, "Invalid trade side, skipping");
            return Ok("invalid_side");
        };
        if trade.outcome.is_empty() {
            warn!(trade_hash = %trade_hash, "Missing trade outcome, skipping");
            return Ok("missing_outcome");
        }

        let notional = trade.notional();
        let notional_f64 = notional.to_f64().unwrap_or(0.0);
        if notional_f64 < self.cfg.detection.min_trade_usd {
            return Ok("filtered_size");
        }

        let wallet = match self.get_or_create_wallet(&trade.proxy_wallet, trade.timestamp).await {
            Ok(wallet) => wallet,
            Err(e) => {
                metrics::record_trade_status("wallet_lookup_error");
                return Err(e);
            }
        };

        // Observed before the counter increment below.
        let is_first_trade = wallet.total_trades == 0;
        let wallet_age_days = wallet.age_days(trade.timestamp);

        let hours_to_close = if market.end_date > 0 {
            (market.end_date - trade.timestamp) as f64 / 3_600.0
        } else {
            0.0
        };

        // The dedup barrier: the row insert is the first durable side
        // effect. A worker that loses this race stops here, which keeps
        // concurrent duplicate delivery idempotent.
        let record = TradeRecord {
            trade_hash: trade_hash.clone(),
            transaction_hash: trade.transaction_hash.clone(),
            condition_id: trade.condition_id.clone(),
            proxy_wallet: trade.proxy_wallet.clone(),
            timestamp_sec: trade.timestamp,
            notional_usd: notional,
            side: side.as_str().to_string(),
            outcome: trade.outcome.clone(),
            price: trade.price,
            created_ts: now,
        };
        match self.store.trades.insert(&record).await {
            Ok(true) => {}
            Ok(false) => return Ok("duplicate"),
            Err(e) => {
                metrics::record_trade_status("insert_error");
                return Err(e);
            }
        }

        if let Err(e) = self
            .store
            .wallets
            .record_trade(&trade.proxy_wallet, notional, trade.timestamp, now)
            .await
        {
            error!(wallet = %trade.proxy_wallet, error = %e, "Failed to update wallet totals");
            metrics::record_trade_status("wallet_update_error");
        }

        let signed_notional = match side {
            TradeSide::Buy => notional,
            TradeSide::Sell => -notional,
        };
        let window_start_ts =
            window_start(trade.timestamp, self.cfg.detection.net_position_window_hrs);
        if let Err(e) = self
            .store
            .positions
            .apply(
                &trade.proxy_wallet,
                &trade.condition_id,
                window_start_ts,
                signed_notional,
                now,
            )
            .await
        {
            error!(wallet = %trade.proxy_wallet, error = %e, "Failed to update net position");
            metrics::record_trade_status("net_position_error");
        }

        let inputs = self
            .gather_signals(
                trade,
                &trade_hash,
                &wallet,
                &market,
                notional,
                notional_f64,
                wallet_age_days,
                hours_to_close,
                is_first_trade,
            )
            .await;
        let breakdown = score_trade(&inputs, &self.cfg.detection);
        metrics::record_suspicion_score(breakdown.final_score);

        if wallet_age_days <= self.cfg.detection.new_wallet_days_max {
            let severity = severity_for(breakdown.final_score, &self.cfg.detection);
            if severity != Severity::Info {
                if let Err(e) = self
                    .emit_alert(trade, &wallet, &market, notional, wallet_age_days, severity, &breakdown)
                    .await
                {
                    error!(wallet = %trade.proxy_wallet, error = %e, "Failed to send alert");
                }
            }
        }

        Ok("success")
    }

    /// Gather every signal the scoring model reads. Signal-gathering
    /// failures degrade to neutral inputs; they never abort the trade.
    #[allow(clippy::too_many_arguments)]
    async fn gather_signals(
        &self,
        trade: &Trade,
        trade_hash: &str,
        wallet: &Wallet,
        market: &MarketInfo,
        notional: Decimal,
        notional_f64: f64,
        wallet_age_days: i64,
        hours_to_close: f64,
        is_first_trade: bool,
    ) -> ScoreInputs {
        let detection = &self.cfg.detection;

        let (win_rate, resolved_trades) = match self.store.wallets.get_stats(&trade.proxy_wallet).await
        {
            Ok(Some(stats)) => (stats.win_rate, stats.total_resolved_trades),
            Ok(None) => (0.0, 0),
            Err(e) => {
                warn!(wallet = %trade.proxy_wallet, error = %e, "Failed to get wallet stats");
                (0.0, 0)
            }
        };

        let funding_age_secs = wallet.funding_age_secs();
        let funding_age_minutes = funding_age_secs as f64 / 60.0;
        let funding_age_hours = funding_age_secs as f64 / 3_600.0;

        let first_trade_large = is_first_trade
            && notional_f64 >= detection.min_trade_usd
            && self.verify_first_trade(&trade.proxy_wallet, notional_f64).await;

        let liquidity_ratio = {
            let liquidity = market.liquidity.to_f64().unwrap_or(0.0);
            if liquidity > 0.0 {
                notional_f64 / liquidity
            } else {
                0.0
            }
        };

        let velocity_count = if detection.enable_velocity_detection {
            let lookback_ts = trade.timestamp - detection.velocity_window_minutes * 60;
            match self
                .store
                .trades
                .count_recent_for_wallet(&trade.proxy_wallet, lookback_ts, trade_hash)
                .await
            {
                Ok(count) => count + 1,
                Err(e) => {
                    warn!(wallet = %trade.proxy_wallet, error = %e, "Failed to check trade velocity");
                    0
                }
            }
        } else {
            0
        };

        let concentration = match self
            .net_position_concentration(trade, trade_hash, notional, trade.parsed_side())
            .await
        {
            Ok(ratio) => ratio,
            Err(e) => {
                warn!(wallet = %trade.proxy_wallet, error = %e, "Failed to check net position concentration");
                0.0
            }
        };

        let (cluster_id, cluster_wallet_count, coordinated) = if detection.enable_cluster_detection
        {
            let size = match self.cluster_size(&trade.proxy_wallet).await {
                Ok(size) => size,
                Err(e) => {
                    warn!(wallet = %trade.proxy_wallet, error = %e, "Failed to resolve funding cluster");
                    None
                }
            };
            let coordinated_cluster = match self.detect_coordinated(trade, trade_hash, notional).await
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(wallet = %trade.proxy_wallet, error = %e, "Failed to detect coordinated trade");
                    None
                }
            };
            let count = size.as_ref().map(|(_, count)| *count).unwrap_or(0);
            let id = coordinated_cluster
                .clone()
                .or_else(|| size.map(|(id, _)| id));
            (id, count, coordinated_cluster.is_some())
        } else {
            (None, 0, false)
        };

        ScoreInputs {
            notional: notional_f64,
            wallet_age_days,
            hours_to_close,
            win_rate,
            resolved_trades,
            first_trade_large,
            funding_age_minutes,
            funding_age_hours,
            liquidity_ratio,
            price: trade.price.to_f64().unwrap_or(0.0),
            concentration,
            velocity_count,
            cluster_wallet_count,
            coordinated,
            cluster_id,
        }
    }

    /// Confirm a first large trade against the activity API when the
    /// notional is suspicious enough to justify the extra request. An API
    /// failure falls back to the locally tracked flag.
    async fn verify_first_trade(&self, wallet: &str, notional: f64) -> bool {
        if notional < self.cfg.detection.min_trade_usd * 2.0 {
            return true;
        }

        match self.data.recent_activity(wallet, 10).await {
            Ok(events) => {
                let trade_count = events.iter().filter(|e| e.is_trade()).count();
                if trade_count <= 2 {
                    warn!(
                        wallet = %wallet,
                        notional = notional,
                        api_trade_count = trade_count,
                        "First trade is very large"
                    );
                    true
                } else {
                    false
                }
            }
            Err(e) => {
                debug!(wallet = %wallet, error = %e, "Activity verification failed, using local tracking");
                true
            }
        }
    }

    /// One-sidedness of the wallet's recent activity in this market:
    /// max(buy, sell) / (buy + sell) over the window, current trade included.
    async fn net_position_concentration(
        &self,
        trade: &Trade,
        trade_hash: &str,
        notional: Decimal,
        side: Option<TradeSide>,
    ) -> Result<f64> {
        let lookback_ts =
            trade.timestamp - self.cfg.detection.net_position_window_hrs * 3_600;
        let recent = self
            .store
            .trades
            .recent_for_wallet_market(&trade.proxy_wallet, &trade.condition_id, lookback_ts, trade_hash)
            .await?;

        let mut buy_volume = Decimal::ZERO;
        let mut sell_volume = Decimal::ZERO;
        for earlier in &recent {
            match TradeSide::parse(&earlier.side) {
                Some(TradeSide::Buy) => buy_volume += earlier.notional_usd,
                Some(TradeSide::Sell) => sell_volume += earlier.notional_usd,
                None => {}
            }
        }
        match side {
            Some(TradeSide::Buy) => buy_volume += notional,
            Some(TradeSide::Sell) => sell_volume += notional,
            None => {}
        }

        Ok(concentration_ratio(
            buy_volume.to_f64().unwrap_or(0.0),
            sell_volume.to_f64().unwrap_or(0.0),
        ))
    }

    async fn get_or_create_wallet(&self, address: &str, trade_ts: i64) -> Result<Wallet> {
        if let Some(wallet) = self.store.wallets.get(address).await? {
            return Ok(wallet);
        }

        // Serialize creation per address so concurrent workers neither
        // double-call the activity API nor race the insert.
        let lock = self
            .wallet_locks
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(wallet) = self.store.wallets.get(address).await? {
            return Ok(wallet);
        }

        let (first_seen_ts, funding_received_ts, funding_source) =
            match self.data.earliest_activity(address).await {
                Ok(Some(event)) => (event.timestamp, event.timestamp, event.from_address),
                Ok(None) => (trade_ts, 0, String::new()),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    warn!(
                        wallet = %address,
                        error = %e,
                        "Failed to get first activity, using trade timestamp"
                    );
                    (trade_ts, 0, String::new())
                }
            };

        let wallet = Wallet {
            address: address.to_string(),
            first_seen_ts,
            funding_received_ts,
            total_trades: 0,
            total_volume_usd: Decimal::ZERO,
            last_activity_ts: trade_ts,
            updated_ts: Utc::now().timestamp(),
        };
        self.store.wallets.insert_new(&wallet).await?;

        if !funding_source.is_empty() && self.cfg.detection.enable_cluster_detection {
            self.track_funding_source(address, &funding_source, funding_received_ts)
                .await;
        }

        Ok(wallet)
    }

    /// Resolve market metadata through the cache, falling back to the
    /// trade's own title and slug when the Gamma API has nothing.
    async fn resolve_market(&self, trade: &Trade) -> Result<MarketInfo> {
        let now = Utc::now().timestamp();

        if let Some(entry) = self.store.markets.get_map(&trade.condition_id).await? {
            if entry.is_fresh(now) {
                return Ok(entry.to_info());
            }
        }

        let fetched = match self.gamma.market_by_condition_id(&trade.condition_id).await {
            Ok(market) => market,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                warn!(condition_id = %trade.condition_id, error = %e, "Failed to resolve market");
                None
            }
        };

        let Some(market) = fetched else {
            return Ok(fallback_market_info(trade));
        };

        let entry = MarketMapEntry {
            condition_id: trade.condition_id.clone(),
            market_slug: market.slug.clone(),
            market_title: market.question.clone(),
            market_url: format!("https://polymarket.com/market/{}", market.slug),
            category: market.category.clone(),
            end_date: market.end_date_ts().unwrap_or(0),
            volume_num: market.volume_num,
            liquidity_num: market.liquidity_num,
            is_active: market.active,
            updated_ts: now,
        };
        if let Err(e) = self.store.markets.upsert_map(&entry).await {
            error!(condition_id = %trade.condition_id, error = %e, "Failed to cache market map");
        }

        Ok(entry.to_info())
    }

    #[allow(clippy::too_many_arguments)]
    async fn emit_alert(
        &self,
        trade: &Trade,
        wallet: &Wallet,
        market: &MarketInfo,
        notional: Decimal,
        wallet_age_days: i64,
        severity: Severity,
        breakdown: &ScoreBreakdown,
    ) -> Result<()> {
        if *self.shutdown.borrow() {
            debug!(wallet = %wallet.address, "Skipping alert during shutdown");
            return Ok(());
        }

        let now = Utc::now().timestamp();

        let cooldown_secs = self.cfg.detection.alert_cooldown_mins * 60;
        if let Some(last_ts) = self.store.alerts.last_alert_ts(&wallet.address).await? {
            if now - last_ts < cooldown_secs {
                info!(wallet = %wallet.address, "Alert suppressed (cooldown)");
                metrics::record_alert_suppressed();
                return Ok(());
            }
        }

        let record = AlertRecord {
            alert_type: severity.as_str().to_string(),
            wallet_address: wallet.address.clone(),
            condition_id: trade.condition_id.clone(),
            market_title: market.title.clone(),
            market_slug: market.slug.clone(),
            market_url: market.url.clone(),
            side: trade.side.clone(),
            outcome: trade.outcome.clone(),
            notional_usd: notional,
            price: trade.price,
            wallet_age_days,
            suspicion_score: Decimal::from_f64_retain(breakdown.final_score)
                .unwrap_or(Decimal::ZERO)
                .round_dp(6),
            transaction_hash: trade.transaction_hash.clone(),
            trade_timestamp_sec: trade.timestamp,
            created_ts: now,
        };
        self.store.alerts.insert(&record).await?;

        metrics::record_alert_triggered(severity.as_str());

        let payload = AlertPayload {
            severity,
            wallet_address: wallet.address.clone(),
            wallet_short: crate::alerts::shorten_address(&wallet.address),
            market_title: market.title.clone(),
            market_url: market.url.clone(),
            side: trade.side.clone(),
            outcome: trade.outcome.clone(),
            notional_usd: notional.to_f64().unwrap_or(0.0),
            price: trade.price.to_f64().unwrap_or(0.0),
            wallet_age_days,
            first_seen_date: Utc
                .timestamp_opt(wallet.first_seen_ts, 0)
                .single()
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            suspicion_score: breakdown.final_score,
            breakdown: breakdown.clone(),
            transaction_hash: trade.transaction_hash.clone(),
            tx_hash_short: crate::alerts::shorten_hash(&trade.transaction_hash),
            timestamp: Utc
                .timestamp_opt(trade.timestamp, 0)
                .single()
                .unwrap_or_else(Utc::now),
            environment: self.cfg.environment.clone(),
        };

        self.sender.send(&payload).await
    }
}

/// Case-insensitive substring match against the excluded category tokens.
fn is_excluded_category(category: &str) -> bool {
    if category.is_empty() {
        return false;
    }
    let lowered = category.to_lowercase();
    EXCLUDED_CATEGORIES.iter().any(|token| lowered.contains(token))
}

fn fallback_market_info(trade: &Trade) -> MarketInfo {
    if trade.slug.is_empty() {
        MarketInfo {
            title: trade.title.clone(),
            slug: String::new(),
            url: format!("https://polymarket.com/search?q={}", trade.condition_id),
            ..Default::default()
        }
    } else {
        MarketInfo {
            title: trade.title.clone(),
            slug: trade.slug.clone(),
            url: format!("https://polymarket.com/market/{}", trade.slug),
            ..Default::default()
        }
    }
}

fn concentration_ratio(buy_volume: f64, sell_volume: f64) -> f64 {
    let total = buy_volume + sell_volume;
    if total == 0.0 {
        return 0.0;
    }
    buy_volume.max(sell_volume) / total
}
