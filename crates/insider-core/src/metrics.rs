//! Prometheus metrics for the insider monitor.

use once_cell::sync::Lazy;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| Arc::new(Metrics::new()));

pub struct Metrics {
    registry: Registry,

    pub trades_processed: IntCounterVec,
    pub trade_processing_duration: Histogram,

    pub alerts_triggered: IntCounterVec,
    pub alerts_sent: IntCounterVec,
    pub alerts_suppressed: IntCounter,

    pub api_requests: IntCounterVec,
    pub api_request_duration: HistogramVec,

    pub db_queries: IntCounterVec,

    pub win_rate_runs: IntCounter,
    pub win_rate_run_duration: Histogram,
    pub markets_resolved: IntCounter,

    pub suspicion_scores: Histogram,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let trades_processed = IntCounterVec::new(
            Opts::new(
                "insider_trades_processed_total",
                "Trades processed, by outcome status",
            ),
            &["status"],
        )
        .unwrap();
        registry.register(Box::new(trades_processed.clone())).unwrap();

        let trade_processing_duration = Histogram::with_opts(HistogramOpts::new(
            "insider_trade_processing_duration_seconds",
            "Duration of per-trade pipeline runs",
        ))
        .unwrap();
        registry
            .register(Box::new(trade_processing_duration.clone()))
            .unwrap();

        let alerts_triggered = IntCounterVec::new(
            Opts::new("insider_alerts_triggered_total", "Alerts triggered, by severity"),
            &["severity"],
        )
        .unwrap();
        registry.register(Box::new(alerts_triggered.clone())).unwrap();

        let alerts_sent = IntCounterVec::new(
            Opts::new("insider_alerts_sent_total", "Alert deliveries, by status and sink"),
            &["status", "sink"],
        )
        .unwrap();
        registry.register(Box::new(alerts_sent.clone())).unwrap();

        let alerts_suppressed = IntCounter::with_opts(Opts::new(
            "insider_alerts_suppressed_total",
            "Alerts suppressed by the per-wallet cooldown",
        ))
        .unwrap();
        registry.register(Box::new(alerts_suppressed.clone())).unwrap();

        let api_requests = IntCounterVec::new(
            Opts::new(
                "insider_api_requests_total",
                "Upstream API requests, by api, endpoint, and status",
            ),
            &["api", "endpoint", "status"],
        )
        .unwrap();
        registry.register(Box::new(api_requests.clone())).unwrap();

        let api_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "insider_api_request_duration_seconds",
                "Duration of upstream API requests",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["api", "endpoint"],
        )
        .unwrap();
        registry
            .register(Box::new(api_request_duration.clone()))
            .unwrap();

        let db_queries = IntCounterVec::new(
            Opts::new(
                "insider_database_queries_total",
                "Database queries, by operation and status",
            ),
            &["operation", "status"],
        )
        .unwrap();
        registry.register(Box::new(db_queries.clone())).unwrap();

        let win_rate_runs = IntCounter::with_opts(Opts::new(
            "insider_win_rate_runs_total",
            "Win-rate reconciliation runs",
        ))
        .unwrap();
        registry.register(Box::new(win_rate_runs.clone())).unwrap();

        let win_rate_run_duration = Histogram::with_opts(
            HistogramOpts::new(
                "insider_win_rate_run_duration_seconds",
                "Duration of win-rate reconciliation runs",
            )
            .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        )
        .unwrap();
        registry
            .register(Box::new(win_rate_run_duration.clone()))
            .unwrap();

        let markets_resolved = IntCounter::with_opts(Opts::new(
            "insider_markets_resolved_total",
            "Markets resolved by the reconciler",
        ))
        .unwrap();
        registry.register(Box::new(markets_resolved.clone())).unwrap();

        let suspicion_scores = Histogram::with_opts(
            HistogramOpts::new(
                "insider_suspicion_scores",
                "Distribution of computed suspicion scores",
            )
            .buckets(vec![
                100.0, 500.0, 1_000.0, 5_000.0, 10_000.0, 25_000.0, 50_000.0, 100_000.0,
                250_000.0, 500_000.0, 1_000_000.0, 5_000_000.0,
            ]),
        )
        .unwrap();
        registry.register(Box::new(suspicion_scores.clone())).unwrap();

        Self {
            registry,
            trades_processed,
            trade_processing_duration,
            alerts_triggered,
            alerts_sent,
            alerts_suppressed,
            api_requests,
            api_request_duration,
            db_queries,
            win_rate_runs,
            win_rate_run_duration,
            markets_resolved,
            suspicion_scores,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Global metrics instance.
pub fn metrics() -> Arc<Metrics> {
    METRICS.clone()
}

/// Render the registry in Prometheus text exposition format.
pub fn gather() -> String {
    TextEncoder::new()
        .encode_to_string(&metrics().registry().gather())
        .unwrap_or_default()
}

pub fn record_trade(status: &str, duration: Duration) {
    let m = metrics();
    m.trades_processed.with_label_values(&[status]).inc();
    m.trade_processing_duration.observe(duration.as_secs_f64());
}

pub fn record_trade_status(status: &str) {
    metrics().trades_processed.with_label_values(&[status]).inc();
}

pub fn record_trade_duration(duration: Duration) {
    metrics().trade_processing_duration.observe(duration.as_secs_f64());
}

pub fn record_alert_triggered(severity: &str) {
    metrics().alerts_triggered.with_label_values(&[severity]).inc();
}

pub fn record_alert_sent(sink: &str, ok: bool) {
    let status = if ok { "success" } else { "error" };
    metrics().alerts_sent.with_label_values(&[status, sink]).inc();
}

pub fn record_alert_suppressed() {
    metrics().alerts_suppressed.inc();
}

pub fn record_api_request(api: &str, endpoint: &str, ok: bool, duration: Duration) {
    let m = metrics();
    let status = if ok { "success" } else { "error" };
    m.api_requests.with_label_values(&[api, endpoint, status]).inc();
    m.api_request_duration
        .with_label_values(&[api, endpoint])
        .observe(duration.as_secs_f64());
}

pub fn record_db_query(operation: &str, ok: bool) {
    let status = if ok { "success" } else { "error" };
    metrics()
        .db_queries
        .with_label_values(&[operation, status])
        .inc();
}

pub fn record_win_rate_run(duration: Duration, markets_resolved: u64) {
    let m = metrics();
    m.win_rate_runs.inc();
    m.markets_resolved.inc_by(markets_resolved);
    m.win_rate_run_duration.observe(duration.as_secs_f64());
}

pub fn record_suspicion_score(score: f64) {
    metrics().suspicion_scores.observe(score);
}
