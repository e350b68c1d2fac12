//! Suspicion scoring.
//!
//! The score is a pure function of the gathered inputs and the detection
//! config: identical inputs always produce an identical score and breakdown.
//! Every multiplier is >= 1, and a trade that matches no signal scores
//! exactly `base * time_to_close`.

use insider_core::config::DetectionConfig;
use insider_core::types::Severity;

/// Everything the scoring function reads. Gathered by the pipeline before
/// scoring; no I/O happens past this point.
#[derive(Debug, Clone, Default)]
pub struct ScoreInputs {
    pub notional: f64,
    pub wallet_age_days: i64,
    /// Hours until the market closes; zero or negative when unknown.
    pub hours_to_close: f64,
    pub win_rate: f64,
    pub resolved_trades: i64,
    /// First trade of the wallet, observed before the counter increment,
    /// and large enough to clear the notional floor.
    pub first_trade_large: bool,
    pub funding_age_minutes: f64,
    pub funding_age_hours: f64,
    /// notional / market liquidity; zero when liquidity is unknown.
    pub liquidity_ratio: f64,
    pub price: f64,
    /// One-sidedness of the wallet's window position in this market.
    pub concentration: f64,
    /// Trades in the velocity window, inclusive of the current one.
    pub velocity_count: i64,
    pub cluster_wallet_count: i64,
    pub coordinated: bool,
    pub cluster_id: Option<String>,
}

/// The multipliers actually applied, plus the context needed to display them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub base_score: f64,
    pub time_to_close: f64,
    pub win_rate: f64,
    pub first_trade_large: f64,
    pub flash_funding: f64,
    pub liquidity: f64,
    pub price_confidence: f64,
    pub concentration: f64,
    pub velocity: f64,
    pub cluster: f64,
    pub coordinated: f64,
    pub funding_age: f64,
    pub final_score: f64,

    pub win_rate_value: f64,
    pub resolved_trades: i64,
    pub funding_age_hours: f64,
    pub hours_to_close: f64,
    pub liquidity_ratio: f64,
    pub net_concentration: f64,
    pub velocity_count: i64,
    pub cluster_id: Option<String>,
    pub is_coordinated: bool,
}

/// Compute the suspicion score.
///
/// The base and time-to-close multiplier always apply. The signal
/// multipliers only apply while the wallet is inside the new-wallet window;
/// older wallets still get a score (for metrics) but never alert.
pub fn score_trade(inputs: &ScoreInputs, cfg: &DetectionConfig) -> ScoreBreakdown {
    let base = inputs.notional / inputs.wallet_age_days.max(1) as f64;
    let ttc = time_to_close_multiplier(inputs.hours_to_close, cfg.time_to_close_hours_max);

    let mut breakdown = ScoreBreakdown {
        base_score: base,
        time_to_close: ttc,
        win_rate: 1.0,
        first_trade_large: 1.0,
        flash_funding: 1.0,
        liquidity: 1.0,
        price_confidence: 1.0,
        concentration: 1.0,
        velocity: 1.0,
        cluster: 1.0,
        coordinated: 1.0,
        funding_age: 1.0,
        final_score: 0.0,

        win_rate_value: inputs.win_rate,
        resolved_trades: inputs.resolved_trades,
        funding_age_hours: inputs.funding_age_hours,
        hours_to_close: inputs.hours_to_close,
        liquidity_ratio: inputs.liquidity_ratio,
        net_concentration: inputs.concentration,
        velocity_count: inputs.velocity_count,
        cluster_id: inputs.cluster_id.clone(),
        is_coordinated: inputs.coordinated,
    };

    let mut score = base * ttc;

    if inputs.wallet_age_days <= cfg.new_wallet_days_max {
        if inputs.resolved_trades >= 5 && inputs.win_rate >= cfg.min_win_rate_threshold {
            breakdown.win_rate = 1.0 + inputs.win_rate;
            score *= breakdown.win_rate;
        }

        if inputs.first_trade_large {
            breakdown.first_trade_large = 2.0;
            score *= breakdown.first_trade_large;
        }

        if inputs.funding_age_minutes > 0.0 && inputs.funding_age_minutes <= 5.0 {
            breakdown.flash_funding = 3.0;
            score *= breakdown.flash_funding;
        }

        breakdown.liquidity = liquidity_multiplier(inputs.liquidity_ratio);
        score *= breakdown.liquidity;

        if inputs.price >= 0.85 || inputs.price <= 0.15 {
            breakdown.price_confidence = 1.5;
            score *= breakdown.price_confidence;
        }

        if inputs.concentration > 0.90 {
            breakdown.concentration = 1.5;
            score *= breakdown.concentration;
        }

        breakdown.velocity = velocity_multiplier(inputs.velocity_count, cfg.velocity_threshold);
        score *= breakdown.velocity;

        breakdown.cluster = cluster_multiplier(inputs.cluster_wallet_count);
        score *= breakdown.cluster;

        if inputs.coordinated {
            breakdown.coordinated = 2.0;
            score *= breakdown.coordinated;
        }

        if inputs.funding_age_hours > 0.0 && inputs.funding_age_hours <= 24.0 {
            breakdown.funding_age = 1.0 + (24.0 - inputs.funding_age_hours) / 24.0 * 1.5;
            score *= breakdown.funding_age;
        }
    }

    breakdown.final_score = score;
    breakdown
}

/// 1 at the horizon, rising toward 5 as the close approaches.
fn time_to_close_multiplier(hours_to_close: f64, max_hours: f64) -> f64 {
    if hours_to_close > 0.0 && hours_to_close <= max_hours {
        1.0 + (max_hours - hours_to_close) / max_hours * 4.0
    } else {
        1.0
    }
}

fn liquidity_multiplier(ratio: f64) -> f64 {
    if ratio >= 0.50 {
        3.0
    } else if ratio >= 0.20 {
        2.0
    } else if ratio >= 0.10 {
        1.5
    } else if ratio >= 0.05 {
        1.2
    } else {
        1.0
    }
}

fn velocity_multiplier(count: i64, threshold: i64) -> f64 {
    if threshold <= 0 || count < threshold {
        return 1.0;
    }
    if count >= 10 {
        3.0
    } else if count >= 5 {
        2.0
    } else {
        1.5
    }
}

/// Cluster-size multiplier: bigger funding clusters are more suspicious.
pub fn cluster_multiplier(wallet_count: i64) -> f64 {
    if wallet_count >= 10 {
        3.0
    } else if wallet_count >= 5 {
        2.0
    } else if wallet_count >= 2 {
        1.5
    } else {
        1.0
    }
}

/// Classify a final score against the configured thresholds.
pub fn severity_for(score: f64, cfg: &DetectionConfig) -> Severity {
    if score >= cfg.score_alert {
        Severity::Alert
    } else if score >= cfg.score_warn {
        Severity::Warn
    } else {
        Severity::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn detection_config() -> DetectionConfig {
        DetectionConfig::default()
    }

    fn assert_close(actual: f64, expected: f64) {
        let tolerance = (expected.abs() * 0.001).max(0.01);
        assert!(
            (actual - expected).abs() <= tolerance,
            "got {actual}, want {expected}"
        );
    }

    fn quiet_inputs(notional: f64, age_days: i64, hours_to_close: f64) -> ScoreInputs {
        ScoreInputs {
            notional,
            wallet_age_days: age_days,
            hours_to_close,
            ..Default::default()
        }
    }

    #[test]
    fn base_score_divides_by_wallet_age() {
        let cfg = detection_config();
        let b = score_trade(&quiet_inputs(50_000.0, 2, 100.0), &cfg);
        assert_close(b.final_score, 25_000.0);
        assert_close(b.base_score, 25_000.0);
        assert_eq!(b.time_to_close, 1.0);
    }

    #[test]
    fn zero_day_wallet_is_clamped_to_one() {
        let cfg = detection_config();
        let b = score_trade(&quiet_inputs(50_000.0, 0, 100.0), &cfg);
        assert_close(b.final_score, 50_000.0);
    }

    #[test]
    fn time_to_close_table() {
        let cases = [
            (1.0, 122_916.67),
            (24.0, 75_000.0),
            (48.0, 25_000.0),
            (12.0, 100_000.0),
            (-10.0, 25_000.0),
            (100.0, 25_000.0),
        ];
        let cfg = detection_config();
        for (hours, expected) in cases {
            let b = score_trade(&quiet_inputs(50_000.0, 2, hours), &cfg);
            assert_close(b.final_score, expected);
        }
    }

    #[test]
    fn last_minute_large_trade_on_fresh_wallet() {
        let cfg = detection_config();
        let b = score_trade(&quiet_inputs(100_000.0, 1, 0.5), &cfg);
        assert_close(b.final_score, 495_833.33);
    }

    #[test]
    fn old_wallet_scores_base_only() {
        // Signals present, but the wallet is past the new-wallet window.
        let cfg = detection_config();
        let inputs = ScoreInputs {
            notional: 10_000.0,
            wallet_age_days: 30,
            hours_to_close: 100.0,
            win_rate: 0.9,
            resolved_trades: 20,
            first_trade_large: true,
            liquidity_ratio: 0.6,
            price: 0.95,
            ..Default::default()
        };
        let b = score_trade(&inputs, &cfg);
        assert_close(b.final_score, 333.33);
        assert_eq!(b.win_rate, 1.0);
        assert_eq!(b.liquidity, 1.0);
    }

    #[test]
    fn win_rate_needs_five_resolved_trades() {
        let cfg = detection_config();
        let mut inputs = quiet_inputs(10_000.0, 1, 100.0);
        inputs.win_rate = 0.80;
        inputs.resolved_trades = 4;
        assert_close(score_trade(&inputs, &cfg).final_score, 10_000.0);

        inputs.resolved_trades = 5;
        assert_close(score_trade(&inputs, &cfg).final_score, 18_000.0);
    }

    #[test]
    fn win_rate_below_threshold_does_not_apply() {
        let cfg = detection_config();
        let mut inputs = quiet_inputs(10_000.0, 1, 100.0);
        inputs.win_rate = 0.74;
        inputs.resolved_trades = 20;
        assert_close(score_trade(&inputs, &cfg).final_score, 10_000.0);

        inputs.win_rate = 0.75;
        assert_close(score_trade(&inputs, &cfg).final_score, 17_500.0);
    }

    #[test]
    fn first_trade_large_doubles() {
        let cfg = detection_config();
        let mut inputs = quiet_inputs(10_000.0, 1, 100.0);
        inputs.first_trade_large = true;
        assert_close(score_trade(&inputs, &cfg).final_score, 20_000.0);
    }

    #[test]
    fn flash_funding_triples_within_five_minutes() {
        let cfg = detection_config();
        let mut inputs = quiet_inputs(10_000.0, 1, 100.0);
        inputs.funding_age_minutes = 5.0;
        inputs.funding_age_hours = 5.0 / 60.0;
        // Flash funding x3 and the funding-age ramp both apply.
        let expected = 10_000.0 * 3.0 * (1.0 + (24.0 - 5.0 / 60.0) / 24.0 * 1.5);
        assert_close(score_trade(&inputs, &cfg).final_score, expected);

        inputs.funding_age_minutes = 5.1;
        inputs.funding_age_hours = 5.1 / 60.0;
        let b = score_trade(&inputs, &cfg);
        assert_eq!(b.flash_funding, 1.0);
    }

    #[test]
    fn liquidity_ratio_tiers() {
        assert_eq!(liquidity_multiplier(0.50), 3.0);
        assert_eq!(liquidity_multiplier(0.20), 2.0);
        assert_eq!(liquidity_multiplier(0.10), 1.5);
        assert_eq!(liquidity_multiplier(0.05), 1.2);
        assert_eq!(liquidity_multiplier(0.049), 1.0);
        assert_eq!(liquidity_multiplier(0.0), 1.0);
    }

    #[test]
    fn extreme_price_boundaries() {
        let cfg = detection_config();
        for (price, expected) in [(0.85, 1.5), (0.15, 1.5), (0.84, 1.0), (0.16, 1.0), (0.99, 1.5)]
        {
            let mut inputs = quiet_inputs(10_000.0, 1, 100.0);
            inputs.price = price;
            assert_eq!(score_trade(&inputs, &cfg).price_confidence, expected);
        }
    }

    #[test]
    fn concentration_boundary_is_strict() {
        let cfg = detection_config();
        let mut inputs = quiet_inputs(10_000.0, 1, 100.0);
        inputs.concentration = 0.90;
        assert_eq!(score_trade(&inputs, &cfg).concentration, 1.0);
        inputs.concentration = 0.901;
        assert_eq!(score_trade(&inputs, &cfg).concentration, 1.5);
    }

    #[test]
    fn velocity_tiers_respect_threshold() {
        assert_eq!(velocity_multiplier(2, 3), 1.0);
        assert_eq!(velocity_multiplier(3, 3), 1.5);
        assert_eq!(velocity_multiplier(5, 3), 2.0);
        assert_eq!(velocity_multiplier(9, 3), 2.0);
        assert_eq!(velocity_multiplier(10, 3), 3.0);
        assert_eq!(velocity_multiplier(10, 0), 1.0);
    }

    #[test]
    fn cluster_size_tiers() {
        assert_eq!(cluster_multiplier(1), 1.0);
        assert_eq!(cluster_multiplier(2), 1.5);
        assert_eq!(cluster_multiplier(5), 2.0);
        assert_eq!(cluster_multiplier(10), 3.0);
        assert_eq!(cluster_multiplier(50), 3.0);
    }

    #[test]
    fn funding_age_ramp() {
        let cfg = detection_config();
        for (hours, expected) in [(1.0, 2.4375), (12.0, 1.75), (24.0, 1.0), (6.0, 2.125)] {
            let mut inputs = quiet_inputs(10_000.0, 1, 100.0);
            inputs.funding_age_hours = hours;
            let b = score_trade(&inputs, &cfg);
            assert_close(b.funding_age, expected);
        }

        let mut inputs = quiet_inputs(10_000.0, 1, 100.0);
        inputs.funding_age_hours = 24.1;
        assert_eq!(score_trade(&inputs, &cfg).funding_age, 1.0);
    }

    #[test]
    fn worst_case_composition() {
        // New wallet, last minute, quick funding, high win rate.
        let cfg = detection_config();
        let inputs = ScoreInputs {
            notional: 50_000.0,
            wallet_age_days: 1,
            hours_to_close: 1.0,
            funding_age_hours: 1.0,
            win_rate: 0.85,
            resolved_trades: 10,
            ..Default::default()
        };
        // 50000 * 4.9166 * 1.85 * 2.4375
        assert_close(score_trade(&inputs, &cfg).final_score, 1_108_554.69);
    }

    #[test]
    fn quiet_trade_scores_exactly_base_times_ttc() {
        let cfg = detection_config();
        let b = score_trade(&quiet_inputs(25_000.0, 3, 24.0), &cfg);
        assert_close(b.final_score, (25_000.0 / 3.0) * 3.0);
        for m in [
            b.win_rate,
            b.first_trade_large,
            b.flash_funding,
            b.liquidity,
            b.price_confidence,
            b.concentration,
            b.velocity,
            b.cluster,
            b.coordinated,
            b.funding_age,
        ] {
            assert_eq!(m, 1.0);
        }
    }

    #[test]
    fn scoring_is_deterministic() {
        let cfg = detection_config();
        let inputs = ScoreInputs {
            notional: 42_000.0,
            wallet_age_days: 2,
            hours_to_close: 7.5,
            win_rate: 0.8,
            resolved_trades: 9,
            first_trade_large: true,
            funding_age_minutes: 3.0,
            funding_age_hours: 0.05,
            liquidity_ratio: 0.22,
            price: 0.88,
            concentration: 0.95,
            velocity_count: 6,
            cluster_wallet_count: 4,
            coordinated: true,
            cluster_id: Some("cluster_x".into()),
        };
        let a = score_trade(&inputs, &cfg);
        let b = score_trade(&inputs, &cfg);
        assert_eq!(a, b);
        assert_eq!(a.final_score.to_bits(), b.final_score.to_bits());
    }

    #[test]
    fn severity_thresholds() {
        let cfg = detection_config();
        assert_eq!(severity_for(10_000.0, &cfg), Severity::Alert);
        assert_eq!(severity_for(30_000.0, &cfg), Severity::Alert);
        assert_eq!(severity_for(9_999.0, &cfg), Severity::Warn);
        assert_eq!(severity_for(5_000.0, &cfg), Severity::Warn);
        assert_eq!(severity_for(4_999.0, &cfg), Severity::Info);
        assert_eq!(severity_for(0.0, &cfg), Severity::Info);
    }
}
