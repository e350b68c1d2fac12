//! Integration tests for component interactions.
//!
//! These exercise the scoring engine, fingerprinting, market parsing, and
//! win-rate attribution together, end to end over the pure logic.

use insider_core::config::DetectionConfig;
use insider_core::types::{StringList, Trade, TradeRecord};
use insider_monitor::processor::scoring::{score_trade, severity_for, ScoreInputs};
use insider_monitor::processor::winrate::{attribute_positions, determine_winner};
use insider_core::types::Severity;
use rust_decimal::Decimal;

fn assert_close(actual: f64, expected: f64) {
    let tolerance = (expected.abs() * 0.001).max(0.01);
    assert!(
        (actual - expected).abs() <= tolerance,
        "got {actual}, want {expected}"
    );
}

fn inputs(notional: f64, age_days: i64, hours_to_close: f64) -> ScoreInputs {
    ScoreInputs {
        notional,
        wallet_age_days: age_days,
        hours_to_close,
        ..Default::default()
    }
}

/// The literal end-to-end scenarios with the default thresholds
/// (H=48, T_w=0.75, MIN_TRADE_USD=5000, NEW_WALLET_DAYS_MAX=7,
/// warn=5000, alert=10000).
#[test]
fn scoring_scenarios_with_default_thresholds() {
    let cfg = DetectionConfig::default();

    // Scenario 1: beyond the time-to-close horizon, no other signals.
    let b = score_trade(&inputs(50_000.0, 2, 100.0), &cfg);
    assert_close(b.final_score, 25_000.0);
    assert_eq!(severity_for(b.final_score, &cfg), Severity::Alert);

    // Scenario 2: one hour to close.
    let b = score_trade(&inputs(50_000.0, 2, 1.0), &cfg);
    assert_close(b.final_score, 122_916.67);
    assert_eq!(severity_for(b.final_score, &cfg), Severity::Alert);

    // Scenario 3: zero-day wallet, age clamped to one.
    let b = score_trade(&inputs(50_000.0, 0, 100.0), &cfg);
    assert_close(b.final_score, 50_000.0);
    assert_eq!(severity_for(b.final_score, &cfg), Severity::Alert);

    // Scenario 4: thirty-day wallet scores base only and is past the
    // new-wallet gate, so the pipeline would never emit.
    let b = score_trade(&inputs(10_000.0, 30, 100.0), &cfg);
    assert_close(b.final_score, 333.33);
    assert!(30 > cfg.new_wallet_days_max);
}

#[test]
fn severity_boundaries_are_inclusive() {
    let cfg = DetectionConfig::default();
    assert_eq!(severity_for(cfg.score_alert, &cfg), Severity::Alert);
    assert_eq!(severity_for(cfg.score_warn, &cfg), Severity::Warn);
    assert_eq!(severity_for(cfg.score_warn - 0.01, &cfg), Severity::Info);
}

/// Fingerprints must be stable and sensitive to a 1e-6 change in size, the
/// smallest difference the 6dp canonical form can distinguish.
#[test]
fn fingerprint_identity() {
    let trade = |size: Decimal, tx: &str| Trade {
        proxy_wallet: "0xwallet".into(),
        side: "BUY".into(),
        condition_id: "0xcond".into(),
        size,
        price: Decimal::new(55, 2),
        timestamp: 1_700_000_000,
        outcome: "Yes".into(),
        title: String::new(),
        slug: String::new(),
        event_slug: String::new(),
        transaction_hash: tx.into(),
        usdc_size: Decimal::ZERO,
    };

    // Transaction hash dominates.
    assert_eq!(trade(Decimal::new(100, 0), "0xtx").fingerprint(), "0xtx");

    // Derived digests are deterministic.
    let a = trade(Decimal::new(100, 0), "");
    let b = trade(Decimal::new(100, 0), "");
    assert_eq!(a.fingerprint(), b.fingerprint());

    // A 1e-6 size difference changes the derived digest.
    let e = trade(Decimal::new(100_000_001, 6), ""); // 100.000001
    assert_ne!(a.fingerprint(), e.fingerprint());
}

/// Scenario 6: closed market with prices ["0.97","0.03"] resolves to YES,
/// and a BUY-YES wallet is credited a win.
#[test]
fn resolution_scenario_yes_wins() {
    let outcomes: StringList = serde_json::from_str(r#"["YES","NO"]"#).unwrap();
    let prices: StringList = serde_json::from_str(r#"["0.97","0.03"]"#).unwrap();

    let winner = determine_winner(outcomes.as_slice(), prices.as_slice()).unwrap();
    assert_eq!(winner, "YES");

    let trades = vec![TradeRecord {
        trade_hash: "h1".into(),
        transaction_hash: String::new(),
        condition_id: "0xcond".into(),
        proxy_wallet: "0xholder".into(),
        timestamp_sec: 1_700_000_000,
        notional_usd: Decimal::new(8_000, 0),
        side: "BUY".into(),
        outcome: "YES".into(),
        price: Decimal::new(40, 2),
        created_ts: 1_700_000_000,
    }];
    let positions = attribute_positions(&trades, &winner);
    assert!(positions["0xholder"].net_position > Decimal::ZERO);
}

/// Winner determination accepts both upstream encodings and the exact 0.95
/// boundary.
#[test]
fn resolution_accepts_both_encodings() {
    let from_csv = |s: &str| StringList::parse_raw(s);

    let winner = determine_winner(
        from_csv("YES,NO").as_slice(),
        from_csv("0.95,0.05").as_slice(),
    );
    assert_eq!(winner.as_deref(), Some("YES"));

    let outcomes: StringList = serde_json::from_str(r#""[\"Alpha\", \"Beta\"]""#).unwrap();
    let prices: StringList = serde_json::from_str(r#""[\"0.01\", \"0.99\"]""#).unwrap();
    assert_eq!(
        determine_winner(outcomes.as_slice(), prices.as_slice()).as_deref(),
        Some("Beta")
    );
}

/// A hedged wallet resolves but neither wins nor loses; scoring treats a
/// missing liquidity figure as a neutral multiplier.
#[test]
fn hedged_and_unknown_inputs_are_neutral() {
    let cfg = DetectionConfig::default();

    let trades = vec![
        TradeRecord {
            trade_hash: "h1".into(),
            transaction_hash: String::new(),
            condition_id: "0xcond".into(),
            proxy_wallet: "0xhedge".into(),
            timestamp_sec: 0,
            notional_usd: Decimal::new(5_000, 0),
            side: "BUY".into(),
            outcome: "YES".into(),
            price: Decimal::new(50, 2),
            created_ts: 0,
        },
        TradeRecord {
            trade_hash: "h2".into(),
            transaction_hash: String::new(),
            condition_id: "0xcond".into(),
            proxy_wallet: "0xhedge".into(),
            timestamp_sec: 0,
            notional_usd: Decimal::new(5_000, 0),
            side: "BUY".into(),
            outcome: "NO".into(),
            price: Decimal::new(50, 2),
            created_ts: 0,
        },
    ];
    let positions = attribute_positions(&trades, "YES");
    assert_eq!(positions["0xhedge"].net_position, Decimal::ZERO);

    // Liquidity unknown => ratio 0 => multiplier 1.
    let mut quiet = inputs(20_000.0, 1, 100.0);
    quiet.liquidity_ratio = 0.0;
    let b = score_trade(&quiet, &cfg);
    assert_eq!(b.liquidity, 1.0);
    assert_close(b.final_score, 20_000.0);
}

/// Scoring is a pure function: identical inputs give bit-identical output.
#[test]
fn scoring_reproducibility() {
    let cfg = DetectionConfig::default();
    let full = ScoreInputs {
        notional: 80_000.0,
        wallet_age_days: 3,
        hours_to_close: 5.0,
        win_rate: 0.9,
        resolved_trades: 12,
        first_trade_large: false,
        funding_age_minutes: 240.0,
        funding_age_hours: 4.0,
        liquidity_ratio: 0.12,
        price: 0.9,
        concentration: 0.97,
        velocity_count: 5,
        cluster_wallet_count: 6,
        coordinated: true,
        cluster_id: Some("cluster_abc".into()),
    };

    let first = score_trade(&full, &cfg);
    let second = score_trade(&full, &cfg);
    assert_eq!(first, second);
    assert_eq!(first.final_score.to_bits(), second.final_score.to_bits());

    // And the multiplier set matches the composition by hand:
    // base = 80000/3, ttc = 1 + (48-5)/48*4, win = 1.9, liq = 1.5,
    // price = 1.5, conc = 1.5, vel = 2.0, cluster = 2.0, coord = 2.0,
    // funding = 1 + (24-4)/24*1.5 = 2.25
    let expected = (80_000.0 / 3.0)
        * (1.0 + 43.0 / 48.0 * 4.0)
        * 1.9
        * 1.5
        * 1.5
        * 1.5
        * 2.0
        * 2.0
        * 2.0
        * 2.25;
    assert_close(first.final_score, expected);
}
