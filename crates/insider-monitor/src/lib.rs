//! Insider Monitor
//!
//! Polls the Polymarket Data API for large trades, reconstructs wallet
//! history, scores each trade against a set of independent suspicion
//! signals, and fans alerts out to the configured sinks.

pub mod alerts;
pub mod processor;
pub mod server;
