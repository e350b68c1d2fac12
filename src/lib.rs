//! PolyPatrol: Polymarket Insider-Activity Monitor
//!
//! This is the root crate tying the workspace together for integration
//! tests. For actual functionality, use the individual crates directly:
//!
//! - `insider-core`: shared types, API clients, storage repositories
//! - `insider-monitor`: the polling pipeline, scoring engine, and alert sinks

pub use insider_core as core;
pub use insider_monitor as monitor;
