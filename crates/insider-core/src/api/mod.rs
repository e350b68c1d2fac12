//! HTTP clients for the Polymarket Data and Gamma APIs.

pub mod data;
pub mod gamma;

pub use data::{DataClient, TradeQuery};
pub use gamma::GammaClient;

/// Timeout applied to all upstream API requests.
pub(crate) const HTTP_TIMEOUT_SECS: u64 = 30;
