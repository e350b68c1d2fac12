//! Core domain types for the insider monitor.

pub mod alert;
pub mod cluster;
pub mod market;
pub mod trade;
pub mod wallet;

pub use alert::*;
pub use cluster::*;
pub use market::*;
pub use trade::*;
pub use wallet::*;
