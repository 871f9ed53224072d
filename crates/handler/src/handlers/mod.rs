//! Built-in handler implementations
//!
//! Contains LogHandler and NetworkHandler.

mod log;
mod network;

pub use self::log::LogHandler;
pub use self::network::{NetworkConfig, NetworkFormat, NetworkHandler, WireMetric};
