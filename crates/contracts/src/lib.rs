//! # Contracts
//!
//! Frozen interface contracts shared by every relay crate.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Data Model
//! - `Metric` is one measurement; `Sample` wraps it together with the
//!   `Flush` / `Close` control signals carried on the same channel
//! - `Settings` is the loosely-typed per-handler / per-collector configuration
//! - `AgentConfig` is the full agent configuration produced by `config_loader`

mod agent_config;
mod emitter;
mod error;
mod internal;
mod metric;
mod sample;
mod settings;

pub use agent_config::*;
pub use emitter::{Emitter, LocalEmitter};
pub use error::*;
pub use internal::*;
pub use metric::*;
pub use sample::Sample;
pub use settings::Settings;
