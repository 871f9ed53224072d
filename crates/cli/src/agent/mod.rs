//! Agent orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::Agent;
pub use stats::AgentStats;
