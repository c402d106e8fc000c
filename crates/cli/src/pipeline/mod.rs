//! Publish run orchestration.

mod orchestrator;
mod stats;

pub use orchestrator::{PublishRun, RunConfig};
pub use stats::RunStats;
