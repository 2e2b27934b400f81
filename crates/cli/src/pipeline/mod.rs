//! Pipeline orchestration module.

mod orchestrator;
mod record;
mod stats;
mod writer;

pub use orchestrator::{InputSource, Pipeline, PipelineConfig};
pub use stats::PipelineStats;
