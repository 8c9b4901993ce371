//! Benchmark core: metrics, quality scoring, winner selection, and the
//! concurrent orchestrator that ties them together.

pub mod metrics;
mod orchestrator;
mod quality;
mod sink;
pub mod winner;

pub use orchestrator::{BenchmarkError, BenchmarkRunner};
pub use quality::QualityScorer;
pub use sink::{HttpSink, RunSink, TracingSink};
pub use winner::WinnerPick;
