//! The coverage gate: running the tools, driving the correlation, judging
//! the result against thresholds, and rendering the report.

pub mod gate;
pub mod pipeline;
pub mod report;
pub mod runner;

pub use gate::{evaluate, GateResult, Metric, ThresholdCheck, Thresholds};
pub use pipeline::{load_change, run_check, Change, CheckOptions, CheckOutcome, DiffSource, SummarySource};
pub use report::render;
pub use runner::CommandRunner;
