//! Scenario loading, random boards and run reports for the `trace-route` binary.

pub mod random;
pub mod report;
pub mod scenario;

pub use random::{random_scenario, RandomBoard};
pub use report::{render_text, RunSummary, TraceSummary};
pub use scenario::{AnchorSpec, LoadedBoard, Scenario, TraceSpec};
