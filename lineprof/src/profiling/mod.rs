//! Profiling core
//!
//! - `clock`: time source (monotonic, or manual in tests)
//! - `accumulator`: per-line time and counts, driven by hook calls
//! - `snapshot`: the immutable window the accumulator publishes
//! - `executor`: the execution thread running the instrumented program
//! - `summary`: whole-run totals for the headless report

pub mod accumulator;
pub mod clock;
pub mod executor;
pub mod snapshot;
pub mod summary;

pub use accumulator::{Accumulator, Publish, ReentryPolicy};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use executor::{run_profiled, spawn_execution, ProgramOutput, RunConfig, RunResult};
pub use snapshot::Snapshot;
pub use summary::{LineTotals, RunSummary};
