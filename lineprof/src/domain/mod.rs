//! Domain model for lineprof
//!
//! This module contains core domain types and errors that provide:
//! - Display rules for per-line measurements (share, rate, emphasis)
//! - Source text as the dashboard and summary show it
//! - Structured error handling

pub mod errors;
pub mod source;
pub mod types;

// Re-export common types for convenience
pub use source::{SourceLine, SourceText};
pub use types::{CpuShare, Emphasis, Frequency};

pub use errors::{ExportError, ProfilerError, TuiError};
