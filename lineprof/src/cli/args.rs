//! CLI argument definitions

use crate::domain::ProfilerError;
use crate::profiling::ReentryPolicy;
use clap::Parser;
use lineprof_common::DEFAULT_FLUSH_INTERVAL_SECS;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "lineprof",
    version,
    about = "Live line-level profiler with a terminal dashboard",
    after_help = "\
EXAMPLES:
    lineprof busy.py                          Live dashboard
    lineprof --headless busy.py               Run, then print per-line totals
    lineprof --export windows.jsonl busy.py   Also record every window as JSON
    lineprof --dump busy.py                   Show the instrumented program

KEYS:
    j/Down k/Up  line    d/u  half page    Space/b  page    q/Esc  quit"
)]
pub struct Args {
    /// Script to profile (omit to profile an empty program)
    #[arg(value_name = "SCRIPT")]
    pub script: Option<PathBuf>,

    /// Seconds per measurement window
    #[arg(
        short,
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_FLUSH_INTERVAL_SECS,
        value_parser = parse_interval
    )]
    pub interval: f64,

    /// How a line that re-enters before finishing is timed
    #[arg(long, value_enum, default_value_t = ReentryPolicy::Overwrite)]
    pub reentry: ReentryPolicy,

    /// Run without the dashboard; program output goes to stdout
    #[arg(long)]
    pub headless: bool,

    /// Print the instrumented program and exit
    #[arg(long, conflicts_with_all = ["headless", "export"])]
    pub dump: bool,

    /// Write every published window to FILE as JSON lines
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,
}

fn parse_interval(value: &str) -> Result<f64, String> {
    let secs: f64 = value.parse().map_err(|e| format!("{e}"))?;
    if secs > 0.0 && secs.is_finite() {
        Ok(secs)
    } else {
        Err(ProfilerError::InvalidInterval(secs).to_string())
    }
}
