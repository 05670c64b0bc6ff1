//! # lineprof - Live Line-Level Profiler
//!
//! lineprof runs a script with every measurable statement bracketed by timing
//! hooks and shows, while the script runs, how much wall-clock time and how
//! many evaluations each source line accounted for in the last window.
//!
//! It is deterministic, not sampling: every instrumented statement is timed.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────┐    ┌──────────────┐    ┌───────────────────────────┐
//! │ source text   │───▶│  parse       │───▶│  instrument               │
//! │ (SCRIPT)      │    │ (lineprof-   │    │  begin/end around stmts,  │
//! └───────────────┘    │  script)     │    │  mark before return/break │
//!                      └──────────────┘    └─────────────┬─────────────┘
//!                                                        │ instrumented tree
//!                                                        ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ execution thread: Interpreter ──hooks──▶ Accumulator                │
//! │                                      (per-line time + count maps)   │
//! └──────────────────────────────────────────────┬──────────────────────┘
//!                                                │ every interval: Snapshot
//!                           ┌────────────────────┼───────────────────┐
//!                           ▼                    ▼                   ▼
//!                   ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//!                   │ render thread│    │  collector   │    │   export     │
//!                   │  (dashboard) │    │ (run totals) │    │ (JSON lines) │
//!                   └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`instrument`]: tree-to-tree rewrite inserting hook statements
//! - [`profiling`]: accumulator, snapshots, clock, execution thread, run summary
//! - [`scheduler`]: shared state (`ArcSwap` snapshot, dirty flag, scroll) and
//!   the dashboard threads
//! - [`tui`]: ratatui dashboard, key bindings, terminal guard
//! - [`export`]: per-window JSON lines
//! - [`cli`]: command-line arguments and script loading
//! - [`domain`]: display rules (share, rate, emphasis), source text, errors
//!
//! ## Operational Modes
//!
//! 1. **Dashboard** (default): live view until the user quits
//! 2. **Headless** (`--headless`): program output on stdout, per-line totals
//!    printed at the end
//! 3. **Dump** (`--dump`): print the instrumented program and exit
//!
//! ## Typical Usage
//!
//! ```bash
//! lineprof busy.py
//! lineprof --headless --export windows.jsonl busy.py
//! RUST_LOG=debug lineprof --headless busy.py
//! ```

pub mod cli;
pub mod domain;
pub mod export;
pub mod instrument;
pub mod profiling;
pub mod scheduler;
pub mod tui;
