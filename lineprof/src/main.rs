//! # lineprof - Main Entry Point
//!
//! Supports three operational modes:
//! - **Dashboard** (`lineprof script.py`): live per-line view until the user quits
//! - **Headless** (`--headless`): program output on stdout, per-line totals at the end
//! - **Dump** (`--dump`): print the instrumented program and exit

use anyhow::{anyhow, Context, Result};
use arc_swap::ArcSwap;
use clap::Parser;
use crossbeam_channel::{unbounded, Sender};
use log::{info, warn};
use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use lineprof::cli::{load_script, script_title, Args};
use lineprof::domain::{ExportError, ProfilerError, SourceText};
use lineprof::export::WindowExporter;
use lineprof::instrument::{instrument, Instrumented};
use lineprof::profiling::{spawn_execution, ProgramOutput, RunConfig, RunSummary, Snapshot};
use lineprof::scheduler::{spawn_collector, RunStatus, Scheduler, SharedState, Shutdown};
use lineprof::tui::{DashboardView, TerminalGuard};
use lineprof_script::{parse, unparse, Program};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

type Collector = JoinHandle<Result<(), ExportError>>;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

#[tokio::main]
async fn run() -> Result<i32> {
    let args = Args::parse();

    let source = load_script(args.script.as_deref())?;
    let program = parse(&source).map_err(ProfilerError::from)?;
    let Instrumented { program, skipped } = instrument(program);
    info!("instrumented program ({} statements skipped)", skipped.len());

    if args.dump {
        print!("{}", unparse(&program.body));
        return Ok(EXIT_SUCCESS);
    }

    let text = SourceText::new(&source);
    let summary = Arc::new(ArcSwap::from_pointee(RunSummary::default()));
    let exporter = args
        .export
        .as_deref()
        .map(WindowExporter::create)
        .transpose()
        .context("Failed to create export file")?;

    let (tap, collector) = if args.headless || exporter.is_some() {
        let (tx, rx) = unbounded();
        (Some(tx), Some(spawn_collector(rx, exporter, Arc::clone(&summary))?))
    } else {
        (None, None)
    };

    let config = RunConfig {
        interval_secs: args.interval,
        reentry: args.reentry,
        output: if args.headless { ProgramOutput::Stdout } else { ProgramOutput::Discard },
    };

    if args.headless {
        let shared = Arc::new(SharedState::new(text.len()));
        let execution = spawn_execution(program, config, shared, tap, None)?;
        let finished = tokio::task::spawn_blocking(move || execution.join());

        tokio::select! {
            joined = finished => {
                let result = joined
                    .context("Failed to wait for the program")?
                    .map_err(|_| anyhow!("execution thread panicked"))?;
                join_collector(collector)?;
                print_summary(&summary, &text);
                match result {
                    Ok(()) => Ok(EXIT_SUCCESS),
                    Err(fault) => {
                        eprintln!("error: {fault}");
                        Ok(EXIT_ERROR)
                    }
                }
            }
            signal = shutdown_signal() => {
                eprintln!("\ninterrupted by {signal}");
                print_summary(&summary, &text);
                // The blocking join above never returns; skip runtime teardown.
                std::process::exit(EXIT_INTERRUPTED);
            }
        }
    } else {
        let view = DashboardView {
            source: text,
            title: script_title(args.script.as_deref()),
            skipped: skipped.len(),
        };
        run_dashboard(config, program, view, tap, collector).await
    }
}

async fn run_dashboard(
    config: RunConfig,
    program: Program,
    view: DashboardView,
    tap: Option<Sender<Arc<Snapshot>>>,
    collector: Option<Collector>,
) -> Result<i32> {
    let guard = TerminalGuard::enter().context("Failed to set up terminal")?;
    let scheduler = match Scheduler::start(program, config, view, Arc::clone(&guard), tap) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            guard.restore();
            return Err(e.into());
        }
    };

    let Scheduler { shared, shutdown, .. } = scheduler;
    let shutdown_wait = tokio::task::spawn_blocking(move || shutdown.recv());

    tokio::select! {
        reason = shutdown_wait => {
            guard.restore();
            match reason {
                Ok(Ok(Shutdown::Quit)) => {}
                Ok(Ok(Shutdown::Failed(message))) => return Err(anyhow!("dashboard failed: {message}")),
                _ => return Err(anyhow!("dashboard threads stopped unexpectedly")),
            }
        }
        signal = shutdown_signal() => {
            guard.restore();
            eprintln!("interrupted by {signal}");
            std::process::exit(EXIT_INTERRUPTED);
        }
    }

    match &*shared.status() {
        RunStatus::Running => {
            info!("quit while the program was still running");
            Ok(EXIT_SUCCESS)
        }
        RunStatus::Finished => {
            join_collector(collector)?;
            Ok(EXIT_SUCCESS)
        }
        RunStatus::Faulted(fault) => {
            join_collector(collector)?;
            eprintln!("error: {fault}");
            Ok(EXIT_ERROR)
        }
    }
}

/// Wait for the collector to drain the tap and surface export failures
fn join_collector(collector: Option<Collector>) -> Result<()> {
    if let Some(handle) = collector {
        handle
            .join()
            .map_err(|_| anyhow!("collector thread panicked"))?
            .context("Failed to export windows")?;
    }
    Ok(())
}

fn print_summary(summary: &ArcSwap<RunSummary>, text: &SourceText) {
    let mut stderr = io::stderr().lock();
    if let Err(e) = summary.load().write_table(&mut stderr, text) {
        warn!("Failed to print summary: {e}");
    }
}

/// First of SIGINT or SIGTERM
async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut terminate) = signal(SignalKind::terminate()) {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => return "SIGINT",
                _ = terminate.recv() => return "SIGTERM",
            }
        }
    }
    tokio::signal::ctrl_c().await.ok();
    "SIGINT"
}
