//! Execution context: runs the instrumented program against the accumulator
//!
//! The interpreter holds `Rc` values and is therefore built on the thread
//! that runs it. Only the syntax tree crosses the thread boundary.

use super::accumulator::{Accumulator, Publish, ReentryPolicy};
use super::clock::{Clock, MonotonicClock};
use super::snapshot::Snapshot;
use crate::domain::ProfilerError;
use crate::scheduler::{RunStatus, SharedState, Shutdown, SnapshotPublisher};
use crossbeam_channel::Sender;
use lineprof_script::{Interpreter, Program, RuntimeError};
use log::{error, info, warn};
use std::any::Any;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Deep script recursion needs a deeper native stack than the default
const EXEC_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Outcome of running the profiled program
pub type RunResult = Result<(), RuntimeError>;

/// Where the profiled program's `print` output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramOutput {
    /// Dashboard owns the terminal
    Discard,
    Stdout,
}

#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    pub interval_secs: f64,
    pub reentry: ReentryPolicy,
    pub output: ProgramOutput,
}

/// Run a program to completion, then publish its last partial window
pub fn run_profiled<P: Publish, C: Clock>(
    program: &Program,
    accumulator: Accumulator<P, C>,
    out: Box<dyn Write>,
) -> (RunResult, Accumulator<P, C>) {
    let mut interpreter = Interpreter::new(accumulator, out);
    let result = interpreter.run(program);
    let mut accumulator = interpreter.into_hooks();
    accumulator.finish();
    (result, accumulator)
}

/// Start the execution thread
///
/// The thread is the sole writer of the accumulator. When the program ends
/// it publishes the final window, records the run status and marks the
/// dashboard dirty. Dropping the accumulator closes the snapshot tap.
///
/// A panic on the thread is recorded as a fault and reported on `shutdown`
/// before it resumes, so the join handle still sees it.
pub fn spawn_execution(
    program: Program,
    config: RunConfig,
    shared: Arc<SharedState>,
    tap: Option<Sender<Arc<Snapshot>>>,
    shutdown: Option<Sender<Shutdown>>,
) -> Result<JoinHandle<RunResult>, ProfilerError> {
    thread::Builder::new()
        .name("lineprof-exec".into())
        .stack_size(EXEC_STACK_SIZE)
        .spawn(move || {
            settle(&shared, shutdown.as_ref(), || {
                let publisher = SnapshotPublisher::new(Arc::clone(&shared), tap);
                let accumulator = Accumulator::new(
                    publisher,
                    MonotonicClock,
                    config.interval_secs,
                    config.reentry,
                );
                let out: Box<dyn Write> = match config.output {
                    ProgramOutput::Discard => Box::new(io::sink()),
                    ProgramOutput::Stdout => Box::new(io::stdout()),
                };

                info!("program started (flush every {:.2}s)", accumulator.interval().as_secs_f64());
                let (result, accumulator) = run_profiled(&program, accumulator, out);
                info!("program ended after {} windows", accumulator.windows_published());
                result
            })
        })
        .map_err(|e| ProfilerError::ThreadSpawnFailed { thread: "execution", error: e.to_string() })
}

/// Run `body` and record how it ended in `shared`
fn settle(
    shared: &SharedState,
    shutdown: Option<&Sender<Shutdown>>,
    body: impl FnOnce() -> RunResult,
) -> RunResult {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => {
            shared.set_status(RunStatus::Finished);
            Ok(())
        }
        Ok(Err(fault)) => {
            warn!("program raised {fault}");
            shared.set_status(RunStatus::Faulted(fault.to_string()));
            Err(fault)
        }
        Err(payload) => {
            let message = format!("internal error: {}", panic_message(payload.as_ref()));
            error!("execution thread panicked: {message}");
            shared.set_status(RunStatus::Faulted(message.clone()));
            if let Some(shutdown) = shutdown {
                shutdown.send(Shutdown::Failed(message)).ok();
            }
            panic::resume_unwind(payload)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("panic")
}
