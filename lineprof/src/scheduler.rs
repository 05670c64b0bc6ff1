//! # Scheduler
//!
//! Owns the state shared between the three dashboard threads and starts
//! them.
//!
//! ```text
//!  ┌────────────┐  publish (ArcSwap)   ┌──────────────┐   draw    ┌──────────┐
//!  │ execution  │─────────────────────▶│ SharedState  │──────────▶│  render  │
//!  │ (sole      │  set dirty           │  snapshot    │◀── dirty ─│  thread  │
//!  │  writer)   │                      │  status      │           └──────────┘
//!  └─────┬──────┘                      │  dirty flag  │           ┌──────────┐
//!        │ tap (crossbeam)             │  scroll      │◀── keys ──│  input   │
//!        ▼                             └──────────────┘           │  thread  │
//!  ┌────────────┐                                                  └────┬─────┘
//!  │ collector  │ summary + export                     Shutdown ◀───────┘
//!  └────────────┘
//! ```
//!
//! No lock is shared between the threads. The accumulator's maps never leave
//! the execution thread; what crosses is an `Arc<Snapshot>` swapped in
//! atomically, so a reader sees either the previous window or the new one
//! and never a mix.

use crate::domain::{ExportError, ProfilerError};
use crate::export::WindowExporter;
use crate::profiling::{spawn_execution, Publish, RunConfig, RunResult, RunSummary, Snapshot};
use crate::tui::scroll::ScrollState;
use crate::tui::{self, DashboardView, TerminalGuard};
use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, Sender};
use lineprof_script::Program;
use log::{debug, warn};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

// =============================================================================
// SHARED STATE
// =============================================================================

/// Redraw request
///
/// Set by publish, scroll and resize; taken by the render thread before it
/// reads anything, so a publish that lands mid-draw triggers another draw.
#[derive(Debug)]
pub struct DirtyFlag(AtomicBool);

impl DirtyFlag {
    #[must_use]
    pub fn new(initial: bool) -> Self {
        Self(AtomicBool::new(initial))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clear the flag, returning whether it was set
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Lifecycle of the profiled program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Finished,
    /// Uncaught exception, with its message and line
    Faulted(String),
}

#[derive(Debug)]
pub struct SharedState {
    snapshot: ArcSwap<Snapshot>,
    status: ArcSwap<RunStatus>,
    pub dirty: DirtyFlag,
    pub scroll: ScrollState,
}

impl SharedState {
    /// Starts with the empty placeholder snapshot and the first draw pending
    #[must_use]
    pub fn new(total_lines: usize) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::empty()),
            status: ArcSwap::from_pointee(RunStatus::Running),
            dirty: DirtyFlag::new(true),
            scroll: ScrollState::new(total_lines),
        }
    }

    /// Make `snapshot` current and request a redraw
    pub fn publish(&self, snapshot: Arc<Snapshot>) {
        self.snapshot.store(snapshot);
        self.dirty.set();
    }

    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    #[must_use]
    pub fn status(&self) -> Arc<RunStatus> {
        self.status.load_full()
    }

    pub fn set_status(&self, status: RunStatus) {
        self.status.store(Arc::new(status));
        self.dirty.set();
    }
}

/// Accumulator sink: swaps each window into [`SharedState`] and forwards it
/// to the optional tap
pub struct SnapshotPublisher {
    shared: Arc<SharedState>,
    tap: Option<Sender<Arc<Snapshot>>>,
}

impl SnapshotPublisher {
    #[must_use]
    pub fn new(shared: Arc<SharedState>, tap: Option<Sender<Arc<Snapshot>>>) -> Self {
        Self { shared, tap }
    }
}

impl Publish for SnapshotPublisher {
    fn publish(&mut self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        self.shared.publish(Arc::clone(&snapshot));
        let disconnected = self.tap.as_ref().is_some_and(|tap| tap.send(snapshot).is_err());
        if disconnected {
            warn!("snapshot collector stopped; later windows are not recorded");
            self.tap = None;
        }
    }
}

// =============================================================================
// COLLECTOR
// =============================================================================

/// Fold every tapped window into the run summary and the optional export
///
/// Ends when the execution thread drops its sender. The summary is swapped
/// in after each window so it can be printed at any moment.
pub fn spawn_collector<W: Write + Send + 'static>(
    windows: Receiver<Arc<Snapshot>>,
    mut exporter: Option<WindowExporter<W>>,
    summary: Arc<ArcSwap<RunSummary>>,
) -> Result<JoinHandle<Result<(), ExportError>>, ProfilerError> {
    thread::Builder::new()
        .name("lineprof-collect".into())
        .spawn(move || {
            for snapshot in windows {
                let mut next = RunSummary::clone(&summary.load());
                next.absorb(&snapshot);
                summary.store(Arc::new(next));
                if let Some(exporter) = exporter.as_mut() {
                    exporter.write_window(&snapshot)?;
                }
            }
            debug!("collector finished");
            Ok(())
        })
        .map_err(|e| ProfilerError::ThreadSpawnFailed { thread: "collector", error: e.to_string() })
}

// =============================================================================
// DASHBOARD THREADS
// =============================================================================

/// Why the dashboard asked the process to stop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shutdown {
    /// Quit key (including Ctrl-C while the terminal is raw)
    Quit,
    /// Render, input or execution thread failure
    Failed(String),
}

/// Handles to the running dashboard
pub struct Scheduler {
    pub shared: Arc<SharedState>,
    pub shutdown: Receiver<Shutdown>,
    pub execution: JoinHandle<RunResult>,
}

impl Scheduler {
    /// Start execution, input and render threads
    ///
    /// `guard` must already hold the terminal in raw mode. None of the
    /// threads is joined on shutdown: the caller restores the terminal and
    /// exits, and the render thread stops drawing once it sees the restore.
    pub fn start(
        program: Program,
        config: RunConfig,
        view: DashboardView,
        guard: Arc<TerminalGuard>,
        tap: Option<Sender<Arc<Snapshot>>>,
    ) -> Result<Self, ProfilerError> {
        let shared = Arc::new(SharedState::new(view.source.len()));
        // one slot per thread that may report
        let (shutdown_tx, shutdown) = bounded(3);

        let input_state = Arc::clone(&shared);
        let input_tx = shutdown_tx.clone();
        thread::Builder::new()
            .name("lineprof-input".into())
            .spawn(move || {
                let reason = match tui::input_loop(&input_state) {
                    Ok(()) => Shutdown::Quit,
                    Err(e) => Shutdown::Failed(e.to_string()),
                };
                input_tx.send(reason).ok();
            })
            .map_err(|e| ProfilerError::ThreadSpawnFailed { thread: "input", error: e.to_string() })?;

        let execution_tx = shutdown_tx.clone();
        let render_state = Arc::clone(&shared);
        thread::Builder::new()
            .name("lineprof-render".into())
            .spawn(move || {
                if let Err(e) = tui::render_loop(&view, &render_state, &guard) {
                    shutdown_tx.send(Shutdown::Failed(e.to_string())).ok();
                }
            })
            .map_err(|e| ProfilerError::ThreadSpawnFailed { thread: "render", error: e.to_string() })?;

        let execution =
            spawn_execution(program, config, Arc::clone(&shared), tap, Some(execution_tx))?;

        Ok(Self { shared, shutdown, execution })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Window whose two maps are derived from the same number
    fn window(n: u64) -> Snapshot {
        let mut snapshot = Snapshot { window: n, interval_secs: 1.0, ..Snapshot::empty() };
        for line in 1..=50 {
            snapshot.count_by_line.insert(line, n);
            snapshot.time_by_line.insert(line, Duration::from_micros(n));
        }
        snapshot
    }

    #[test]
    fn test_dirty_flag_take_clears() {
        let flag = DirtyFlag::new(false);
        assert!(!flag.take());
        flag.set();
        assert!(flag.is_set());
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn test_publish_sets_dirty_and_swaps() {
        let shared = SharedState::new(10);
        assert!(shared.dirty.take(), "first draw is pending");
        assert_eq!(shared.current().window, 0);

        shared.publish(Arc::new(window(1)));
        assert!(shared.dirty.take());
        assert_eq!(shared.current().window, 1);
    }

    #[test]
    fn test_readers_never_see_mixed_windows() {
        let shared = Arc::new(SharedState::new(50));
        let writer_state = Arc::clone(&shared);
        let writer = thread::spawn(move || {
            for n in 1..=2_000 {
                writer_state.publish(Arc::new(window(n)));
            }
        });

        let mut last = 0;
        while !writer.is_finished() {
            let snapshot = shared.current();
            let n = snapshot.window;
            assert!(n >= last, "windows go backwards");
            last = n;
            for line in 1..=50 {
                assert_eq!(snapshot.count(line), n);
                assert_eq!(snapshot.time(line), Duration::from_micros(n));
            }
        }
        writer.join().unwrap();
        assert_eq!(shared.current().window, 2_000);
    }

    #[test]
    fn test_status_change_requests_redraw() {
        let shared = SharedState::new(0);
        shared.dirty.take();
        shared.set_status(RunStatus::Faulted("ValueError: bad (line 3)".into()));
        assert!(shared.dirty.is_set());
        assert_eq!(*shared.status(), RunStatus::Faulted("ValueError: bad (line 3)".into()));
    }

    #[test]
    fn test_publisher_forwards_to_tap() {
        let shared = Arc::new(SharedState::new(0));
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut publisher = SnapshotPublisher::new(Arc::clone(&shared), Some(tx));

        publisher.publish(window(1));
        drop(rx);
        publisher.publish(window(2));

        assert_eq!(shared.current().window, 2);
        assert!(publisher.tap.is_none());
    }

    #[test]
    fn test_collector_folds_windows() {
        let summary = Arc::new(ArcSwap::from_pointee(RunSummary::default()));
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = spawn_collector::<Vec<u8>>(rx, None, Arc::clone(&summary)).unwrap();

        tx.send(Arc::new(window(2))).unwrap();
        tx.send(Arc::new(window(3))).unwrap();
        drop(tx);
        handle.join().unwrap().unwrap();

        let totals = summary.load();
        assert_eq!(totals.windows, 2);
        assert_eq!(totals.lines[&7].count, 5);
    }
}
