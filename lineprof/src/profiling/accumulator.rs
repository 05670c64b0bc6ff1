//! Per-line timing and counting, driven by hook calls
//!
//! The accumulator is owned by the execution thread and is the only thing
//! that touches its maps, so none of them need locking. What leaves the
//! thread is a finished [`Snapshot`], handed to a [`Publish`] sink.
//!
//! ## Window Lifecycle
//!
//! ```text
//! begin(L) ── end(L) ── mark(M) ── ... ── end(K) ── (elapsed > interval?) ── flush
//!                                                                   │
//!                                  publish Snapshot(window N) ◄─────┘
//!                                  reset maps, restart window N+1
//! ```
//!
//! The threshold is only checked in `end`, so a program blocked inside one
//! statement publishes nothing until that statement completes.

use super::clock::{Clock, MonotonicClock};
use super::snapshot::Snapshot;
use lineprof_common::{LineHooks, LineNo, DEFAULT_FLUSH_INTERVAL_SECS};
use log::debug;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// What `begin` does when the same line is already open
///
/// Happens with recursion: a line begins again before its first evaluation
/// ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReentryPolicy {
    /// Keep only the newest start; the outer evaluation is under-counted
    #[default]
    Overwrite,
    /// Keep a stack of starts; each `end` closes the innermost one
    Stack,
}

/// Receiver of published windows
pub trait Publish {
    fn publish(&mut self, snapshot: Snapshot);
}

/// Collects every window in order (tests, replay)
impl Publish for Vec<Snapshot> {
    fn publish(&mut self, snapshot: Snapshot) {
        self.push(snapshot);
    }
}

pub struct Accumulator<P: Publish, C: Clock = MonotonicClock> {
    publisher: P,
    clock: C,
    interval: Duration,
    policy: ReentryPolicy,
    open: HashMap<LineNo, Vec<Instant>>,
    time_by_line: HashMap<LineNo, Duration>,
    count_by_line: HashMap<LineNo, u64>,
    window_start: Instant,
    window: u64,
}

impl<P: Publish, C: Clock> Accumulator<P, C> {
    /// A non-positive or non-finite interval falls back to the default
    pub fn new(publisher: P, clock: C, interval_secs: f64, policy: ReentryPolicy) -> Self {
        let interval = Duration::try_from_secs_f64(interval_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_secs_f64(DEFAULT_FLUSH_INTERVAL_SECS));
        let window_start = clock.now();
        Self {
            publisher,
            clock,
            interval,
            policy,
            open: HashMap::new(),
            time_by_line: HashMap::new(),
            count_by_line: HashMap::new(),
            window_start,
            window: 0,
        }
    }

    #[must_use]
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    #[must_use]
    pub fn into_publisher(self) -> P {
        self.publisher
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of windows published so far
    #[must_use]
    pub fn windows_published(&self) -> u64 {
        self.window
    }

    /// Evaluations of `line` recorded in the current (unpublished) window
    #[must_use]
    pub fn pending_count(&self, line: LineNo) -> u64 {
        self.count_by_line.get(&line).copied().unwrap_or(0)
    }

    /// Start times still waiting for their `end` on `line`
    #[must_use]
    pub fn open_starts(&self, line: LineNo) -> usize {
        self.open.get(&line).map_or(0, Vec::len)
    }

    /// Publish the current window and start a new one
    ///
    /// Open start times are kept: a statement spanning the boundary is
    /// attributed entirely to the window its `end` falls in.
    pub fn flush(&mut self) {
        let now = self.clock.now();
        self.flush_at(now);
    }

    /// Publish the final partial window, if it recorded anything
    pub fn finish(&mut self) {
        if !self.time_by_line.is_empty() || !self.count_by_line.is_empty() {
            self.flush();
        }
    }

    fn flush_at(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.window_start);
        self.window += 1;
        let snapshot = Snapshot {
            window: self.window,
            interval_secs: elapsed.as_secs_f64().max(f64::EPSILON),
            time_by_line: std::mem::take(&mut self.time_by_line),
            count_by_line: std::mem::take(&mut self.count_by_line),
        };
        debug!(
            "window {} closed after {:.3}s ({} lines)",
            snapshot.window,
            snapshot.interval_secs,
            snapshot.count_by_line.len()
        );
        self.publisher.publish(snapshot);
        self.window_start = now;
    }

    fn open_start(&mut self, line: LineNo) -> Option<Instant> {
        match self.policy {
            ReentryPolicy::Overwrite => self.open.get(&line).and_then(|starts| starts.last().copied()),
            ReentryPolicy::Stack => self.open.get_mut(&line).and_then(Vec::pop),
        }
    }
}

impl<P: Publish, C: Clock> LineHooks for Accumulator<P, C> {
    fn begin(&mut self, line: LineNo) {
        let now = self.clock.now();
        let starts = self.open.entry(line).or_default();
        if self.policy == ReentryPolicy::Overwrite {
            starts.clear();
        }
        starts.push(now);
    }

    fn end(&mut self, line: LineNo) {
        let now = self.clock.now();
        let elapsed = self
            .open_start(line)
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();
        *self.time_by_line.entry(line).or_default() += elapsed;
        *self.count_by_line.entry(line).or_default() += 1;

        if now.saturating_duration_since(self.window_start) > self.interval {
            self.flush_at(now);
        }
    }

    fn mark(&mut self, line: LineNo) {
        *self.count_by_line.entry(line).or_default() += 1;
    }

    /// Drop the start opened by the raising statement; nothing is counted
    fn abandon(&mut self, line: LineNo) {
        if let Some(starts) = self.open.get_mut(&line) {
            starts.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiling::clock::ManualClock;

    const MS: Duration = Duration::from_millis(1);

    fn accumulator(policy: ReentryPolicy) -> (Accumulator<Vec<Snapshot>, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (Accumulator::new(Vec::new(), clock.clone(), 1.0, policy), clock)
    }

    #[test]
    fn test_begin_end_times_and_counts() {
        let (mut acc, clock) = accumulator(ReentryPolicy::Overwrite);
        acc.begin(3);
        clock.advance(40 * MS);
        acc.end(3);
        acc.mark(4);
        acc.flush();

        let window = &acc.publisher()[0];
        assert_eq!(window.time(3), 40 * MS);
        assert_eq!(window.count(3), 1);
        assert_eq!(window.count(4), 1);
        assert_eq!(window.time(4), Duration::ZERO);
    }

    #[test]
    fn test_end_without_begin_counts_zero_time() {
        let (mut acc, _clock) = accumulator(ReentryPolicy::Overwrite);
        acc.end(8);
        assert_eq!(acc.pending_count(8), 1);
        acc.flush();
        assert_eq!(acc.publisher()[0].time(8), Duration::ZERO);
    }

    #[test]
    fn test_flush_happens_in_end_after_interval() {
        let (mut acc, clock) = accumulator(ReentryPolicy::Overwrite);
        acc.begin(1);
        clock.advance(600 * MS);
        acc.end(1);
        assert!(acc.publisher().is_empty());

        acc.begin(1);
        clock.advance(600 * MS);
        acc.mark(2);
        assert!(acc.publisher().is_empty(), "mark never flushes");
        acc.end(1);

        let published = acc.publisher();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].window, 1);
        assert_eq!(published[0].count(1), 2);
        assert_eq!(published[0].time(1), 1_200 * MS);
        assert!((published[0].interval_secs - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_windows_are_disjoint() {
        let (mut acc, clock) = accumulator(ReentryPolicy::Overwrite);
        acc.begin(1);
        clock.advance(1_500 * MS);
        acc.end(1);
        acc.begin(2);
        clock.advance(10 * MS);
        acc.end(2);
        acc.finish();

        let published = acc.publisher();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].lines(), vec![1]);
        assert_eq!(published[1].lines(), vec![2]);
        assert_eq!(published[1].window, 2);
        assert!((published[1].interval_secs - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_open_start_survives_flush() {
        let (mut acc, clock) = accumulator(ReentryPolicy::Overwrite);
        acc.begin(5);
        clock.advance(100 * MS);
        acc.flush();
        clock.advance(100 * MS);
        acc.end(5);
        acc.finish();

        let published = acc.publisher();
        assert!(published[0].is_empty());
        assert_eq!(published[1].time(5), 200 * MS);
    }

    #[test]
    fn test_finish_skips_empty_window() {
        let (mut acc, _clock) = accumulator(ReentryPolicy::Overwrite);
        acc.finish();
        assert!(acc.publisher().is_empty());
        assert_eq!(acc.windows_published(), 0);
    }

    #[test]
    fn test_overwrite_keeps_newest_start() {
        let (mut acc, clock) = accumulator(ReentryPolicy::Overwrite);
        acc.begin(7);
        clock.advance(10 * MS);
        acc.begin(7);
        clock.advance(5 * MS);
        acc.end(7);
        clock.advance(5 * MS);
        acc.end(7);
        acc.finish();

        let window = &acc.publisher()[0];
        assert_eq!(window.count(7), 2);
        // inner 5ms, outer measured from the inner start: 10ms
        assert_eq!(window.time(7), 15 * MS);
    }

    #[test]
    fn test_stack_policy_closes_innermost_start() {
        let (mut acc, clock) = accumulator(ReentryPolicy::Stack);
        acc.begin(7);
        clock.advance(10 * MS);
        acc.begin(7);
        clock.advance(5 * MS);
        acc.end(7);
        clock.advance(5 * MS);
        acc.end(7);
        acc.finish();

        let window = &acc.publisher()[0];
        assert_eq!(window.count(7), 2);
        assert_eq!(window.time(7), 25 * MS);
    }

    #[test]
    fn test_abandon_discards_innermost_start() {
        let (mut acc, clock) = accumulator(ReentryPolicy::Stack);
        acc.begin(4);
        clock.advance(10 * MS);
        acc.begin(4);
        acc.abandon(4);
        assert_eq!(acc.open_starts(4), 1);
        clock.advance(5 * MS);
        acc.end(4);
        assert_eq!(acc.open_starts(4), 0);
        acc.finish();

        let window = &acc.publisher()[0];
        assert_eq!(window.count(4), 1, "abandoned evaluation is not counted");
        assert_eq!(window.time(4), 15 * MS);
    }

    #[test]
    fn test_repeated_abandon_keeps_stack_empty() {
        for policy in [ReentryPolicy::Overwrite, ReentryPolicy::Stack] {
            let (mut acc, _clock) = accumulator(policy);
            for _ in 0..10_000 {
                acc.begin(5);
                acc.abandon(5);
            }
            assert_eq!(acc.open_starts(5), 0, "{policy:?}");
            acc.abandon(9);
            assert_eq!(acc.open_starts(9), 0);
        }
    }

    #[test]
    fn test_invalid_interval_falls_back_to_default() {
        for bad in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let acc = Accumulator::new(Vec::new(), ManualClock::new(), bad, ReentryPolicy::Overwrite);
            assert_eq!(acc.interval(), Duration::from_secs(1), "interval {bad}");
        }
    }
}
