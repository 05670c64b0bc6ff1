//! Published per-window measurements

use crate::domain::{CpuShare, Frequency};
use lineprof_common::{LineNo, DEFAULT_FLUSH_INTERVAL_SECS};
use std::collections::HashMap;
use std::time::Duration;

/// One closed measurement window
///
/// Immutable once published. `time_by_line` and `count_by_line` always come
/// from the same window, which is what keeps the dashboard's percent and
/// frequency columns consistent with each other.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// 1 for the first published window; 0 for the placeholder shown before it
    pub window: u64,
    /// Wall-clock length of the window
    pub interval_secs: f64,
    pub time_by_line: HashMap<LineNo, Duration>,
    pub count_by_line: HashMap<LineNo, u64>,
}

impl Snapshot {
    /// Placeholder current before the first flush
    #[must_use]
    pub fn empty() -> Self {
        Self {
            window: 0,
            interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            time_by_line: HashMap::new(),
            count_by_line: HashMap::new(),
        }
    }

    #[must_use]
    pub fn time(&self, line: LineNo) -> Duration {
        self.time_by_line.get(&line).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn count(&self, line: LineNo) -> u64 {
        self.count_by_line.get(&line).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn share(&self, line: LineNo) -> CpuShare {
        CpuShare::of(self.time(line), self.interval_secs)
    }

    #[must_use]
    pub fn frequency(&self, line: LineNo) -> Frequency {
        Frequency::of(self.count(line), self.interval_secs)
    }

    /// Every line with a count or a time, ascending
    #[must_use]
    pub fn lines(&self) -> Vec<LineNo> {
        let mut lines: Vec<_> =
            self.count_by_line.keys().chain(self.time_by_line.keys()).copied().collect();
        lines.sort_unstable();
        lines.dedup();
        lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time_by_line.is_empty() && self.count_by_line.is_empty()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot_renders_blank() {
        let snapshot = Snapshot::empty();
        assert_eq!(snapshot.window, 0);
        assert!(snapshot.interval_secs > 0.0);
        assert_eq!(snapshot.share(1).label(), "");
        assert_eq!(snapshot.frequency(1).label(), "");
    }

    #[test]
    fn test_share_and_frequency_use_window_length() {
        let mut snapshot = Snapshot { interval_secs: 2.0, ..Snapshot::empty() };
        snapshot.time_by_line.insert(4, Duration::from_secs(1));
        snapshot.count_by_line.insert(4, 5);
        snapshot.count_by_line.insert(9, 1);

        assert_eq!(snapshot.share(4).label(), "50.0%");
        assert_eq!(snapshot.frequency(4).label(), "2.5Hz");
        assert_eq!(snapshot.lines(), vec![4, 9]);
    }
}
