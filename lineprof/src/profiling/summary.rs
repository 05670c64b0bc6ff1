//! Whole-run totals, folded from every published window

use super::snapshot::Snapshot;
use crate::domain::{CpuShare, Frequency, SourceText};
use lineprof_common::LineNo;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineTotals {
    pub time: Duration,
    pub count: u64,
}

/// Sum of all windows seen so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub windows: u64,
    pub elapsed_secs: f64,
    pub lines: BTreeMap<LineNo, LineTotals>,
}

impl RunSummary {
    pub fn absorb(&mut self, snapshot: &Snapshot) {
        self.windows += 1;
        self.elapsed_secs += snapshot.interval_secs;
        for line in snapshot.lines() {
            let totals = self.lines.entry(line).or_default();
            totals.time += snapshot.time(line);
            totals.count += snapshot.count(line);
        }
    }

    /// Share of the whole run spent on `line`
    #[must_use]
    pub fn share(&self, line: LineNo) -> CpuShare {
        let time = self.lines.get(&line).map(|t| t.time).unwrap_or_default();
        CpuShare::of(time, self.elapsed_secs)
    }

    #[must_use]
    pub fn frequency(&self, line: LineNo) -> Frequency {
        let count = self.lines.get(&line).map_or(0, |t| t.count);
        Frequency::of(count, self.elapsed_secs)
    }

    /// Print the per-line table shown at the end of a headless run
    pub fn write_table<W: Write>(&self, out: &mut W, source: &SourceText) -> io::Result<()> {
        writeln!(
            out,
            "lineprof: {} windows, {:.3}s",
            self.windows, self.elapsed_secs
        )?;
        writeln!(out, "{:>6}  {:>7}  {:>9}  {:>10}  {:>10}  code", "line", "share", "rate", "count", "time")?;
        for (&line, totals) in &self.lines {
            let code = source.line(line).map_or("", |l| l.text.trim());
            writeln!(
                out,
                "{line:>6}  {:>7}  {:>9}  {:>10}  {:>9.3}s  {code}",
                self.share(line).label(),
                self.frequency(line).label(),
                totals.count,
                totals.time.as_secs_f64(),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(interval_secs: f64, entries: &[(LineNo, u64, u64)]) -> Snapshot {
        let mut snapshot = Snapshot { interval_secs, ..Snapshot::empty() };
        for &(line, count, millis) in entries {
            snapshot.count_by_line.insert(line, count);
            snapshot.time_by_line.insert(line, Duration::from_millis(millis));
        }
        snapshot
    }

    #[test]
    fn test_absorb_sums_windows() {
        let mut summary = RunSummary::default();
        summary.absorb(&window(1.0, &[(1, 10, 500)]));
        summary.absorb(&window(1.0, &[(1, 5, 500), (2, 1, 0)]));

        assert_eq!(summary.windows, 2);
        assert_eq!(summary.lines[&1], LineTotals { time: Duration::from_secs(1), count: 15 });
        assert_eq!(summary.share(1).label(), "50.0%");
        assert_eq!(summary.frequency(1).label(), "7.5Hz");
        assert_eq!(summary.share(2).label(), "");
    }

    #[test]
    fn test_table_lists_measured_lines_with_code() {
        let mut summary = RunSummary::default();
        summary.absorb(&window(2.0, &[(2, 4, 1_000)]));
        let source = SourceText::new("x = 1\ny = x + 1\n");

        let mut out = Vec::new();
        summary.write_table(&mut out, &source).unwrap();
        let text = String::from_utf8(out).unwrap();

        let row = text.lines().nth(2).unwrap();
        assert!(row.contains("50.0%"), "{row}");
        assert!(row.contains("2.0Hz"), "{row}");
        assert!(row.ends_with("y = x + 1"), "{row}");
        assert_eq!(text.lines().count(), 3);
    }
}
