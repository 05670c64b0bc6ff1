//! Per-window export
//!
//! Writes one JSON object per published window (JSON Lines), flushed after
//! every window so an interrupted run still leaves a readable file.
//!
//! ```json
//! {"window":1,"interval_secs":1.002,"lines":[{"line":2,"count":12,"time_secs":0.5,"share":49.9,"rate":11.98}]}
//! ```

use crate::domain::ExportError;
use crate::profiling::Snapshot;
use lineprof_common::LineNo;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub window: u64,
    pub interval_secs: f64,
    pub lines: Vec<LineRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub line: LineNo,
    pub count: u64,
    pub time_secs: f64,
    /// Percent of the window
    pub share: f64,
    /// Evaluations per second
    pub rate: f64,
}

impl From<&Snapshot> for WindowRecord {
    fn from(snapshot: &Snapshot) -> Self {
        let lines = snapshot
            .lines()
            .into_iter()
            .map(|line| LineRecord {
                line,
                count: snapshot.count(line),
                time_secs: snapshot.time(line).as_secs_f64(),
                share: snapshot.share(line).0,
                rate: snapshot.frequency(line).0,
            })
            .collect();
        Self { window: snapshot.window, interval_secs: snapshot.interval_secs, lines }
    }
}

pub struct WindowExporter<W: Write> {
    writer: BufWriter<W>,
    written: u64,
}

impl WindowExporter<File> {
    /// Create (or truncate) the export file
    pub fn create(path: &Path) -> Result<Self, ExportError> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> WindowExporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: BufWriter::new(writer), written: 0 }
    }

    pub fn write_window(&mut self, snapshot: &Snapshot) -> Result<(), ExportError> {
        serde_json::to_writer(&mut self.writer, &WindowRecord::from(snapshot))?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    #[must_use]
    pub fn windows_written(&self) -> u64 {
        self.written
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> Result<W, ExportError> {
        self.writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_one_json_object_per_window() {
        let mut exporter = WindowExporter::new(Vec::new());
        let mut first = Snapshot { window: 1, interval_secs: 2.0, ..Snapshot::empty() };
        first.count_by_line.insert(3, 8);
        first.time_by_line.insert(3, Duration::from_millis(500));
        let second = Snapshot { window: 2, ..Snapshot::empty() };

        exporter.write_window(&first).unwrap();
        exporter.write_window(&second).unwrap();
        assert_eq!(exporter.windows_written(), 2);

        let text = String::from_utf8(exporter.into_inner().unwrap()).unwrap();
        let records: Vec<WindowRecord> =
            text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].window, 1);
        let line = &records[0].lines[0];
        assert_eq!(line.line, 3);
        assert_eq!(line.count, 8);
        assert!((line.share - 25.0).abs() < 1e-9);
        assert!((line.rate - 4.0).abs() < 1e-9);
        assert!(records[1].lines.is_empty());
    }
}
