//! Source panel renderer
//!
//! A pure mapping from (snapshot, scroll offset, source text) to buffer
//! cells. Each visible row is laid out as
//!
//! ```text
//!  col 1     col 8     col 17
//!  │         │         │
//!   50.0%    12.3kHz   total += i
//! ```
//!
//! Percent and frequency are right-aligned in their columns and left blank
//! when negligible. The code is drawn in its emphasis tier, then keyword
//! spans are painted over it.

use super::theme::{emphasis_style, STYLE_KEYWORD, STYLE_METRIC};
use crate::domain::{Emphasis, SourceText};
use crate::profiling::Snapshot;
use lineprof_common::LineNo;
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

pub const PERCENT_COL: u16 = 1;
pub const FREQ_COL: u16 = 8;
pub const CODE_COL: u16 = 17;

const PERCENT_WIDTH: usize = 6;
const FREQ_WIDTH: usize = 8;

/// Display values for one source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMetrics {
    pub percent: String,
    pub freq: String,
    pub emphasis: Emphasis,
}

#[must_use]
pub fn line_metrics(snapshot: &Snapshot, line: LineNo) -> LineMetrics {
    let share = snapshot.share(line);
    LineMetrics {
        percent: share.label(),
        freq: snapshot.frequency(line).label(),
        emphasis: share.emphasis(),
    }
}

/// Widget drawing the visible slice of the source
pub struct SourceView<'a> {
    source: &'a SourceText,
    snapshot: &'a Snapshot,
    offset: usize,
}

impl<'a> SourceView<'a> {
    #[must_use]
    pub fn new(source: &'a SourceText, snapshot: &'a Snapshot, offset: usize) -> Self {
        Self { source, snapshot, offset }
    }
}

impl Widget for SourceView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let visible = self.source.from_index(self.offset).iter().take(usize::from(area.height));
        for (row, (source_line, index)) in visible.zip(self.offset..).enumerate() {
            let Ok(line) = LineNo::try_from(index + 1) else { break };
            let Ok(row) = u16::try_from(row) else { break };
            let y = area.y + row;
            let metrics = line_metrics(self.snapshot, line);

            put(buf, area, PERCENT_COL, y, &format!("{:>PERCENT_WIDTH$}", metrics.percent), STYLE_METRIC);
            put(buf, area, FREQ_COL, y, &format!("{:>FREQ_WIDTH$}", metrics.freq), STYLE_METRIC);

            let code_style = emphasis_style(metrics.emphasis);
            put(buf, area, CODE_COL, y, &source_line.text, code_style);
            for span in &source_line.keywords {
                let Ok(column) = u16::try_from(span.column) else { continue };
                put(buf, area, CODE_COL.saturating_add(column), y, span.text, code_style.patch(STYLE_KEYWORD));
            }
        }
    }
}

/// Write `text` at a column relative to `area`, clipped to its right edge
fn put(buf: &mut Buffer, area: Rect, column: u16, y: u16, text: &str, style: ratatui::style::Style) {
    if column >= area.width {
        return;
    }
    let max_width = usize::from(area.width - column);
    buf.set_stringn(area.x + column, y, text, max_width, style);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::theme::{CAUTION_AMBER, CRITICAL_RED, KEYWORD_CYAN};
    use ratatui::style::Modifier;
    use std::time::Duration;

    fn snapshot(entries: &[(LineNo, u64, u64)]) -> Snapshot {
        let mut snapshot = Snapshot { window: 1, interval_secs: 1.0, ..Snapshot::empty() };
        for &(line, count, millis) in entries {
            snapshot.count_by_line.insert(line, count);
            snapshot.time_by_line.insert(line, Duration::from_millis(millis));
        }
        snapshot
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol()).collect()
    }

    #[test]
    fn test_line_metrics_tiers() {
        let snap = snapshot(&[(1, 2, 500), (2, 3, 60), (3, 1_500, 2)]);
        assert_eq!(
            line_metrics(&snap, 1),
            LineMetrics { percent: "50.0%".into(), freq: "2.0Hz".into(), emphasis: Emphasis::Strong }
        );
        assert_eq!(line_metrics(&snap, 2).emphasis, Emphasis::Moderate);
        assert_eq!(line_metrics(&snap, 3).freq, "1.5kHz");
        assert_eq!(line_metrics(&snap, 3).percent, "0.2%");
        assert_eq!(line_metrics(&snap, 4), LineMetrics { percent: String::new(), freq: String::new(), emphasis: Emphasis::Plain });
    }

    #[test]
    fn test_columns_and_emphasis_cells() {
        let source = SourceText::new("x = 1\nwhile x:\n    x = 0\n");
        let snap = snapshot(&[(1, 1, 500), (3, 4, 100)]);
        let area = Rect::new(0, 0, 40, 3);
        let mut buf = Buffer::empty(area);
        SourceView::new(&source, &snap, 0).render(area, &mut buf);

        let first = row_text(&buf, 0);
        assert_eq!(&first[1..7], " 50.0%");
        assert_eq!(&first[8..16], "   1.0Hz");
        assert_eq!(&first[17..22], "x = 1");
        assert_eq!(buf[(17, 0)].fg, CRITICAL_RED);
        assert!(buf[(17, 0)].modifier.contains(Modifier::BOLD));

        let second = row_text(&buf, 1);
        assert_eq!(second[..17].trim(), "");
        assert_eq!(buf[(17, 1)].fg, KEYWORD_CYAN, "keyword overlay");

        assert_eq!(buf[(21, 2)].fg, CAUTION_AMBER);
    }

    #[test]
    fn test_offset_skips_lines_outside_viewport() {
        let source = SourceText::new("a = 1\nb = 2\nc = 3\nd = 4\n");
        let snap = snapshot(&[(3, 1, 0)]);
        let area = Rect::new(0, 0, 30, 2);
        let mut buf = Buffer::empty(area);
        SourceView::new(&source, &snap, 2).render(area, &mut buf);

        assert!(row_text(&buf, 0).ends_with(&format!("c = 3{}", " ".repeat(8))));
        assert!(row_text(&buf, 0).contains("1.0Hz"));
        assert!(row_text(&buf, 1).contains("d = 4"));
    }

    #[test]
    fn test_keyword_overlay_after_wide_characters() {
        let source = SourceText::new("s = '漢字'; return s\n");
        let snap = snapshot(&[]);
        let area = Rect::new(0, 0, 40, 1);
        let mut buf = Buffer::empty(area);
        SourceView::new(&source, &snap, 0).render(area, &mut buf);

        let at = CODE_COL + 12;
        assert_eq!(buf[(at, 0)].symbol(), "r");
        assert_eq!(buf[(at, 0)].fg, KEYWORD_CYAN);
        assert_eq!(buf[(at + 5, 0)].symbol(), "n");
        assert_eq!(buf[(at + 5, 0)].fg, KEYWORD_CYAN);
        assert_ne!(buf[(at + 7, 0)].fg, KEYWORD_CYAN);
    }

    #[test]
    fn test_narrow_area_clips() {
        let source = SourceText::new("value = compute(1, 2, 3)\n");
        let snap = snapshot(&[]);
        let area = Rect::new(0, 0, 20, 1);
        let mut buf = Buffer::empty(area);
        SourceView::new(&source, &snap, 0).render(area, &mut buf);
        assert_eq!(&row_text(&buf, 0)[17..], "val");
    }
}
