use lineprof::domain::{Emphasis, SourceText};
use lineprof::profiling::Snapshot;
use lineprof::scheduler::SharedState;
use lineprof::tui::render::{line_metrics, SourceView, CODE_COL, PERCENT_COL};
use lineprof::tui::scroll::ScrollCommand;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::widgets::Widget;
use std::time::Duration;

fn row(buf: &Buffer, y: u16) -> String {
    (0..buf.area.width).map(|x| buf[(x, y)].symbol()).collect()
}

#[test]
fn test_half_window_line_renders_strong() {
    let mut snapshot = Snapshot { window: 4, interval_secs: 2.0, ..Snapshot::empty() };
    snapshot.time_by_line.insert(2, Duration::from_secs(1));
    snapshot.count_by_line.insert(2, 3);

    let metrics = line_metrics(&snapshot, 2);
    assert_eq!(metrics.percent, "50.0%");
    assert_eq!(metrics.freq, "1.5Hz");
    assert_eq!(metrics.emphasis, Emphasis::Strong);

    let source = SourceText::new("import time\ntime.sleep(1)\n");
    let area = Rect::new(0, 0, 50, 2);
    let mut buf = Buffer::empty(area);
    SourceView::new(&source, &snapshot, 0).render(area, &mut buf);

    let text = row(&buf, 1);
    let percent = &text[usize::from(PERCENT_COL)..usize::from(PERCENT_COL) + 6];
    assert_eq!(percent.trim(), "50.0%");
    assert!(text[usize::from(CODE_COL)..].starts_with("time.sleep(1)"));
    assert!(buf[(CODE_COL, 1)].modifier.contains(Modifier::BOLD));
    assert!(!buf[(CODE_COL, 0)].modifier.contains(Modifier::BOLD));
}

#[test]
fn test_scroll_clamps_to_source_and_margin() {
    let shared = SharedState::new(25);
    shared.scroll.set_viewport(10);

    for _ in 0..10 {
        shared.scroll.apply(ScrollCommand::PageDown);
    }
    assert_eq!(shared.scroll.offset(), 17);

    shared.scroll.apply(ScrollCommand::HalfPageUp);
    assert_eq!(shared.scroll.offset(), 12);

    for _ in 0..10 {
        shared.scroll.apply(ScrollCommand::PageUp);
    }
    assert_eq!(shared.scroll.offset(), 0);
}

#[test]
fn test_scrolled_view_starts_at_offset() {
    let source = SourceText::new(&(1..=30).map(|i| format!("v{i} = {i}\n")).collect::<String>());
    let snapshot = Snapshot::empty();
    let area = Rect::new(0, 0, 40, 5);
    let mut buf = Buffer::empty(area);
    SourceView::new(&source, &snapshot, 20).render(area, &mut buf);

    assert!(row(&buf, 0)[usize::from(CODE_COL)..].starts_with("v21 = 21"));
    assert!(row(&buf, 4)[usize::from(CODE_COL)..].starts_with("v25 = 25"));
}
