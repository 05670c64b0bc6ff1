use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

use super::theme::{CAUTION_AMBER, CRITICAL_RED, HUD_GREEN, INFO_DIM};
use crate::profiling::Snapshot;
use crate::scheduler::RunStatus;

const STYLE_DIM: Style = Style::new().fg(INFO_DIM);
const STYLE_KEY: Style = Style::new().fg(CAUTION_AMBER);

/// Run status tag and its color
#[must_use]
pub fn status_tag(status: &RunStatus) -> Span<'static> {
    match status {
        RunStatus::Running => {
            Span::styled("[LIVE]", Style::new().fg(CRITICAL_RED).add_modifier(Modifier::BOLD))
        }
        RunStatus::Finished => {
            Span::styled("[DONE]", Style::new().fg(HUD_GREEN).add_modifier(Modifier::BOLD))
        }
        RunStatus::Faulted(_) => {
            Span::styled("[FAULT]", Style::new().fg(CAUTION_AMBER).add_modifier(Modifier::BOLD))
        }
    }
}

/// Header: name, run state, script, window and skipped statements
#[must_use]
pub fn header_line(title: &str, status: &RunStatus, snapshot: &Snapshot, skipped: usize) -> Line<'static> {
    let window = if snapshot.window == 0 {
        "window -".to_string()
    } else {
        format!("window {} ({:.2}s)", snapshot.window, snapshot.interval_secs)
    };
    let mut spans = vec![
        Span::styled("LINEPROF", Style::new().fg(HUD_GREEN).add_modifier(Modifier::BOLD)),
        Span::styled(" | ", STYLE_DIM),
        status_tag(status),
        Span::styled(" | ", STYLE_DIM),
        Span::styled(title.to_string(), Style::new().fg(HUD_GREEN)),
        Span::styled(" | ", STYLE_DIM),
        Span::styled(window, Style::new().fg(HUD_GREEN)),
    ];
    if skipped > 0 {
        spans.push(Span::styled(" | ", STYLE_DIM));
        spans.push(Span::styled(format!("{skipped} uninstrumented"), Style::new().fg(CAUTION_AMBER)));
    }
    Line::from(spans)
}

/// Status bar: key hints, then the run state or fault message
#[must_use]
pub fn status_line(status: &RunStatus) -> Line<'static> {
    let state = match status {
        RunStatus::Running => Span::styled("running", STYLE_DIM),
        RunStatus::Finished => Span::styled("program finished", Style::new().fg(HUD_GREEN)),
        RunStatus::Faulted(message) => Span::styled(message.clone(), Style::new().fg(CRITICAL_RED)),
    };
    Line::from(vec![
        Span::styled("Q", STYLE_KEY),
        Span::styled(":Quit ", STYLE_DIM),
        Span::styled("j/k", STYLE_KEY),
        Span::styled(":Line ", STYLE_DIM),
        Span::styled("d/u", STYLE_KEY),
        Span::styled(":Half ", STYLE_DIM),
        Span::styled("Space/b", STYLE_KEY),
        Span::styled(":Page ", STYLE_DIM),
        state,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_header_shows_state_and_window() {
        let snapshot = Snapshot { window: 3, interval_secs: 1.004, ..Snapshot::empty() };
        let header = text(&header_line("busy.py", &RunStatus::Running, &snapshot, 2));
        assert_eq!(header, "LINEPROF | [LIVE] | busy.py | window 3 (1.00s) | 2 uninstrumented");
    }

    #[test]
    fn test_header_before_first_window() {
        let header = text(&header_line("-", &RunStatus::Finished, &Snapshot::empty(), 0));
        assert_eq!(header, "LINEPROF | [DONE] | - | window -");
    }

    #[test]
    fn test_status_line_carries_fault() {
        let line = status_line(&RunStatus::Faulted("ZeroDivisionError: division by zero (line 4)".into()));
        assert!(text(&line).ends_with("ZeroDivisionError: division by zero (line 4)"));
        assert_eq!(status_tag(&RunStatus::Faulted(String::new())).content, "[FAULT]");
    }
}
