//! # Terminal User Interface (TUI)
//!
//! Live dashboard using `ratatui`: the profiled source, annotated per line
//! with CPU share and evaluation rate of the latest published window.
//!
//! ## Layout
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │ LINEPROF | [LIVE] | busy.py | window 7 (1.00s)         │  header
//! ├────────────────────────────────────────────────────────┤
//! │  50.0%    12.3kHz  total += i                           │  source panel
//! │   4.1%     1.0Hz   print(total)                         │
//! ├────────────────────────────────────────────────────────┤
//! │ Q:Quit j/k:Line d/u:Half Space/b:Page running           │  status bar
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Threads
//!
//! - `input_loop()` - blocks on key events, moves the scroll offset
//! - `render_loop()` - redraws when the dirty flag is set, idles otherwise
//!
//! The dashboard stays up after the program ends (status `[DONE]` or
//! `[FAULT]`) until the user quits.
//!
//! ## Sub-Modules
//!
//! - `render` - Source panel widget (pure cell layout)
//! - `scroll` - Scroll offset and clamping
//! - `input` - Key bindings
//! - `status` - Header and status bar lines
//! - `terminal` - Raw-mode guard
//! - `theme` - Color scheme

use crossterm::event::{self, Event, KeyEventKind};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::thread;
use std::time::Duration;

mod input;
pub mod render; // Public for testing
pub mod scroll;
mod status;
pub mod terminal;
mod theme;

use crate::domain::{SourceText, TuiError};
use crate::profiling::Snapshot;
use crate::scheduler::{RunStatus, SharedState};
use input::{map_key, Command};
use render::SourceView;
use status::{header_line, status_line};
use theme::{BACKGROUND, CRITICAL_RED, HUD_GREEN, INFO_DIM};

pub use terminal::TerminalGuard;

/// Sleep between dirty-flag checks while nothing changed
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Static content of the dashboard
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub source: SourceText,
    /// Script path as given on the command line
    pub title: String,
    /// Statements left uninstrumented
    pub skipped: usize,
}

/// Draw one frame; returns the source panel height
pub fn draw_dashboard(
    f: &mut Frame,
    view: &DashboardView,
    snapshot: &Snapshot,
    status: &RunStatus,
    offset: usize,
) -> usize {
    let outer_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Source panel
            Constraint::Length(3), // Status bar
        ])
        .split(f.area());

    let header = Paragraph::new(header_line(&view.title, status, snapshot, view.skipped)).block(
        Block::default().borders(Borders::ALL).border_style(Style::new().fg(CRITICAL_RED)),
    );
    f.render_widget(header, outer_layout[0]);

    let panel = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::new().fg(INFO_DIM))
        .style(Style::new().bg(BACKGROUND));
    let inner = panel.inner(outer_layout[1]);
    f.render_widget(panel, outer_layout[1]);
    f.render_widget(SourceView::new(&view.source, snapshot, offset), inner);

    let status_bar = Paragraph::new(status_line(status)).block(
        Block::default().borders(Borders::ALL).border_style(Style::default().fg(HUD_GREEN)),
    );
    f.render_widget(status_bar, outer_layout[2]);

    usize::from(inner.height)
}

/// Render thread body; returns once the terminal has been restored
pub fn render_loop(
    view: &DashboardView,
    shared: &SharedState,
    guard: &TerminalGuard,
) -> Result<(), TuiError> {
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    if guard.while_active(|| terminal.clear()).transpose()?.is_none() {
        return Ok(());
    }

    loop {
        if guard.is_restored() {
            return Ok(());
        }
        if !shared.dirty.take() {
            thread::sleep(IDLE_POLL);
            continue;
        }

        let snapshot = shared.current();
        let status = shared.status();
        let offset = shared.scroll.offset().min(shared.scroll.max_offset());
        let mut viewport = 0;
        let drawn = guard.while_active(|| {
            terminal
                .draw(|f| viewport = draw_dashboard(f, view, &snapshot, &status, offset))
                .map(|_| ())
        });
        match drawn {
            Some(frame) => {
                frame?;
            }
            None => return Ok(()),
        }
        shared.scroll.set_viewport(viewport);
    }
}

/// Input thread body; returns `Ok` when the user quits
pub fn input_loop(shared: &SharedState) -> Result<(), TuiError> {
    loop {
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match map_key(key) {
                Some(Command::Quit) => return Ok(()),
                Some(Command::Scroll(command)) => {
                    shared.scroll.apply(command);
                    shared.dirty.set();
                }
                None => {}
            },
            Event::Resize(..) => shared.dirty.set(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buf = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_dashboard_frame() {
        let view = DashboardView {
            source: SourceText::new("x = 1\ny = x + 1\nreturn y\n"),
            title: "three.py".into(),
            skipped: 0,
        };
        let mut snapshot = Snapshot { window: 1, interval_secs: 1.0, ..Snapshot::empty() };
        snapshot.count_by_line.insert(2, 1);
        snapshot.time_by_line.insert(2, Duration::from_millis(500));

        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        let mut viewport = 0;
        terminal
            .draw(|f| viewport = draw_dashboard(f, &view, &snapshot, &RunStatus::Finished, 0))
            .unwrap();

        assert_eq!(viewport, 4);
        let text = screen(&terminal);
        assert!(text.contains("[DONE]"));
        assert!(text.contains("three.py"));
        assert!(text.contains("50.0%"));
        assert!(text.contains("return y"));
        assert!(text.contains("program finished"));
    }
}
