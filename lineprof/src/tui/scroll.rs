//! Scroll position of the source panel
//!
//! Written only by the input thread. The render thread reads the offset and
//! stores the viewport height it last drew with; both are plain atomics, so a
//! read may be one keypress stale, which the next draw corrects.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Rows the view may scroll past the last source line
pub const SCROLL_MARGIN: usize = 2;

/// Viewport height assumed before the first draw
pub const DEFAULT_VIEWPORT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollCommand {
    LineDown,
    LineUp,
    HalfPageDown,
    HalfPageUp,
    PageDown,
    PageUp,
}

#[derive(Debug)]
pub struct ScrollState {
    offset: AtomicUsize,
    viewport: AtomicUsize,
    total_lines: usize,
}

impl ScrollState {
    #[must_use]
    pub fn new(total_lines: usize) -> Self {
        Self {
            offset: AtomicUsize::new(0),
            viewport: AtomicUsize::new(DEFAULT_VIEWPORT),
            total_lines,
        }
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn viewport(&self) -> usize {
        self.viewport.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    /// Record the height of the last draw (at least one row)
    pub fn set_viewport(&self, height: usize) {
        self.viewport.store(height.max(1), Ordering::Relaxed);
    }

    /// Largest offset that still keeps the view within the margin
    #[must_use]
    pub fn max_offset(&self) -> usize {
        (self.total_lines + SCROLL_MARGIN).saturating_sub(self.viewport())
    }

    /// Apply a command and clamp; returns the new offset
    pub fn apply(&self, command: ScrollCommand) -> usize {
        let viewport = self.viewport();
        let half = (viewport / 2).max(1);
        let current = self.offset();
        let moved = match command {
            ScrollCommand::LineDown => current.saturating_add(1),
            ScrollCommand::LineUp => current.saturating_sub(1),
            ScrollCommand::HalfPageDown => current.saturating_add(half),
            ScrollCommand::HalfPageUp => current.saturating_sub(half),
            ScrollCommand::PageDown => current.saturating_add(viewport),
            ScrollCommand::PageUp => current.saturating_sub(viewport),
        };
        let clamped = moved.min(self.max_offset());
        self.offset.store(clamped, Ordering::Relaxed);
        clamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_clamps_at_margin() {
        let scroll = ScrollState::new(30);
        scroll.set_viewport(10);
        for _ in 0..100 {
            scroll.apply(ScrollCommand::LineDown);
        }
        assert_eq!(scroll.offset(), 22);
        scroll.apply(ScrollCommand::PageDown);
        assert_eq!(scroll.offset(), 22);
    }

    #[test]
    fn test_scroll_never_negative() {
        let scroll = ScrollState::new(30);
        scroll.apply(ScrollCommand::LineUp);
        scroll.apply(ScrollCommand::PageUp);
        assert_eq!(scroll.offset(), 0);
    }

    #[test]
    fn test_short_source_does_not_scroll() {
        let scroll = ScrollState::new(5);
        scroll.set_viewport(20);
        assert_eq!(scroll.apply(ScrollCommand::PageDown), 0);
    }

    #[test]
    fn test_half_page_moves_half_viewport() {
        let scroll = ScrollState::new(100);
        scroll.set_viewport(10);
        assert_eq!(scroll.apply(ScrollCommand::HalfPageDown), 5);
        assert_eq!(scroll.apply(ScrollCommand::PageDown), 15);
        assert_eq!(scroll.apply(ScrollCommand::HalfPageUp), 10);
        scroll.set_viewport(1);
        assert_eq!(scroll.apply(ScrollCommand::HalfPageDown), 11);
    }
}
