//! Raw-mode terminal ownership
//!
//! The dashboard may stop from the quit key, a signal, a render failure or a
//! panic on any thread. Each path calls [`TerminalGuard::restore`]; only the
//! first call touches the terminal.
//!
//! Frames are drawn through [`TerminalGuard::while_active`], which shares a
//! lock with `restore`, so no frame reaches the main screen after it is
//! restored.

use crate::domain::TuiError;
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug)]
pub struct TerminalGuard {
    restored: AtomicBool,
    /// Held while a frame is written and while restoring
    screen: Mutex<()>,
}

impl TerminalGuard {
    /// Enter raw mode and the alternate screen, and restore on panic
    pub fn enter() -> Result<Arc<Self>, TuiError> {
        enable_raw_mode().map_err(|e| TuiError::TerminalError(e.to_string()))?;
        let guard = Arc::new(Self { restored: AtomicBool::new(false), screen: Mutex::new(()) });
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, Hide) {
            guard.restore();
            return Err(e.into());
        }

        let hook_guard = Arc::clone(&guard);
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            hook_guard.restore_from_panic();
            previous(info);
        }));
        Ok(guard)
    }

    /// Leave raw mode and the alternate screen; no-op after the first call
    ///
    /// Waits for a frame being drawn to finish.
    pub fn restore(&self) {
        let _screen = self.screen.lock().unwrap_or_else(PoisonError::into_inner);
        self.leave();
    }

    /// Restore without waiting: the panicking thread may be the one drawing
    fn restore_from_panic(&self) {
        let _screen = self.screen.try_lock().ok();
        self.leave();
    }

    fn leave(&self) {
        if self.restored.swap(true, Ordering::AcqRel) {
            return;
        }
        disable_raw_mode().ok();
        execute!(io::stdout(), LeaveAlternateScreen, Show).ok();
    }

    /// Run `draw` unless the terminal has been restored
    pub fn while_active<R>(&self, draw: impl FnOnce() -> R) -> Option<R> {
        let _screen = self.screen.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_restored() {
            None
        } else {
            Some(draw())
        }
    }

    #[must_use]
    pub fn is_restored(&self) -> bool {
        self.restored.load(Ordering::Acquire)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Guard that never entered raw mode
    fn detached(restored: bool) -> TerminalGuard {
        TerminalGuard { restored: AtomicBool::new(restored), screen: Mutex::new(()) }
    }

    #[test]
    fn test_draw_runs_while_active() {
        let guard = detached(false);
        assert_eq!(guard.while_active(|| 7), Some(7));
        assert!(!guard.is_restored());
        guard.restored.store(true, Ordering::Release);
    }

    #[test]
    fn test_no_draw_after_restore() {
        let guard = detached(true);
        let mut drawn = false;
        assert_eq!(guard.while_active(|| drawn = true), None);
        assert!(!drawn);
    }

    #[test]
    fn test_restore_waits_for_frame() {
        let guard = Arc::new(detached(false));
        let (started_tx, started_rx) = crossbeam_channel::bounded(1);
        let drawer = Arc::clone(&guard);
        let frame = std::thread::spawn(move || {
            drawer.while_active(|| {
                started_tx.send(()).unwrap();
                std::thread::sleep(std::time::Duration::from_millis(50));
                drawer.is_restored()
            })
        });

        started_rx.recv().unwrap();
        // same lock as restore, without touching the real terminal
        let screen = guard.screen.lock().unwrap();
        guard.restored.store(true, Ordering::Release);
        drop(screen);

        assert_eq!(frame.join().unwrap(), Some(false), "frame finished before restore");
        assert_eq!(guard.while_active(|| ()), None);
    }
}
