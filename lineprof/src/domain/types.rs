//! Display rules for per-line measurements
//!
//! A window's raw numbers (seconds spent on a line, evaluations of it) become
//! a CPU share and an evaluation rate relative to the window length. The
//! formatting here is what both the dashboard and the headless summary show.

use std::fmt;
use std::time::Duration;

/// Shares below this many percent render blank
pub const MIN_VISIBLE_SHARE: f64 = 0.1;

/// Shares above this are drawn with strong emphasis
pub const STRONG_SHARE: f64 = 20.0;

/// Shares above this are drawn with moderate emphasis
pub const MODERATE_SHARE: f64 = 5.0;

/// Visual weight of a line, derived from its CPU share
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Emphasis {
    Plain,
    Moderate,
    Strong,
}

/// Percentage of a window's wall-clock time spent on one line
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct CpuShare(pub f64);

impl CpuShare {
    /// Share of `time` in a window `interval_secs` long
    #[must_use]
    pub fn of(time: Duration, interval_secs: f64) -> Self {
        if interval_secs > 0.0 {
            Self(100.0 * time.as_secs_f64() / interval_secs)
        } else {
            Self(0.0)
        }
    }

    #[must_use]
    pub fn emphasis(self) -> Emphasis {
        if self.0 > STRONG_SHARE {
            Emphasis::Strong
        } else if self.0 > MODERATE_SHARE {
            Emphasis::Moderate
        } else {
            Emphasis::Plain
        }
    }

    /// Column text: blank when negligible, else one decimal and `%`
    #[must_use]
    pub fn label(self) -> String {
        if self.0 < MIN_VISIBLE_SHARE {
            String::new()
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for CpuShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

/// Evaluations per second of one line
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Frequency(pub f64);

impl Frequency {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn of(count: u64, interval_secs: f64) -> Self {
        if interval_secs > 0.0 {
            Self(count as f64 / interval_secs)
        } else {
            Self(0.0)
        }
    }

    /// Column text: blank when zero, else scaled to Hz, kHz or MHz
    #[must_use]
    pub fn label(self) -> String {
        if self.0 <= 0.0 {
            String::new()
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.0;
        if hz < 1_000.0 {
            write!(f, "{hz:.1}Hz")
        } else if hz < 1_000_000.0 {
            write!(f, "{:.1}kHz", hz / 1_000.0)
        } else {
            write!(f, "{:.1}MHz", hz / 1_000_000.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_label() {
        assert_eq!(CpuShare(50.0).label(), "50.0%");
        assert_eq!(CpuShare(0.05).label(), "");
        assert_eq!(CpuShare(0.1).label(), "0.1%");
    }

    #[test]
    fn test_share_of_window() {
        let share = CpuShare::of(Duration::from_millis(500), 1.0);
        assert!((share.0 - 50.0).abs() < 1e-9);
        assert_eq!(CpuShare::of(Duration::from_secs(1), 0.0), CpuShare(0.0));
    }

    #[test]
    fn test_emphasis_tiers() {
        assert_eq!(CpuShare(50.0).emphasis(), Emphasis::Strong);
        assert_eq!(CpuShare(20.0).emphasis(), Emphasis::Moderate);
        assert_eq!(CpuShare(5.5).emphasis(), Emphasis::Moderate);
        assert_eq!(CpuShare(5.0).emphasis(), Emphasis::Plain);
    }

    #[test]
    fn test_frequency_units() {
        assert_eq!(Frequency(0.0).label(), "");
        assert_eq!(Frequency(12.34).label(), "12.3Hz");
        assert_eq!(Frequency(1_000.0).label(), "1.0kHz");
        assert_eq!(Frequency(250_000.0).label(), "250.0kHz");
        assert_eq!(Frequency(3_500_000.0).label(), "3.5MHz");
    }

    #[test]
    fn test_frequency_of_window() {
        assert_eq!(Frequency::of(1000, 0.5), Frequency(2000.0));
        assert_eq!(Frequency::of(10, 0.0), Frequency(0.0));
    }
}
