//! TUI color theme
//!
//! HUD-inspired color scheme for the terminal interface

use crate::domain::Emphasis;
use ratatui::style::{Color, Modifier, Style};

// HUD color scheme (F-35 inspired)
pub const HUD_GREEN: Color = Color::Rgb(0, 255, 0);
pub const CRITICAL_RED: Color = Color::Rgb(255, 0, 0);
pub const CAUTION_AMBER: Color = Color::Rgb(255, 191, 0);
pub const INFO_DIM: Color = Color::Rgb(0, 180, 0);
pub const BACKGROUND: Color = Color::Rgb(0, 20, 0);
pub const KEYWORD_CYAN: Color = Color::Rgb(0, 200, 255);

pub const STYLE_METRIC: Style = Style::new().fg(INFO_DIM);
pub const STYLE_KEYWORD: Style = Style::new().fg(KEYWORD_CYAN);
pub const STYLE_CODE: Style = Style::new().fg(Color::White);

/// Code style for a line's emphasis tier
/// - Strong: Critical (Red, bold)
/// - Moderate: Caution (Amber)
/// - Plain: default text
#[must_use]
pub fn emphasis_style(emphasis: Emphasis) -> Style {
    match emphasis {
        Emphasis::Strong => Style::new().fg(CRITICAL_RED).add_modifier(Modifier::BOLD),
        Emphasis::Moderate => Style::new().fg(CAUTION_AMBER),
        Emphasis::Plain => STYLE_CODE,
    }
}
