//! Key bindings

use super::scroll::ScrollCommand;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Scroll(ScrollCommand),
    Quit,
}

/// Map a key press to a command; unbound keys map to `None`
#[must_use]
pub fn map_key(key: KeyEvent) -> Option<Command> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let command = match key.code {
        KeyCode::Char('c') if ctrl => Command::Quit,
        KeyCode::Char('d') => Command::Scroll(ScrollCommand::HalfPageDown),
        KeyCode::Char('u') => Command::Scroll(ScrollCommand::HalfPageUp),
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Command::Quit,
        KeyCode::Char('j') | KeyCode::Down => Command::Scroll(ScrollCommand::LineDown),
        KeyCode::Char('k') | KeyCode::Up => Command::Scroll(ScrollCommand::LineUp),
        KeyCode::Char(' ') | KeyCode::PageDown => Command::Scroll(ScrollCommand::PageDown),
        KeyCode::Char('b') | KeyCode::PageUp => Command::Scroll(ScrollCommand::PageUp),
        _ => return None,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_bindings() {
        use ScrollCommand as S;
        let cases = [
            (key(KeyCode::Char('j')), Command::Scroll(S::LineDown)),
            (key(KeyCode::Down), Command::Scroll(S::LineDown)),
            (key(KeyCode::Char('k')), Command::Scroll(S::LineUp)),
            (key(KeyCode::Up), Command::Scroll(S::LineUp)),
            (key(KeyCode::Char('d')), Command::Scroll(S::HalfPageDown)),
            (ctrl('d'), Command::Scroll(S::HalfPageDown)),
            (key(KeyCode::Char('u')), Command::Scroll(S::HalfPageUp)),
            (ctrl('u'), Command::Scroll(S::HalfPageUp)),
            (key(KeyCode::Char(' ')), Command::Scroll(S::PageDown)),
            (key(KeyCode::PageDown), Command::Scroll(S::PageDown)),
            (key(KeyCode::Char('b')), Command::Scroll(S::PageUp)),
            (key(KeyCode::PageUp), Command::Scroll(S::PageUp)),
            (key(KeyCode::Char('q')), Command::Quit),
            (key(KeyCode::Esc), Command::Quit),
            (ctrl('c'), Command::Quit),
        ];
        for (event, expected) in cases {
            assert_eq!(map_key(event), Some(expected), "{event:?}");
        }
    }

    #[test]
    fn test_unbound_keys() {
        assert_eq!(map_key(key(KeyCode::Char('c'))), None);
        assert_eq!(map_key(key(KeyCode::Enter)), None);
    }
}
