//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    RotateCw,
    RotateCcw,
    SoftDrop,
    HardDrop,
    Pause,
    Restart,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, space) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k') => Action::RotateCw,
        KeyCode::Char('u') => Action::RotateCcw,
        KeyCode::Down | KeyCode::Char('j') => Action::SoftDrop,
        KeyCode::Enter | KeyCode::Char(' ') => Action::HardDrop,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_map_to_game_actions() {
        assert_eq!(key_to_action(press(KeyCode::Left)), Action::MoveLeft);
        assert_eq!(key_to_action(press(KeyCode::Right)), Action::MoveRight);
        assert_eq!(key_to_action(press(KeyCode::Up)), Action::RotateCw);
        assert_eq!(key_to_action(press(KeyCode::Down)), Action::SoftDrop);
    }

    #[test]
    fn vim_keys_mirror_arrows() {
        assert_eq!(key_to_action(press(KeyCode::Char('h'))), Action::MoveLeft);
        assert_eq!(key_to_action(press(KeyCode::Char('l'))), Action::MoveRight);
        assert_eq!(key_to_action(press(KeyCode::Char('k'))), Action::RotateCw);
        assert_eq!(key_to_action(press(KeyCode::Char('j'))), Action::SoftDrop);
        assert_eq!(key_to_action(press(KeyCode::Char('u'))), Action::RotateCcw);
    }

    #[test]
    fn control_keys() {
        assert_eq!(key_to_action(press(KeyCode::Char('p'))), Action::Pause);
        assert_eq!(key_to_action(press(KeyCode::Char('r'))), Action::Restart);
        assert_eq!(key_to_action(press(KeyCode::Char('q'))), Action::Quit);
        assert_eq!(key_to_action(press(KeyCode::Esc)), Action::Quit);
        assert_eq!(key_to_action(press(KeyCode::Enter)), Action::HardDrop);
        assert_eq!(key_to_action(press(KeyCode::Char(' '))), Action::HardDrop);
    }

    #[test]
    fn modified_keys_are_ignored() {
        let ev = KeyEvent::new(KeyCode::Left, KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ev), Action::None);
    }
}
