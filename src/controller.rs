use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, WardConfig, WardError};
use crate::model::{Model, Modus};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &WardConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, WardError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            return Ok(self.handle_key(key, model.modus(), model.raw_keyevents()));
        }
        Ok(None)
    }

    fn handle_key(&self, key: KeyEvent, modus: Modus, raw: bool) -> Option<Message> {
        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            return Some(Message::Quit);
        }
        let message = if raw {
            Some(Message::RawKey(key))
        } else {
            match modus {
                Modus::TABLE => Self::table_key(key),
                Modus::POPUP => match key.code {
                    KeyCode::Char('q') => Some(Message::Quit),
                    KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') => Some(Message::Exit),
                    _ => None,
                },
                Modus::CONFIRM => match key.code {
                    KeyCode::Char('y') | KeyCode::Enter => Some(Message::Confirm),
                    KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => Some(Message::Exit),
                    _ => None,
                },
                Modus::FORM | Modus::CMDINPUT => Some(Message::RawKey(key)),
            }
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    fn table_key(key: KeyEvent) -> Option<Message> {
        match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Tab => Some(Message::NextTab),
            KeyCode::BackTab => Some(Message::PreviousTab),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::PageUp => Some(Message::PreviousPage),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Char(c @ '1'..='9') => c.to_digit(10).map(|d| Message::GotoPage(d as usize)),
            KeyCode::Char('n') => Some(Message::Create),
            KeyCode::Char('e') | KeyCode::Enter => Some(Message::Edit),
            KeyCode::Char('d') | KeyCode::Delete => Some(Message::Delete),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('s') => Some(Message::SortNext),
            KeyCode::Char('S') => Some(Message::SortReverse),
            KeyCode::Char('y') => Some(Message::CopyRow),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn controller() -> Controller {
        Controller::new(&WardConfig::default())
    }

    #[test]
    fn table_keys() {
        let c = controller();
        let map = |code| c.handle_key(press(code), Modus::TABLE, false);
        assert_eq!(map(KeyCode::Char('q')), Some(Message::Quit));
        assert_eq!(map(KeyCode::Char('3')), Some(Message::GotoPage(3)));
        assert_eq!(map(KeyCode::Char('0')), None);
        assert_eq!(map(KeyCode::Enter), Some(Message::Edit));
        assert_eq!(map(KeyCode::Char('S')), Some(Message::SortReverse));
        assert_eq!(map(KeyCode::BackTab), Some(Message::PreviousTab));
    }

    #[test]
    fn confirm_keys() {
        let c = controller();
        let map = |code| c.handle_key(press(code), Modus::CONFIRM, false);
        assert_eq!(map(KeyCode::Char('y')), Some(Message::Confirm));
        assert_eq!(map(KeyCode::Char('q')), Some(Message::Exit));
        assert_eq!(map(KeyCode::Char('d')), None);
    }

    #[test]
    fn raw_mode_passes_keys_through() {
        let c = controller();
        let key = press(KeyCode::Char('q'));
        assert_eq!(c.handle_key(key, Modus::FORM, true), Some(Message::RawKey(key)));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(c.handle_key(ctrl_c, Modus::FORM, true), Some(Message::Quit));
    }
}
