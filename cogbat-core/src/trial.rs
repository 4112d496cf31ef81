use crate::phase::TrialType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbolic keys the battery understands. Everything else is dropped at the
/// frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Return,
    Backspace,
    Space,
    Digit(u8),
    Abort,
}

impl Key {
    pub fn digit(&self) -> Option<u8> {
        match self {
            Key::Digit(d) => Some(*d),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Key::Left => "left".into(),
            Key::Right => "right".into(),
            Key::Up => "up".into(),
            Key::Down => "down".into(),
            Key::Return => "return".into(),
            Key::Backspace => "backspace".into(),
            Key::Space => "space".into(),
            Key::Digit(d) => d.to_string(),
            Key::Abort => "abort".into(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// What a participant gave during a response window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Key(Key),
    Entry(String),
}

impl Response {
    pub fn key(&self) -> Option<Key> {
        match self {
            Response::Key(k) => Some(*k),
            Response::Entry(_) => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Response::Key(k) => k.label(),
            Response::Entry(s) => s.clone(),
        }
    }
}

/// One trial specification placed in a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial<S> {
    pub spec: S,
    /// 1-based block number as written to the sheet.
    pub block: usize,
    pub trial_type: TrialType,
    /// 0-based position inside the block.
    pub index: usize,
    pub block_len: usize,
}

impl<S> Trial<S> {
    pub fn is_practice(&self) -> bool {
        self.trial_type.is_practice()
    }

    pub fn is_last_in_block(&self) -> bool {
        self.index + 1 == self.block_len
    }
}

/// Filled in once, right after the response window resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub response: Option<Response>,
    pub rt_ms: Option<u64>,
    pub correct: bool,
    pub iti_ms: Option<u64>,
}

impl TrialResult {
    pub fn missed(&self) -> bool {
        self.response.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTrial<S> {
    pub trial: Trial<S>,
    pub result: TrialResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_labels_match_sheet_values() {
        assert_eq!(Key::Left.label(), "left");
        assert_eq!(Key::Digit(7).to_string(), "7");
        assert_eq!(Response::Entry("975".into()).label(), "975");
        assert_eq!(Response::Key(Key::Right).key(), Some(Key::Right));
    }

    #[test]
    fn last_trial_in_block() {
        let t = Trial {
            spec: (),
            block: 1,
            trial_type: TrialType::Main,
            index: 3,
            block_len: 4,
        };
        assert!(t.is_last_in_block());
        assert!(!t.is_practice());
    }
}
