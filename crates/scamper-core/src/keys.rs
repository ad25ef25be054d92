//! Keyboard key identifiers.
//!
//! Keys arrive from the input boundary as strings (`"W"`, `"ArrowUp"`, ...).
//! They are lowercased before matching, so `"w"` and `"W"` are the same key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalized key identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Key {
    /// `w`
    W,
    /// `a`
    A,
    /// `s`
    S,
    /// `d`
    D,
    /// `arrowup`
    ArrowUp,
    /// `arrowdown`
    ArrowDown,
    /// `arrowleft`
    ArrowLeft,
    /// `arrowright`
    ArrowRight,
    /// `" "`
    Space,
    /// `enter`
    Enter,
    /// `escape`
    Escape,
    /// Anything else, lowercased.
    Other(String),
}

/// Which movement axis a key drives, and in which direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisInput {
    /// Horizontal, `-1` (left) or `1` (right).
    X(i8),
    /// Vertical, `-1` (up) or `1` (down); screen space grows downward.
    Y(i8),
}

impl Key {
    /// Parses a raw key string, case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "w" => Self::W,
            "a" => Self::A,
            "s" => Self::S,
            "d" => Self::D,
            "arrowup" => Self::ArrowUp,
            "arrowdown" => Self::ArrowDown,
            "arrowleft" => Self::ArrowLeft,
            "arrowright" => Self::ArrowRight,
            " " | "space" => Self::Space,
            "enter" => Self::Enter,
            "escape" => Self::Escape,
            other => Self::Other(other.to_owned()),
        }
    }

    /// The canonical lowercase identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::W => "w",
            Self::A => "a",
            Self::S => "s",
            Self::D => "d",
            Self::ArrowUp => "arrowup",
            Self::ArrowDown => "arrowdown",
            Self::ArrowLeft => "arrowleft",
            Self::ArrowRight => "arrowright",
            Self::Space => " ",
            Self::Enter => "enter",
            Self::Escape => "escape",
            Self::Other(s) => s,
        }
    }

    /// WASD and the arrow keys map onto a movement axis.
    #[must_use]
    pub const fn axis(&self) -> Option<AxisInput> {
        match self {
            Self::W | Self::ArrowUp => Some(AxisInput::Y(-1)),
            Self::S | Self::ArrowDown => Some(AxisInput::Y(1)),
            Self::A | Self::ArrowLeft => Some(AxisInput::X(-1)),
            Self::D | Self::ArrowRight => Some(AxisInput::X(1)),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Key {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for Key {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.as_str().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!(Key::parse("W"), Key::W);
        assert_eq!(Key::parse("ArrowLeft"), Key::ArrowLeft);
        assert_eq!(Key::parse("Q"), Key::Other("q".into()));
    }

    #[test]
    fn movement_keys_map_to_axes() {
        assert_eq!(Key::ArrowUp.axis(), Some(AxisInput::Y(-1)));
        assert_eq!(Key::D.axis(), Some(AxisInput::X(1)));
        assert_eq!(Key::Enter.axis(), None);
    }

    #[test]
    fn keys_round_trip_through_strings() {
        let json = serde_json::to_string(&Key::ArrowDown).unwrap();
        assert_eq!(json, "\"arrowdown\"");
        assert_eq!(serde_json::from_str::<Key>("\"S\"").unwrap(), Key::S);
    }
}
