//! Core transport types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The directions of a connection a lock can cover.
///
/// Directions combine like bit flags: [`Direction::All`] covers both
/// [`Direction::Send`] and [`Direction::Receive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// No direction; unlocking to this releases the lock entirely.
    #[default]
    None,
    /// The sending half.
    Send,
    /// The receiving half.
    Receive,
    /// Both halves.
    All,
}

impl Direction {
    const fn bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Send => 1,
            Self::Receive => 2,
            Self::All => 3,
        }
    }

    /// Returns `true` if every direction in `other` is covered by `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.bits() & other.bits() == other.bits()
    }

    /// Returns `true` if `self` and `other` share at least one direction.
    pub const fn intersects(self, other: Self) -> bool {
        self.bits() & other.bits() != 0
    }

    /// Returns the directions covered by either `self` or `other`.
    pub const fn union(self, other: Self) -> Self {
        match self.bits() | other.bits() {
            0 => Self::None,
            1 => Self::Send,
            2 => Self::Receive,
            _ => Self::All,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Send => write!(f, "send"),
            Self::Receive => write!(f, "receive"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Which side of the connection a charset describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharsetKind {
    /// The charset the application works in.
    Local,
    /// The charset the router works in.
    Remote,
}

impl fmt::Display for CharsetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_containment() {
        assert!(Direction::All.contains(Direction::Send));
        assert!(Direction::All.contains(Direction::Receive));
        assert!(Direction::Send.contains(Direction::None));
        assert!(!Direction::Send.contains(Direction::Receive));
        assert!(!Direction::None.intersects(Direction::All));
        assert!(Direction::Receive.intersects(Direction::All));
        assert_eq!(Direction::Send.union(Direction::Receive), Direction::All);
        assert_eq!(Direction::None.union(Direction::Send), Direction::Send);
    }
}
