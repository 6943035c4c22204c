// Position codes and roster slot labels.
//
// The engine works exclusively with the closed `Position` set and the
// `(position, index)` pair type `SlotLabel`. String forms ("1B,OF",
// "DH/OF", "UTIL2") exist only at the import/display boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Baseball position codes used by roster templates and player eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Catcher,
    FirstBase,
    SecondBase,
    ShortStop,
    ThirdBase,
    Outfield,
    DesignatedHitter,
    Utility,
    Pitcher,
    StartingPitcher,
    ReliefPitcher,
}

impl Position {
    /// Parse a position code string (case-insensitive).
    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "C" => Some(Position::Catcher),
            "1B" => Some(Position::FirstBase),
            "2B" => Some(Position::SecondBase),
            "SS" => Some(Position::ShortStop),
            "3B" => Some(Position::ThirdBase),
            "OF" => Some(Position::Outfield),
            "DH" => Some(Position::DesignatedHitter),
            "UTIL" => Some(Position::Utility),
            "P" => Some(Position::Pitcher),
            "SP" => Some(Position::StartingPitcher),
            "RP" => Some(Position::ReliefPitcher),
            _ => None,
        }
    }

    /// The canonical code string for this position.
    pub fn code(&self) -> &'static str {
        match self {
            Position::Catcher => "C",
            Position::FirstBase => "1B",
            Position::SecondBase => "2B",
            Position::ShortStop => "SS",
            Position::ThirdBase => "3B",
            Position::Outfield => "OF",
            Position::DesignatedHitter => "DH",
            Position::Utility => "UTIL",
            Position::Pitcher => "P",
            Position::StartingPitcher => "SP",
            Position::ReliefPitcher => "RP",
        }
    }

    /// Single-instance infield positions tried before any numbered slot:
    /// C, 1B, 2B, SS, 3B. Everything else (OF, UTIL, pitchers, DH) is
    /// handled by a dedicated resolver step.
    pub fn is_single_instance(&self) -> bool {
        matches!(
            self,
            Position::Catcher
                | Position::FirstBase
                | Position::SecondBase
                | Position::ShortStop
                | Position::ThirdBase
        )
    }

    /// Positions whose roster slots carry a numeric suffix (OF1, UTIL2, P7).
    pub fn is_numbered(&self) -> bool {
        matches!(self, Position::Outfield | Position::Utility | Position::Pitcher)
    }

    /// Whether this code denotes a pitching role.
    pub fn is_pitching(&self) -> bool {
        matches!(
            self,
            Position::Pitcher | Position::StartingPitcher | Position::ReliefPitcher
        )
    }

    /// DH eligibility is just UTIL eligibility for roster purposes.
    pub fn normalize_dh(self) -> Self {
        if self == Position::DesignatedHitter {
            Position::Utility
        } else {
            self
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A concrete roster slot: a position plus a 1-based slot index.
///
/// Numbered positions render with their index ("OF2", "P7"); single-slot
/// positions render as the bare code ("C", "SS") to match how rosters are
/// displayed and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotLabel {
    pub position: Position,
    pub index: u32,
}

impl SlotLabel {
    pub fn new(position: Position, index: u32) -> Self {
        SlotLabel { position, index }
    }

    /// The bare (index 1) slot for a single-instance position.
    pub fn bare(position: Position) -> Self {
        SlotLabel { position, index: 1 }
    }

    /// Parse a label string like "C", "OF2", "UTIL3", "P11".
    ///
    /// Only the *trailing* digits are a slot index — "1B" and "3B" are
    /// plain codes, not indexed labels.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let split_at = s
            .bytes()
            .rposition(|b| !b.is_ascii_digit())
            .map(|i| i + 1)
            .unwrap_or(0);
        let (code, digits) = s.split_at(split_at);
        let position = Position::from_code(code)?;
        let index = if digits.is_empty() {
            1
        } else {
            digits.parse().ok().filter(|&i| i >= 1)?
        };
        Some(SlotLabel { position, index })
    }
}

impl fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.position.is_numbered() {
            write!(f, "{}{}", self.position.code(), self.index)
        } else {
            write!(f, "{}", self.position.code())
        }
    }
}

/// Parse a delimited eligibility list from an import boundary.
///
/// Accepts both comma-separated ("1B,OF") and slash-separated ("DH/OF")
/// forms; unknown codes are dropped. DH is preserved here — the resolver
/// applies the DH→UTIL substitution itself.
pub fn parse_position_list(s: &str) -> Vec<Position> {
    s.replace('/', ",")
        .split(',')
        .filter_map(Position::from_code)
        .collect()
}
