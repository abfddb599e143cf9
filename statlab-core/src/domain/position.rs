//! Canonical playing positions and the fixed consolidation tables.
//!
//! Raw position strings come in 25 hyphenated variants ("SG-PF", "F-C", ...).
//! Each maps to exactly one of five canonical positions; anything outside the
//! table is rejected by the canonicalizer rather than defaulted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// One of the five canonical positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    PG,
    SG,
    SF,
    PF,
    C,
}

/// Coarse three-way grouping derived from [`Position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PositionGroup {
    Guard,
    Forward,
    Center,
}

/// Raw position string → canonical position.
///
/// Generic designations map to the most common specific position:
/// "F" and "F-G" to SF, "F-C" to PF, "G" and "G-F" to SG.
pub const POSITION_TABLE: &[(&str, Position)] = &[
    ("PG", Position::PG),
    ("PG-SG", Position::PG),
    ("PG-SF", Position::PG),
    ("SG", Position::SG),
    ("SG-PG", Position::SG),
    ("SG-SF", Position::SG),
    ("SG-PF", Position::SG),
    ("SG-PG-SF", Position::SG),
    ("SF", Position::SF),
    ("SF-PG", Position::SF),
    ("SF-SG", Position::SF),
    ("SF-PF", Position::SF),
    ("SF-C", Position::SF),
    ("PF", Position::PF),
    ("PF-C", Position::PF),
    ("PF-SF", Position::PF),
    ("C", Position::C),
    ("C-F", Position::C),
    ("C-PF", Position::C),
    ("C-SF", Position::C),
    ("F", Position::SF),
    ("F-C", Position::PF),
    ("F-G", Position::SF),
    ("G", Position::SG),
    ("G-F", Position::SG),
];

static POSITION_LOOKUP: LazyLock<HashMap<&'static str, Position>> =
    LazyLock::new(|| POSITION_TABLE.iter().copied().collect());

impl Position {
    pub const ALL: [Position; 5] = [
        Position::PG,
        Position::SG,
        Position::SF,
        Position::PF,
        Position::C,
    ];

    /// Consolidate a raw position string. `None` means the string is not in
    /// the table.
    pub fn consolidate(raw: &str) -> Option<Position> {
        POSITION_LOOKUP.get(raw.trim()).copied()
    }

    pub fn group(self) -> PositionGroup {
        match self {
            Position::PG | Position::SG => PositionGroup::Guard,
            Position::SF | Position::PF => PositionGroup::Forward,
            Position::C => PositionGroup::Center,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Position::PG => "PG",
            Position::SG => "SG",
            Position::SF => "SF",
            Position::PF => "PF",
            Position::C => "C",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = String;

    /// Parses a canonical code only ("PG", "SG", ...); raw variants go
    /// through [`Position::consolidate`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("not a canonical position: '{s}'"))
    }
}

impl PositionGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            PositionGroup::Guard => "Guard",
            PositionGroup::Forward => "Forward",
            PositionGroup::Center => "Center",
        }
    }
}

impl fmt::Display for PositionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Guard" => Ok(PositionGroup::Guard),
            "Forward" => Ok(PositionGroup::Forward),
            "Center" => Ok(PositionGroup::Center),
            other => Err(format!("not a position group: '{other}'")),
        }
    }
}
