//! Raw ingest rows and canonical fact rows.

use serde::{Deserialize, Serialize};

use super::position::{Position, PositionGroup};

/// One raw row per (player, season, team stint) exactly as read from the
/// source table.
///
/// Every field is an optional string: values may be absent, hold the
/// missing-value sentinel, or fail to parse. Nothing about this type is
/// trusted until it has been through the canonicalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    #[serde(rename = "seas_id")]
    pub row_id: Option<String>,
    pub season: Option<String>,
    pub player_id: Option<String>,
    pub player: Option<String>,
    pub birth_year: Option<String>,
    #[serde(rename = "pos")]
    pub position: Option<String>,
    pub age: Option<String>,
    pub experience: Option<String>,
    #[serde(rename = "lg")]
    pub league: Option<String>,
    #[serde(rename = "tm")]
    pub team: Option<String>,
    #[serde(rename = "g")]
    pub games: Option<String>,
    #[serde(rename = "gs")]
    pub games_started: Option<String>,
    #[serde(rename = "mp")]
    pub minutes: Option<String>,
    pub fg: Option<String>,
    pub fga: Option<String>,
    pub fg_percent: Option<String>,
    pub x3p: Option<String>,
    pub x3pa: Option<String>,
    pub x3p_percent: Option<String>,
    pub x2p: Option<String>,
    pub x2pa: Option<String>,
    pub x2p_percent: Option<String>,
    pub e_fg_percent: Option<String>,
    pub ft: Option<String>,
    pub fta: Option<String>,
    pub ft_percent: Option<String>,
    pub orb: Option<String>,
    pub drb: Option<String>,
    pub trb: Option<String>,
    pub ast: Option<String>,
    pub stl: Option<String>,
    pub blk: Option<String>,
    pub tov: Option<String>,
    pub pf: Option<String>,
    pub pts: Option<String>,
}

/// Columns the raw source must carry. Anything else is optional.
pub const REQUIRED_RAW_COLUMNS: &[&str] = &[
    "seas_id", "season", "player_id", "player", "pos", "tm", "g", "pts", "trb", "ast", "fg",
    "fga", "ft", "fta",
];

/// Canonical season row for one player on one team.
///
/// Produced once by the canonicalizer and read-only afterwards. Identity is
/// `(player_id, season, team)`; `player` is a display name and is not unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    pub row_id: Option<i64>,
    pub season: i32,
    pub player_id: i64,
    pub player: String,
    pub birth_year: Option<i32>,
    pub position: Position,
    pub position_original: String,
    pub position_group: PositionGroup,
    pub age: Option<i32>,
    pub experience: Option<String>,
    pub league: Option<String>,
    pub team: String,

    pub games: i64,
    #[serde(flatten)]
    pub stats: StatLine,

    // Derived in the canonicalizer; null whenever the division is not finite.
    pub ppg: Option<f64>,
    pub rpg: Option<f64>,
    pub apg: Option<f64>,
    pub spg: Option<f64>,
    pub bpg: Option<f64>,
    pub mpg: Option<f64>,
    pub ts_percent: Option<f64>,
}

/// Box-score totals and shooting rates for one season stint. Every field is
/// nullable; games played lives on [`FactRecord`] because it is not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    pub games_started: Option<i64>,
    pub minutes: Option<f64>,

    pub fg: Option<i64>,
    pub fga: Option<i64>,
    pub fg_percent: Option<f64>,
    pub x3p: Option<i64>,
    pub x3pa: Option<i64>,
    pub x3p_percent: Option<f64>,
    pub x2p: Option<i64>,
    pub x2pa: Option<i64>,
    pub x2p_percent: Option<f64>,
    pub e_fg_percent: Option<f64>,
    pub ft: Option<i64>,
    pub fta: Option<i64>,
    pub ft_percent: Option<f64>,

    pub orb: Option<i64>,
    pub drb: Option<i64>,
    pub trb: Option<i64>,
    pub ast: Option<i64>,
    pub stl: Option<i64>,
    pub blk: Option<i64>,
    pub tov: Option<i64>,
    pub pf: Option<i64>,
    pub pts: Option<i64>,
}

/// Identity key of a fact row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactKey {
    pub player_id: i64,
    pub season: i32,
    pub team: String,
}

impl FactRecord {
    /// Per-game derived fields, in the order they are computed.
    pub fn per_game(&self) -> [Option<f64>; 6] {
        [self.ppg, self.rpg, self.apg, self.spg, self.bpg, self.mpg]
    }
}

/// `numerator / denominator`, or `None` when either side is missing or the
/// quotient is not finite (zero denominator included).
pub fn finite_ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let value = numerator? / denominator?;
    value.is_finite().then_some(value)
}

/// True shooting percentage: `pts / (2 × (fga + 0.44 × fta))`.
pub fn true_shooting(pts: Option<i64>, fga: Option<i64>, fta: Option<i64>) -> Option<f64> {
    let attempts = 2.0 * (fga? as f64 + 0.44 * fta? as f64);
    finite_ratio(pts.map(|p| p as f64), Some(attempts))
}
