//! Filter composer: turns optional facet selections into one conjunctive
//! predicate that both the ranking and expansion phases evaluate.
//!
//! Each facet is either unrestricted or an equality test. The season facet is
//! an inclusive range with optional bounds. Composition never fails: an
//! inverted range is kept as given and matches no rows.

use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::FactRecord;

/// Reserved token meaning "no restriction" for a facet.
pub const NO_RESTRICTION: &str = "ALL";

/// One equality facet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Facet<T> {
    #[default]
    Any,
    Equals(T),
}

impl<T> Facet<T> {
    pub fn is_any(&self) -> bool {
        matches!(self, Facet::Any)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Facet::Any => None,
            Facet::Equals(v) => Some(v),
        }
    }

    pub fn matches<U>(&self, candidate: &U) -> bool
    where
        T: PartialEq<U>,
        U: ?Sized,
    {
        match self {
            Facet::Any => true,
            Facet::Equals(v) => v == candidate,
        }
    }
}

impl<T: FromStr> Facet<T> {
    /// Parse a facet token. Empty input and [`NO_RESTRICTION`] are `Any`.
    pub fn parse_token(token: &str) -> Result<Self, T::Err> {
        let token = token.trim();
        if token.is_empty() || token == NO_RESTRICTION {
            return Ok(Facet::Any);
        }
        token.parse().map(Facet::Equals)
    }
}

impl<T: fmt::Display> fmt::Display for Facet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::Any => f.write_str(NO_RESTRICTION),
            Facet::Equals(v) => write!(f, "{v}"),
        }
    }
}

/// Inclusive season range. A missing bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeasonRange {
    pub from: Option<i32>,
    pub to: Option<i32>,
}

impl SeasonRange {
    pub fn new(from: Option<i32>, to: Option<i32>) -> Self {
        Self { from, to }
    }

    /// True when both bounds are set and `from > to`.
    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from > to)
    }

    pub fn contains(&self, season: i32) -> bool {
        self.from.map_or(true, |from| season >= from) && self.to.map_or(true, |to| season <= to)
    }

    /// True when the range restricts `full` (the store's whole span).
    pub fn narrows(&self, full: Option<(i32, i32)>) -> bool {
        match full {
            Some((min, max)) => {
                self.from.is_some_and(|from| from != min) || self.to.is_some_and(|to| to != max)
            }
            None => self.from.is_some() || self.to.is_some(),
        }
    }
}

/// Conjunction of all facets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Predicate {
    pub seasons: SeasonRange,
    pub team: Facet<String>,
    /// Canonical position code, compared against the `position` column.
    pub position: Facet<String>,
    pub player_id: Facet<i64>,
}

/// Build a predicate from facet selections.
pub fn compose(
    season_from: Option<i32>,
    season_to: Option<i32>,
    team: Facet<String>,
    position: Facet<String>,
    player_id: Facet<i64>,
) -> Predicate {
    Predicate {
        seasons: SeasonRange::new(season_from, season_to),
        team,
        position,
        player_id,
    }
}

impl Predicate {
    /// Predicate that matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.seasons.from.is_none()
            && self.seasons.to.is_none()
            && self.team.is_any()
            && self.position.is_any()
            && self.player_id.is_any()
    }

    /// Compile to a polars filter expression. Values are bound as literals.
    pub fn to_expr(&self) -> Expr {
        let mut expr = lit(true);
        if let Some(from) = self.seasons.from {
            expr = expr.and(col("season").gt_eq(lit(from)));
        }
        if let Some(to) = self.seasons.to {
            expr = expr.and(col("season").lt_eq(lit(to)));
        }
        if let Facet::Equals(team) = &self.team {
            expr = expr.and(col("team").eq(lit(team.clone())));
        }
        if let Facet::Equals(position) = &self.position {
            expr = expr.and(col("position").eq(lit(position.clone())));
        }
        if let Facet::Equals(id) = self.player_id {
            expr = expr.and(col("player_id").eq(lit(id)));
        }
        expr
    }

    /// Row-level evaluation, equivalent to [`Predicate::to_expr`].
    pub fn matches(&self, record: &FactRecord) -> bool {
        self.seasons.contains(record.season)
            && self.team.matches(record.team.as_str())
            && self.position.matches(record.position.as_str())
            && self.player_id.matches(&record.player_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_token_is_no_restriction() {
        assert_eq!(Facet::<String>::parse_token("ALL").unwrap(), Facet::Any);
        assert_eq!(Facet::<String>::parse_token("  ").unwrap(), Facet::Any);
        assert_eq!(
            Facet::<String>::parse_token("BOS").unwrap(),
            Facet::Equals("BOS".to_string())
        );
        assert_eq!(Facet::<i64>::parse_token("23").unwrap(), Facet::Equals(23));
        assert!(Facet::<i64>::parse_token("abc").is_err());
    }

    #[test]
    fn facet_display_round_trips_token() {
        assert_eq!(Facet::<i64>::Any.to_string(), "ALL");
        assert_eq!(Facet::Equals(7i64).to_string(), "7");
    }

    #[test]
    fn empty_predicate_is_unrestricted() {
        let p = compose(None, None, Facet::Any, Facet::Any, Facet::Any);
        assert!(p.is_unrestricted());
        assert_eq!(p, Predicate::all());
    }

    #[test]
    fn inverted_range_is_kept_as_given() {
        let p = compose(Some(2020), Some(2010), Facet::Any, Facet::Any, Facet::Any);
        assert!(p.seasons.is_inverted());
        assert_eq!(p.seasons.from, Some(2020));
        assert!(!p.seasons.contains(2015));
        assert!(!p.seasons.contains(2020));
    }

    #[test]
    fn open_bounds_contain_everything_on_that_side() {
        let r = SeasonRange::new(Some(2000), None);
        assert!(r.contains(2000));
        assert!(r.contains(2100));
        assert!(!r.contains(1999));
    }

    #[test]
    fn narrows_compares_against_full_range() {
        let full = Some((1990, 2024));
        assert!(!SeasonRange::new(Some(1990), Some(2024)).narrows(full));
        assert!(!SeasonRange::default().narrows(full));
        assert!(SeasonRange::new(Some(2000), Some(2024)).narrows(full));
        assert!(SeasonRange::new(None, Some(2010)).narrows(full));
    }

    #[test]
    fn expression_filters_frame() {
        let df = DataFrame::new(vec![
            Column::new("season".into(), &[2019i32, 2020, 2021]),
            Column::new("team".into(), &["BOS", "NYK", "BOS"]),
            Column::new("position".into(), &["PG", "C", "PG"]),
            Column::new("player_id".into(), &[1i64, 2, 3]),
        ])
        .unwrap();
        let p = compose(
            Some(2020),
            None,
            Facet::Equals("BOS".into()),
            Facet::Equals("PG".into()),
            Facet::Any,
        );

        let out = df.lazy().filter(p.to_expr()).collect().unwrap();
        let ids: Vec<Option<i64>> = out
            .column("player_id")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ids, vec![Some(3)]);
    }
}
