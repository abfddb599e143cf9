//! Expansion phase: per-season rows for an already ranked player set.

use std::collections::BTreeSet;

use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use super::filter::Predicate;
use super::metric::MetricSpec;
use super::QueryError;
use crate::data::FactStore;

/// One season stint of a ranked player, carrying the per-row metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub player_id: i64,
    pub player: String,
    pub season: i32,
    pub team: String,
    pub value: Option<f64>,
}

/// Fetch every row matching `predicate` whose player is in `player_ids`.
///
/// Output is ordered by display name, then season. Players sharing a name and
/// traded players with several stints in one season are ordered by
/// `player_id`, then team.
pub fn expand(
    store: &FactStore,
    predicate: &Predicate,
    player_ids: &[i64],
    metric: &MetricSpec,
) -> Result<Vec<SeriesPoint>, QueryError> {
    let ids: BTreeSet<i64> = player_ids.iter().copied().collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids = DataFrame::new(vec![Column::new(
        "player_id".into(),
        ids.into_iter().collect::<Vec<i64>>(),
    )])?;

    let df = store
        .scan()
        .filter(predicate.to_expr())
        .join(
            ids.lazy(),
            [col("player_id")],
            [col("player_id")],
            JoinArgs::new(JoinType::Inner),
        )
        .select([
            col("player_id"),
            col("player"),
            col("season"),
            col("team"),
            metric.source_expr().alias("value"),
        ])
        .sort(
            ["player", "season", "player_id", "team"],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;

    let player_id = df.column("player_id")?.i64()?;
    let player = df.column("player")?.str()?;
    let season = df.column("season")?.i32()?;
    let team = df.column("team")?.str()?;
    let value = df.column("value")?.f64()?;

    let mut series = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(id), Some(name), Some(season), Some(team)) =
            (player_id.get(i), player.get(i), season.get(i), team.get(i))
        else {
            continue;
        };
        series.push(SeriesPoint {
            player_id: id,
            player: name.to_string(),
            season,
            team: team.to_string(),
            value: value.get(i),
        });
    }

    debug!(
        metric = metric.name,
        players = player_ids.len(),
        points = series.len(),
        "expansion complete"
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::{compose, Facet};
    use crate::query::metric::lookup;
    use crate::query::test_support::{fact, store_of};

    #[test]
    fn returns_only_requested_players_in_name_season_order() {
        let store = store_of(vec![
            fact(2, "Blake", 2021, "NYK", Some(10)),
            fact(1, "Avery", 2021, "BOS", Some(20)),
            fact(3, "Casey", 2020, "LAL", Some(30)),
            fact(1, "Avery", 2020, "BOS", None),
        ]);
        let series = expand(&store, &Predicate::all(), &[1, 2], lookup("pts").unwrap()).unwrap();

        let keys: Vec<(i64, i32)> = series.iter().map(|p| (p.player_id, p.season)).collect();
        assert_eq!(keys, vec![(1, 2020), (1, 2021), (2, 2021)]);
        assert_eq!(series[0].value, None);
        assert_eq!(series[1].value, Some(20.0));
    }

    #[test]
    fn applies_the_same_predicate() {
        let store = store_of(vec![
            fact(1, "Avery", 2019, "BOS", Some(1)),
            fact(1, "Avery", 2020, "BOS", Some(2)),
            fact(1, "Avery", 2021, "BOS", Some(3)),
        ]);
        let p = compose(Some(2020), Some(2021), Facet::Any, Facet::Any, Facet::Any);
        let series = expand(&store, &p, &[1], lookup("pts").unwrap()).unwrap();
        assert!(series.iter().all(|s| (2020..=2021).contains(&s.season)));
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn traded_player_keeps_each_stint() {
        let store = store_of(vec![
            fact(7, "Gale", 2020, "NYK", Some(5)),
            fact(7, "Gale", 2020, "BOS", Some(8)),
        ]);
        let series = expand(&store, &Predicate::all(), &[7], lookup("pts").unwrap()).unwrap();
        let teams: Vec<&str> = series.iter().map(|s| s.team.as_str()).collect();
        assert_eq!(teams, vec!["BOS", "NYK"]);
    }

    #[test]
    fn empty_id_set_is_empty_series() {
        let store = store_of(vec![fact(1, "Avery", 2020, "BOS", Some(1))]);
        assert!(expand(&store, &Predicate::all(), &[], lookup("pts").unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn duplicate_ids_do_not_duplicate_rows() {
        let store = store_of(vec![fact(1, "Avery", 2020, "BOS", Some(1))]);
        let series = expand(&store, &Predicate::all(), &[1, 1], lookup("pts").unwrap()).unwrap();
        assert_eq!(series.len(), 1);
    }
}
