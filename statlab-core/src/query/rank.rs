//! Ranking phase: aggregate the filtered facts per player and keep the top N.

use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use super::filter::Predicate;
use super::metric::MetricSpec;
use super::QueryError;
use crate::data::FactStore;

/// One ranked player with the aggregated metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPlayer {
    pub player_id: i64,
    pub player: String,
    pub value: f64,
}

/// Rank players by `metric` over the rows matching `predicate`.
///
/// Ordering is by aggregated value descending, ties broken by ascending
/// `player_id`, so repeated calls return the same order. Players whose metric
/// is null on every matching row are left out. `top_n <= 0` and an empty
/// match set both yield an empty list.
pub fn rank(
    store: &FactStore,
    predicate: &Predicate,
    metric: &MetricSpec,
    top_n: i64,
) -> Result<Vec<RankedPlayer>, QueryError> {
    if top_n <= 0 {
        debug!(top_n, "non-positive top_n; nothing to rank");
        return Ok(Vec::new());
    }
    let limit = IdxSize::try_from(top_n).unwrap_or(IdxSize::MAX);

    let df = store
        .scan()
        .filter(predicate.to_expr())
        .group_by_stable([col("player_id")])
        .agg([
            col("player").first().alias("player"),
            metric.aggregate_expr().alias("value"),
            metric.source_expr().count().alias("n_values"),
        ])
        .filter(col("n_values").gt(lit(0)))
        .sort_by_exprs(
            vec![col("value"), col("player_id")],
            SortMultipleOptions::default()
                .with_order_descending_multi([true, false])
                .with_nulls_last(true)
                .with_maintain_order(true),
        )
        .limit(limit)
        .collect()?;

    let ids = df.column("player_id")?.i64()?;
    let names = df.column("player")?.str()?;
    let values = df.column("value")?.f64()?;

    let ranked: Vec<RankedPlayer> = ids
        .into_iter()
        .zip(names)
        .zip(values)
        .filter_map(|((id, name), value)| {
            Some(RankedPlayer {
                player_id: id?,
                player: name?.to_string(),
                value: value?,
            })
        })
        .collect();

    debug!(metric = metric.name, top_n, ranked = ranked.len(), "ranking complete");
    Ok(ranked)
}
