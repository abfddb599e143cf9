//! One request/response cycle: compose the predicate, rank, expand, time it,
//! and describe the active facets.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::expand::{expand, SeriesPoint};
use super::filter::{compose, Facet, Predicate};
use super::metric::{lookup, MetricSpec, DEFAULT_TOP_N, METRICS};
use super::rank::{rank, RankedPlayer};
use super::QueryError;
use crate::data::FactStore;

pub const NO_DATA_TITLE: &str = "No Data";
pub const NO_DATA_SUBTITLE: &str = "Adjust filters to see results";
pub const UNFILTERED_SUBTITLE: &str = "All players, all time";
const FACET_SEPARATOR: &str = " • ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub metric: String,
    pub top_n: i64,
    pub season_from: Option<i32>,
    pub season_to: Option<i32>,
    pub team: Facet<String>,
    pub position: Facet<String>,
    pub player_id: Facet<i64>,
}

impl QueryRequest {
    /// Unfiltered request for `metric` with the default `top_n`.
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            top_n: DEFAULT_TOP_N as i64,
            season_from: None,
            season_to: None,
            team: Facet::Any,
            position: Facet::Any,
            player_id: Facet::Any,
        }
    }

    pub fn predicate(&self) -> Predicate {
        compose(
            self.season_from,
            self.season_to,
            self.team.clone(),
            self.position.clone(),
            self.player_id.clone(),
        )
    }
}

/// Whether a query produced anything to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryOutcome {
    Data,
    NoData,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub outcome: QueryOutcome,
    pub metric: MetricSpec,
    pub ranking: Vec<RankedPlayer>,
    pub series: Vec<SeriesPoint>,
    pub elapsed: Duration,
    pub title: String,
    pub subtitle: String,
}

impl QueryResponse {
    pub fn is_empty(&self) -> bool {
        self.outcome == QueryOutcome::NoData
    }
}

/// Run one rank-then-expand query against `store`.
///
/// An unknown metric fails the query. A query that matches nothing succeeds
/// with [`QueryOutcome::NoData`].
pub fn run_query(store: &FactStore, request: &QueryRequest) -> Result<QueryResponse, QueryError> {
    let started = Instant::now();
    let metric = lookup(&request.metric).ok_or_else(|| QueryError::UnknownMetric {
        name: request.metric.clone(),
        known: METRICS.iter().map(|m| m.name).collect::<Vec<_>>().join(", "),
    })?;

    let predicate = request.predicate();
    let ranking = rank(store, &predicate, metric, request.top_n)?;
    let ids: Vec<i64> = ranking.iter().map(|r| r.player_id).collect();
    let series = expand(store, &predicate, &ids, metric)?;
    let elapsed = started.elapsed();

    let (outcome, title, subtitle) = if series.is_empty() {
        (
            QueryOutcome::NoData,
            NO_DATA_TITLE.to_string(),
            NO_DATA_SUBTITLE.to_string(),
        )
    } else {
        (
            QueryOutcome::Data,
            format!("Top {} Players: {}", request.top_n, metric.label),
            subtitle(request, &predicate, store.season_range(), &ranking),
        )
    };

    info!(
        metric = metric.name,
        top_n = request.top_n,
        ranked = ranking.len(),
        points = series.len(),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        outcome = ?outcome,
        "query complete"
    );

    Ok(QueryResponse {
        outcome,
        metric: *metric,
        ranking,
        series,
        elapsed,
        title,
        subtitle,
    })
}

fn subtitle(
    request: &QueryRequest,
    predicate: &Predicate,
    full_range: Option<(i32, i32)>,
    ranking: &[RankedPlayer],
) -> String {
    let mut facets = Vec::new();
    if predicate.seasons.narrows(full_range) {
        let bound = |b: Option<i32>, fallback: Option<i32>| {
            b.or(fallback).map_or_else(|| "…".to_string(), |s| s.to_string())
        };
        facets.push(format!(
            "{}–{}",
            bound(request.season_from, full_range.map(|r| r.0)),
            bound(request.season_to, full_range.map(|r| r.1)),
        ));
    }
    if let Facet::Equals(team) = &request.team {
        facets.push(team.clone());
    }
    if let Facet::Equals(position) = &request.position {
        facets.push(position.clone());
    }
    if let Facet::Equals(id) = request.player_id {
        let name = ranking.iter().find(|r| r.player_id == id).map(|r| r.player.clone());
        facets.push(name.unwrap_or_else(|| format!("player {id}")));
    }

    if facets.is_empty() {
        UNFILTERED_SUBTITLE.to_string()
    } else {
        facets.join(FACET_SEPARATOR)
    }
}
