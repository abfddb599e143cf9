//! Rank-then-expand query engine over the fact store.
//!
//! A query first aggregates the filtered facts to find the top N players,
//! then fetches per-season rows for that set only, using the same predicate.

pub mod expand;
pub mod filter;
pub mod metric;
pub mod orchestrator;
pub mod rank;

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::error::ErrorKind;

pub use expand::{expand, SeriesPoint};
pub use filter::{compose, Facet, Predicate, SeasonRange, NO_RESTRICTION};
pub use metric::{lookup, Aggregation, MetricSpec, DEFAULT_TOP_N, METRICS, TOP_N_OPTIONS};
pub use orchestrator::{run_query, QueryOutcome, QueryRequest, QueryResponse};
pub use rank::{rank, RankedPlayer};

/// Failure of a single query. The store is unaffected.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown metric '{name}' (known: {known})")]
    UnknownMetric { name: String, known: String },

    #[error("store query failed: {0}")]
    Store(#[from] PolarsError),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::UnknownMetric { .. } => ErrorKind::UnknownMetric,
            QueryError::Store(_) => ErrorKind::Store,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::data::FactStore;
    use crate::domain::{FactRecord, Position, StatLine};

    /// Point guard row with only `pts` set.
    pub fn fact(
        player_id: i64,
        player: &str,
        season: i32,
        team: &str,
        pts: Option<i64>,
    ) -> FactRecord {
        FactRecord {
            row_id: None,
            season,
            player_id,
            player: player.to_string(),
            birth_year: None,
            position: Position::PG,
            position_original: "PG".to_string(),
            position_group: Position::PG.group(),
            age: None,
            experience: None,
            league: None,
            team: team.to_string(),
            games: 10,
            stats: StatLine {
                pts,
                ..Default::default()
            },
            ppg: pts.map(|p| p as f64 / 10.0),
            rpg: None,
            apg: None,
            spg: None,
            bpg: None,
            mpg: None,
            ts_percent: None,
        }
    }

    pub fn store_of(records: Vec<FactRecord>) -> FactStore {
        FactStore::from_records(&records).unwrap()
    }
}
