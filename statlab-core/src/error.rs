//! Error classification shared across the pipeline and the query path.

use serde::{Deserialize, Serialize};

/// Which class of failure an error belongs to.
///
/// Pipeline kinds (`Structural`, `Mapping`, `Identity`) abort a whole
/// canonicalization run. Query kinds are scoped to the one query that raised
/// them. An empty result is never an error and has no kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing required column, empty source, unparseable value, bad games count.
    Structural,
    /// Raw position string absent from the consolidation table.
    Mapping,
    /// Null player id, season, team or name.
    Identity,
    /// Metric name not in the registry.
    UnknownMetric,
    /// Columnar store failure (I/O, schema, polars).
    Store,
    /// Configuration file could not be read or parsed.
    Config,
}

impl ErrorKind {
    /// True for the kinds that must abort a pipeline run.
    pub fn is_pipeline_fatal(self) -> bool {
        matches!(
            self,
            ErrorKind::Structural | ErrorKind::Mapping | ErrorKind::Identity
        )
    }
}
