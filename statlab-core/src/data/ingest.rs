//! Raw CSV ingest with structural validation.
//!
//! The reader checks the header row for every required column before any
//! data row is deserialized, so a malformed source fails before the
//! canonicalizer ever sees it.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::domain::{RawRecord, REQUIRED_RAW_COLUMNS};
use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot open raw source {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("raw source contains no data rows")]
    Empty,
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Structural
    }
}

/// Shape of an ingested batch, logged before canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub rows: usize,
    pub columns: usize,
    pub season_range: Option<(String, String)>,
    pub unique_players: usize,
    pub unique_teams: usize,
    pub unique_positions: usize,
}

/// Read a headered CSV file into raw records.
pub fn ingest_csv(path: &Path) -> Result<Vec<RawRecord>, IngestError> {
    info!(path = %path.display(), "reading raw CSV");
    let file = File::open(path).map_err(|source| IngestError::Open {
        path: path.display().to_string(),
        source,
    })?;
    ingest_reader(file)
}

/// Read headered CSV from any reader into raw records.
pub fn ingest_reader<R: Read>(reader: R) -> Result<Vec<RawRecord>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let missing: Vec<String> = REQUIRED_RAW_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|h| h == **required))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns(missing));
    }

    let records = rdr
        .deserialize::<RawRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    if records.is_empty() {
        return Err(IngestError::Empty);
    }

    let summary = summarize(&records, headers.len());
    info!(
        rows = summary.rows,
        columns = summary.columns,
        players = summary.unique_players,
        teams = summary.unique_teams,
        positions = summary.unique_positions,
        seasons = ?summary.season_range,
        "raw source structure validated"
    );

    Ok(records)
}

/// Distinct-value counts over the raw batch.
///
/// Season bounds are compared numerically where they parse and are reported
/// as the raw strings.
pub fn summarize(records: &[RawRecord], columns: usize) -> IngestSummary {
    let distinct = |f: fn(&RawRecord) -> Option<&String>| {
        records.iter().filter_map(f).collect::<BTreeSet<_>>().len()
    };

    let mut seasons: Vec<(i64, &String)> = records
        .iter()
        .filter_map(|r| r.season.as_ref())
        .filter_map(|s| s.parse::<i64>().ok().map(|n| (n, s)))
        .collect();
    seasons.sort();
    let season_range = match (seasons.first(), seasons.last()) {
        (Some(lo), Some(hi)) => Some((lo.1.clone(), hi.1.clone())),
        _ => None,
    };

    IngestSummary {
        rows: records.len(),
        columns,
        season_range,
        unique_players: distinct(|r| r.player_id.as_ref()),
        unique_teams: distinct(|r| r.team.as_ref()),
        unique_positions: distinct(|r| r.position.as_ref()),
    }
}
