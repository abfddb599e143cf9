//! Canonicalizer: raw season rows → validated fact rows.
//!
//! Five steps run in a fixed order, each over the whole batch before the next
//! begins:
//! 1. drop combined-team rows (a traded player's season total)
//! 2. consolidate raw positions through the fixed table
//! 3. normalize missing-value sentinels to nulls and parse numbers
//! 4. validate identity fields and report duplicate keys
//! 5. derive per-game and shooting-efficiency metrics
//!
//! Any fatal error aborts the run with no facts produced.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{
    finite_ratio, true_shooting, FactKey, FactRecord, Position, RawRecord, StatLine,
};
use crate::error::ErrorKind;

/// Knobs for a canonicalization run. Lookup tables are not configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalizeOptions {
    /// Team code of the combined-team pseudo-row.
    pub combined_team: String,
    /// Literal string that stands for a missing value.
    pub missing_sentinel: String,
    /// How many duplicate keys to include in the warning log.
    pub duplicate_sample_limit: usize,
}

impl Default for CanonicalizeOptions {
    fn default() -> Self {
        Self {
            combined_team: "TOT".into(),
            missing_sentinel: "NA".into(),
            duplicate_sample_limit: 5,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CanonicalizeError {
    #[error("no raw records to canonicalize")]
    EmptyInput,

    #[error("unmapped positions: {}", .0.join(", "))]
    UnmappedPositions(Vec<String>),

    #[error("{count} records have a null player_id (first at source row {first_row})")]
    NullPlayerId { count: usize, first_row: usize },

    #[error("source row {row}: identity column '{column}' is null")]
    MissingIdentity { row: usize, column: &'static str },

    #[error("source row {row}: column '{column}' holds unparseable value '{value}'")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("source row {row}: games played must be present and non-negative, got {games:?}")]
    InvalidGames { row: usize, games: Option<i64> },
}

impl CanonicalizeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CanonicalizeError::EmptyInput
            | CanonicalizeError::InvalidValue { .. }
            | CanonicalizeError::InvalidGames { .. } => ErrorKind::Structural,
            CanonicalizeError::UnmappedPositions(_) => ErrorKind::Mapping,
            CanonicalizeError::NullPlayerId { .. } | CanonicalizeError::MissingIdentity { .. } => {
                ErrorKind::Identity
            }
        }
    }
}

/// A `(player_id, season, team)` key that appears more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateKey {
    pub key: FactKey,
    pub player: String,
    /// Source row indices carrying this key.
    pub rows: Vec<usize>,
}

/// What a successful run did to the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalizeReport {
    pub input_rows: usize,
    pub combined_rows_removed: usize,
    pub position_counts: BTreeMap<Position, usize>,
    /// Null count per column after sentinel normalization. Columns with no
    /// nulls are omitted.
    pub null_counts: BTreeMap<String, usize>,
    /// Non-fatal: aggregation will sum these rows together.
    pub duplicates: Vec<DuplicateKey>,
    /// Display names carried by more than one player id.
    pub shared_names: usize,
    pub output_rows: usize,
}

impl CanonicalizeReport {
    pub fn combined_rows_pct(&self) -> f64 {
        if self.input_rows == 0 {
            return 0.0;
        }
        self.combined_rows_removed as f64 / self.input_rows as f64 * 100.0
    }
}

/// Canonicalizer for raw season rows.
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    options: CanonicalizeOptions,
}

/// Raw row tagged with its source index and consolidated position.
struct Staged {
    source_row: usize,
    raw: RawRecord,
    position: Position,
    position_original: String,
}

/// Row after sentinel normalization: typed, identity not yet checked.
struct Normalized {
    source_row: usize,
    row_id: Option<i64>,
    season: Option<i32>,
    player_id: Option<i64>,
    player: Option<String>,
    birth_year: Option<i32>,
    position: Position,
    position_original: String,
    age: Option<i32>,
    experience: Option<String>,
    league: Option<String>,
    team: Option<String>,
    games: Option<i64>,
    stats: StatLine,
}

/// Row with identity established.
struct Identified {
    normalized: Normalized,
    season: i32,
    player_id: i64,
    player: String,
    team: String,
    games: i64,
}

impl Canonicalizer {
    pub fn new(options: CanonicalizeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CanonicalizeOptions {
        &self.options
    }

    /// Run all five steps. Either every step succeeds or nothing is returned.
    pub fn canonicalize(
        &self,
        raw: Vec<RawRecord>,
    ) -> Result<(Vec<FactRecord>, CanonicalizeReport), CanonicalizeError> {
        if raw.is_empty() {
            return Err(CanonicalizeError::EmptyInput);
        }
        let mut report = CanonicalizeReport {
            input_rows: raw.len(),
            ..Default::default()
        };
        info!(rows = raw.len(), "canonicalization started");

        info!("[1/5] dropping combined-team rows");
        let kept = self.drop_combined_rows(raw, &mut report);

        info!("[2/5] consolidating positions");
        let staged = consolidate_positions(kept, &mut report)?;

        info!("[3/5] normalizing missing values");
        let normalized = self.normalize_missing(staged, &mut report)?;

        info!("[4/5] validating identity");
        let identified = self.validate_identity(normalized, &mut report)?;

        info!("[5/5] deriving metrics");
        let facts: Vec<FactRecord> = identified.into_iter().map(derive_metrics).collect();

        report.output_rows = facts.len();
        info!(
            input = report.input_rows,
            output = report.output_rows,
            duplicates = report.duplicates.len(),
            "canonicalization complete"
        );
        Ok((facts, report))
    }

    fn drop_combined_rows(
        &self,
        raw: Vec<RawRecord>,
        report: &mut CanonicalizeReport,
    ) -> Vec<(usize, RawRecord)> {
        let combined = self.options.combined_team.as_str();
        let kept: Vec<(usize, RawRecord)> = raw
            .into_iter()
            .enumerate()
            .filter(|(_, r)| r.team.as_deref().map(str::trim) != Some(combined))
            .collect();

        report.combined_rows_removed = report.input_rows - kept.len();
        info!(
            removed = report.combined_rows_removed,
            pct = %format!("{:.1}", report.combined_rows_pct()),
            remaining = kept.len(),
            "removed {combined} rows"
        );
        kept
    }

    fn normalize_missing(
        &self,
        staged: Vec<Staged>,
        report: &mut CanonicalizeReport,
    ) -> Result<Vec<Normalized>, CanonicalizeError> {
        let mut norm = FieldNormalizer::new(&self.options.missing_sentinel);
        let mut out = Vec::with_capacity(staged.len());

        for s in staged {
            let row = s.source_row;
            let r = &s.raw;
            let stats = StatLine {
                games_started: norm.int(row, "gs", &r.games_started)?,
                minutes: norm.float(row, "mp", &r.minutes)?,
                fg: norm.int(row, "fg", &r.fg)?,
                fga: norm.int(row, "fga", &r.fga)?,
                fg_percent: norm.float(row, "fg_percent", &r.fg_percent)?,
                x3p: norm.int(row, "x3p", &r.x3p)?,
                x3pa: norm.int(row, "x3pa", &r.x3pa)?,
                x3p_percent: norm.float(row, "x3p_percent", &r.x3p_percent)?,
                x2p: norm.int(row, "x2p", &r.x2p)?,
                x2pa: norm.int(row, "x2pa", &r.x2pa)?,
                x2p_percent: norm.float(row, "x2p_percent", &r.x2p_percent)?,
                e_fg_percent: norm.float(row, "e_fg_percent", &r.e_fg_percent)?,
                ft: norm.int(row, "ft", &r.ft)?,
                fta: norm.int(row, "fta", &r.fta)?,
                ft_percent: norm.float(row, "ft_percent", &r.ft_percent)?,
                orb: norm.int(row, "orb", &r.orb)?,
                drb: norm.int(row, "drb", &r.drb)?,
                trb: norm.int(row, "trb", &r.trb)?,
                ast: norm.int(row, "ast", &r.ast)?,
                stl: norm.int(row, "stl", &r.stl)?,
                blk: norm.int(row, "blk", &r.blk)?,
                tov: norm.int(row, "tov", &r.tov)?,
                pf: norm.int(row, "pf", &r.pf)?,
                pts: norm.int(row, "pts", &r.pts)?,
            };
            out.push(Normalized {
                source_row: row,
                row_id: norm.int(row, "seas_id", &r.row_id)?,
                season: norm.int(row, "season", &r.season)?,
                player_id: norm.int(row, "player_id", &r.player_id)?,
                player: norm.text("player", &r.player),
                birth_year: norm.int(row, "birth_year", &r.birth_year)?,
                age: norm.int(row, "age", &r.age)?,
                experience: norm.text("experience", &r.experience),
                league: norm.text("lg", &r.league),
                team: norm.text("tm", &r.team),
                games: norm.int(row, "g", &r.games)?,
                position: s.position,
                position_original: s.position_original,
                stats,
            });
        }

        report.null_counts = norm
            .nulls
            .into_iter()
            .map(|(col, n)| (col.to_string(), n))
            .collect();

        let mut by_count: Vec<(&String, &usize)> = report.null_counts.iter().collect();
        by_count.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (column, count) in by_count.into_iter().take(10) {
            let pct = *count as f64 / out.len().max(1) as f64 * 100.0;
            info!(column = %column, count, pct = %format!("{pct:.1}"), "missing values");
        }
        Ok(out)
    }

    fn validate_identity(
        &self,
        rows: Vec<Normalized>,
        report: &mut CanonicalizeReport,
    ) -> Result<Vec<Identified>, CanonicalizeError> {
        let null_ids: Vec<usize> = rows
            .iter()
            .filter(|r| r.player_id.is_none())
            .map(|r| r.source_row)
            .collect();
        if let Some(&first_row) = null_ids.first() {
            warn!(count = null_ids.len(), "null player_id values");
            return Err(CanonicalizeError::NullPlayerId {
                count: null_ids.len(),
                first_row,
            });
        }

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let row = r.source_row;
            let missing = |column| CanonicalizeError::MissingIdentity { row, column };
            let player_id = r.player_id.ok_or_else(|| missing("player_id"))?;
            let season = r.season.ok_or_else(|| missing("season"))?;
            let team = r.team.clone().ok_or_else(|| missing("tm"))?;
            let player = r.player.clone().ok_or_else(|| missing("player"))?;
            let games = match r.games {
                Some(g) if g >= 0 => g,
                other => return Err(CanonicalizeError::InvalidGames { row, games: other }),
            };
            out.push(Identified {
                normalized: r,
                season,
                player_id,
                player,
                team,
                games,
            });
        }

        report.duplicates = find_duplicates(&out);
        if !report.duplicates.is_empty() {
            let total_rows: usize = report.duplicates.iter().map(|d| d.rows.len()).sum();
            warn!(
                keys = report.duplicates.len(),
                rows = total_rows,
                "duplicate (player_id, season, team) combinations; aggregates will sum them"
            );
            for dup in report.duplicates.iter().take(self.options.duplicate_sample_limit) {
                warn!(
                    player = %dup.player,
                    player_id = dup.key.player_id,
                    season = dup.key.season,
                    team = %dup.key.team,
                    rows = ?dup.rows,
                    "duplicate sample"
                );
            }
        }

        let mut ids_by_name: BTreeMap<&str, BTreeSet<i64>> = BTreeMap::new();
        for r in &out {
            ids_by_name.entry(r.player.as_str()).or_default().insert(r.player_id);
        }
        let shared: Vec<&str> = ids_by_name
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(name, _)| *name)
            .collect();
        report.shared_names = shared.len();
        info!(
            count = shared.len(),
            examples = ?shared.iter().take(5).collect::<Vec<_>>(),
            "display names shared by several player ids"
        );

        Ok(out)
    }
}

/// Canonicalize with default options.
pub fn canonicalize(
    raw: Vec<RawRecord>,
) -> Result<(Vec<FactRecord>, CanonicalizeReport), CanonicalizeError> {
    Canonicalizer::default().canonicalize(raw)
}

fn consolidate_positions(
    rows: Vec<(usize, RawRecord)>,
    report: &mut CanonicalizeReport,
) -> Result<Vec<Staged>, CanonicalizeError> {
    let mut unmapped = BTreeSet::new();
    let mut staged = Vec::with_capacity(rows.len());

    for (source_row, raw) in rows {
        let original = raw.position.as_deref().map(str::trim).unwrap_or_default().to_string();
        match Position::consolidate(&original) {
            Some(position) => {
                *report.position_counts.entry(position).or_default() += 1;
                staged.push(Staged {
                    source_row,
                    raw,
                    position,
                    position_original: original,
                });
            }
            None if original.is_empty() => {
                unmapped.insert("<missing>".to_string());
            }
            None => {
                unmapped.insert(original);
            }
        }
    }

    if !unmapped.is_empty() {
        let unmapped: Vec<String> = unmapped.into_iter().collect();
        warn!(positions = ?unmapped, "unmapped positions");
        return Err(CanonicalizeError::UnmappedPositions(unmapped));
    }

    for (position, count) in &report.position_counts {
        info!(position = %position, group = %position.group(), count, "position");
    }
    Ok(staged)
}

fn find_duplicates(rows: &[Identified]) -> Vec<DuplicateKey> {
    let mut groups: HashMap<FactKey, Vec<usize>> = HashMap::new();
    let mut names: HashMap<FactKey, &str> = HashMap::new();
    for r in rows {
        let key = FactKey {
            player_id: r.player_id,
            season: r.season,
            team: r.team.clone(),
        };
        names.entry(key.clone()).or_insert(r.player.as_str());
        groups.entry(key).or_default().push(r.normalized.source_row);
    }

    let mut duplicates: Vec<DuplicateKey> = groups
        .into_iter()
        .filter(|(_, rows)| rows.len() > 1)
        .map(|(key, rows)| DuplicateKey {
            player: names.get(&key).copied().unwrap_or_default().to_string(),
            key,
            rows,
        })
        .collect();
    duplicates.sort_by(|a, b| a.key.cmp(&b.key));
    duplicates
}

fn derive_metrics(r: Identified) -> FactRecord {
    let n = r.normalized;
    let stats = n.stats;
    let games = Some(r.games as f64);
    let per_game = |total: Option<i64>| finite_ratio(total.map(|t| t as f64), games);

    FactRecord {
        row_id: n.row_id,
        season: r.season,
        player_id: r.player_id,
        player: r.player,
        birth_year: n.birth_year,
        position: n.position,
        position_original: n.position_original,
        position_group: n.position.group(),
        age: n.age,
        experience: n.experience,
        league: n.league,
        team: r.team,
        games: r.games,
        ppg: per_game(stats.pts),
        rpg: per_game(stats.trb),
        apg: per_game(stats.ast),
        spg: per_game(stats.stl),
        bpg: per_game(stats.blk),
        mpg: finite_ratio(stats.minutes, games),
        ts_percent: true_shooting(stats.pts, stats.fga, stats.fta),
        stats,
    }
}

/// Largest magnitude at which every integral f64 is exact (2^53).
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// Converts sentinel and empty cells to nulls, counting them per column.
struct FieldNormalizer<'a> {
    sentinel: &'a str,
    nulls: BTreeMap<&'static str, usize>,
}

impl<'a> FieldNormalizer<'a> {
    fn new(sentinel: &'a str) -> Self {
        Self {
            sentinel,
            nulls: BTreeMap::new(),
        }
    }

    /// Present, non-sentinel value, or `None` after counting the null.
    fn present<'v>(
        &mut self,
        column: &'static str,
        value: &'v Option<String>,
    ) -> Option<&'v str> {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() && v != self.sentinel => Some(v),
            _ => {
                *self.nulls.entry(column).or_default() += 1;
                None
            }
        }
    }

    fn text(&mut self, column: &'static str, value: &Option<String>) -> Option<String> {
        self.present(column, value).map(str::to_string)
    }

    /// Integer column. Accepts integral floats ("82.0") as exported by
    /// spreadsheet tools.
    fn int<T>(
        &mut self,
        row: usize,
        column: &'static str,
        value: &Option<String>,
    ) -> Result<Option<T>, CanonicalizeError>
    where
        T: FromStr + TryFrom<i64>,
    {
        let Some(v) = self.present(column, value) else {
            return Ok(None);
        };
        let invalid = || CanonicalizeError::InvalidValue {
            row,
            column,
            value: v.to_string(),
        };
        if let Ok(parsed) = v.parse::<T>() {
            return Ok(Some(parsed));
        }
        let float: f64 = v.parse().map_err(|_| invalid())?;
        if !float.is_finite() || float.fract() != 0.0 || float.abs() > MAX_EXACT_FLOAT_INT {
            return Err(invalid());
        }
        T::try_from(float as i64).map(Some).map_err(|_| invalid())
    }

    /// Float column. Non-finite parses ("inf", "NaN") are stored as null.
    fn float(
        &mut self,
        row: usize,
        column: &'static str,
        value: &Option<String>,
    ) -> Result<Option<f64>, CanonicalizeError> {
        let Some(v) = self.present(column, value) else {
            return Ok(None);
        };
        let parsed: f64 = v.parse().map_err(|_| CanonicalizeError::InvalidValue {
            row,
            column,
            value: v.to_string(),
        })?;
        if parsed.is_finite() {
            Ok(Some(parsed))
        } else {
            *self.nulls.entry(column).or_default() += 1;
            Ok(None)
        }
    }
}
