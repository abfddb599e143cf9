//! Columnar fact store backed by a Polars DataFrame, persisted as Parquet.
//!
//! Layout: `{path}` (Parquet, the fact table) + `{path}.meta.json` (sidecar)
//!
//! Features:
//! - Built once from canonical fact rows, read-only afterwards
//! - Atomic writes (write to .tmp, rename into place)
//! - Schema validation on open
//! - Metadata sidecar (row count, season range, content hash, load time)
//!
//! The store is the only owner of the fact table. Queries borrow it and read
//! through [`FactStore::scan`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::schema::{FactSchema, SchemaError};
use crate::domain::{FactRecord, Position, PositionGroup, StatLine};
use crate::error::ErrorKind;

/// Bump when the fact table layout changes.
pub const STORE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata sidecar error: {0}")]
    Meta(#[from] serde_json::Error),

    #[error("corrupt fact row {row}: {reason}")]
    Corrupt { row: usize, reason: String },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Store
    }
}

/// Metadata sidecar for a persisted store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub schema_version: u32,
    pub rows: usize,
    pub season_min: Option<i32>,
    pub season_max: Option<i32>,
    /// BLAKE3 over the JSON encoding of the fact rows.
    pub data_hash: String,
    pub loaded_at: NaiveDateTime,
}

/// Summary counts over the fact table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub rows: usize,
    pub season_range: Option<(i32, i32)>,
    pub unique_players: usize,
    pub unique_teams: usize,
    pub position_distribution: BTreeMap<Position, usize>,
}

/// Immutable fact table.
#[derive(Debug, Clone)]
pub struct FactStore {
    frame: DataFrame,
    meta: StoreMeta,
}

impl FactStore {
    /// Build the table from canonical rows. Row order is preserved.
    pub fn from_records(records: &[FactRecord]) -> Result<Self, StoreError> {
        let frame = records_to_dataframe(records)?;
        let meta = build_meta(records, &frame)?;
        info!(rows = meta.rows, hash = %meta.data_hash, "fact store built");
        Ok(Self { frame, meta })
    }

    /// Open a persisted store read-only and validate its schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = fs::File::open(path).map_err(io_err)?;
        let frame = ParquetReader::new(file).finish()?;
        FactSchema::validate(&frame)?;

        let meta_path = meta_path(path);
        let meta = match fs::read_to_string(&meta_path) {
            Ok(content) => {
                let meta: StoreMeta = serde_json::from_str(&content)?;
                if meta.rows == frame.height() && meta.schema_version == STORE_SCHEMA_VERSION {
                    meta
                } else {
                    warn!(
                        path = %meta_path.display(),
                        sidecar_rows = meta.rows,
                        rows = frame.height(),
                        "stale metadata sidecar; recomputing"
                    );
                    recompute_meta(&frame)?
                }
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %meta_path.display(), "no metadata sidecar; recomputing");
                recompute_meta(&frame)?
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: meta_path,
                    source,
                })
            }
        };
        info!(path = %path.display(), rows = frame.height(), "fact store opened");
        Ok(Self { frame, meta })
    }

    /// Persist as Parquet plus sidecar. Both files are written atomically.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&self.frame, &tmp_path)?;
        rename(&tmp_path, path)?;

        let meta_path = meta_path(path);
        let tmp_meta = meta_path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&self.meta)?;
        fs::write(&tmp_meta, json).map_err(|source| StoreError::Io {
            path: tmp_meta.clone(),
            source,
        })?;
        rename(&tmp_meta, &meta_path)?;

        info!(path = %path.display(), rows = self.meta.rows, "fact store saved");
        Ok(())
    }

    /// Lazy scan over the whole table. Filters and aggregates compose on top.
    pub fn scan(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Full season span of the table, if it has rows.
    pub fn season_range(&self) -> Option<(i32, i32)> {
        self.meta.season_min.zip(self.meta.season_max)
    }

    /// Convert the table back to fact rows.
    pub fn records(&self) -> Result<Vec<FactRecord>, StoreError> {
        dataframe_to_records(&self.frame)
    }

    /// Distinct seasons, ascending.
    pub fn seasons(&self) -> Result<Vec<i32>, StoreError> {
        let seasons: BTreeSet<i32> = self
            .frame
            .column("season")?
            .i32()?
            .into_iter()
            .flatten()
            .collect();
        Ok(seasons.into_iter().collect())
    }

    /// Distinct team codes, ascending.
    pub fn teams(&self) -> Result<Vec<String>, StoreError> {
        self.distinct_strings("team")
    }

    /// Distinct canonical positions present in the table.
    pub fn positions(&self) -> Result<Vec<Position>, StoreError> {
        let mut out = Vec::new();
        for (row, code) in self.distinct_strings("position")?.into_iter().enumerate() {
            out.push(parse_position(row, &code)?);
        }
        out.sort();
        Ok(out)
    }

    /// Distinct `(player_id, player)` pairs ordered by name, then id.
    pub fn players(&self) -> Result<Vec<(i64, String)>, StoreError> {
        let ids = self.frame.column("player_id")?.i64()?;
        let names = self.frame.column("player")?.str()?;
        let pairs: BTreeSet<(String, i64)> = ids
            .into_iter()
            .zip(names)
            .filter_map(|(id, name)| Some((name?.to_string(), id?)))
            .collect();
        Ok(pairs.into_iter().map(|(name, id)| (id, name)).collect())
    }

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let unique_players = self
            .frame
            .column("player_id")?
            .i64()?
            .into_iter()
            .flatten()
            .collect::<BTreeSet<_>>()
            .len();

        let mut position_distribution = BTreeMap::new();
        for (row, code) in self.frame.column("position")?.str()?.into_iter().enumerate() {
            let code = code.unwrap_or_default();
            *position_distribution.entry(parse_position(row, code)?).or_insert(0) += 1;
        }

        let stats = StoreStats {
            rows: self.len(),
            season_range: self.season_range(),
            unique_players,
            unique_teams: self.teams()?.len(),
            position_distribution,
        };
        info!(
            rows = stats.rows,
            seasons = ?stats.season_range,
            players = stats.unique_players,
            teams = stats.unique_teams,
            "store statistics"
        );
        Ok(stats)
    }

    fn distinct_strings(&self, column: &str) -> Result<Vec<String>, StoreError> {
        let values: BTreeSet<&str> =
            self.frame.column(column)?.str()?.into_iter().flatten().collect();
        Ok(values.into_iter().map(str::to_string).collect())
    }
}

/// Path to the metadata sidecar for a store file.
pub fn meta_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".meta.json");
    PathBuf::from(name)
}

fn rename(from: &Path, to: &Path) -> Result<(), StoreError> {
    fs::rename(from, to).map_err(|source| StoreError::Io {
        path: to.to_path_buf(),
        source,
    })
}

fn recompute_meta(frame: &DataFrame) -> Result<StoreMeta, StoreError> {
    let records = dataframe_to_records(frame)?;
    build_meta(&records, frame)
}

fn build_meta(records: &[FactRecord], frame: &DataFrame) -> Result<StoreMeta, StoreError> {
    let json = serde_json::to_vec(records)?;
    let seasons = records.iter().map(|r| r.season);
    Ok(StoreMeta {
        schema_version: STORE_SCHEMA_VERSION,
        rows: frame.height(),
        season_min: seasons.clone().min(),
        season_max: seasons.max(),
        data_hash: blake3::hash(&json).to_hex().to_string(),
        loaded_at: chrono::Local::now().naive_local(),
    })
}

// ── DataFrame conversion ────────────────────────────────────────────

fn records_to_dataframe(records: &[FactRecord]) -> Result<DataFrame, StoreError> {
    macro_rules! column {
        ($name:literal, $get:expr) => {
            Column::new($name.into(), records.iter().map($get).collect::<Vec<_>>())
        };
    }

    let df = DataFrame::new(vec![
        column!("row_id", |r: &FactRecord| r.row_id),
        column!("season", |r: &FactRecord| r.season),
        column!("player_id", |r: &FactRecord| r.player_id),
        column!("player", |r: &FactRecord| r.player.clone()),
        column!("birth_year", |r: &FactRecord| r.birth_year),
        column!("position", |r: &FactRecord| r.position.as_str()),
        column!("position_original", |r: &FactRecord| r.position_original.clone()),
        column!("position_group", |r: &FactRecord| r.position_group.as_str()),
        column!("age", |r: &FactRecord| r.age),
        column!("experience", |r: &FactRecord| r.experience.clone()),
        column!("league", |r: &FactRecord| r.league.clone()),
        column!("team", |r: &FactRecord| r.team.clone()),
        column!("games", |r: &FactRecord| r.games),
        column!("games_started", |r: &FactRecord| r.stats.games_started),
        column!("minutes", |r: &FactRecord| r.stats.minutes),
        column!("fg", |r: &FactRecord| r.stats.fg),
        column!("fga", |r: &FactRecord| r.stats.fga),
        column!("fg_percent", |r: &FactRecord| r.stats.fg_percent),
        column!("x3p", |r: &FactRecord| r.stats.x3p),
        column!("x3pa", |r: &FactRecord| r.stats.x3pa),
        column!("x3p_percent", |r: &FactRecord| r.stats.x3p_percent),
        column!("x2p", |r: &FactRecord| r.stats.x2p),
        column!("x2pa", |r: &FactRecord| r.stats.x2pa),
        column!("x2p_percent", |r: &FactRecord| r.stats.x2p_percent),
        column!("e_fg_percent", |r: &FactRecord| r.stats.e_fg_percent),
        column!("ft", |r: &FactRecord| r.stats.ft),
        column!("fta", |r: &FactRecord| r.stats.fta),
        column!("ft_percent", |r: &FactRecord| r.stats.ft_percent),
        column!("orb", |r: &FactRecord| r.stats.orb),
        column!("drb", |r: &FactRecord| r.stats.drb),
        column!("trb", |r: &FactRecord| r.stats.trb),
        column!("ast", |r: &FactRecord| r.stats.ast),
        column!("stl", |r: &FactRecord| r.stats.stl),
        column!("blk", |r: &FactRecord| r.stats.blk),
        column!("tov", |r: &FactRecord| r.stats.tov),
        column!("pf", |r: &FactRecord| r.stats.pf),
        column!("pts", |r: &FactRecord| r.stats.pts),
        column!("ppg", |r: &FactRecord| r.ppg),
        column!("rpg", |r: &FactRecord| r.rpg),
        column!("apg", |r: &FactRecord| r.apg),
        column!("spg", |r: &FactRecord| r.spg),
        column!("bpg", |r: &FactRecord| r.bpg),
        column!("mpg", |r: &FactRecord| r.mpg),
        column!("ts_percent", |r: &FactRecord| r.ts_percent),
    ])?;
    FactSchema::validate(&df)?;
    Ok(df)
}

fn dataframe_to_records(df: &DataFrame) -> Result<Vec<FactRecord>, StoreError> {
    let ints = |name: &str| -> Result<Vec<Option<i64>>, StoreError> {
        Ok(df.column(name)?.i64()?.into_iter().collect())
    };
    let int32s = |name: &str| -> Result<Vec<Option<i32>>, StoreError> {
        Ok(df.column(name)?.i32()?.into_iter().collect())
    };
    let floats = |name: &str| -> Result<Vec<Option<f64>>, StoreError> {
        Ok(df.column(name)?.f64()?.into_iter().collect())
    };
    let texts = |name: &str| -> Result<Vec<Option<String>>, StoreError> {
        Ok(df
            .column(name)?
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect())
    };

    let row_id = ints("row_id")?;
    let season = int32s("season")?;
    let player_id = ints("player_id")?;
    let player = texts("player")?;
    let birth_year = int32s("birth_year")?;
    let position = texts("position")?;
    let position_original = texts("position_original")?;
    let position_group = texts("position_group")?;
    let age = int32s("age")?;
    let experience = texts("experience")?;
    let league = texts("league")?;
    let team = texts("team")?;
    let games = ints("games")?;
    let games_started = ints("games_started")?;
    let minutes = floats("minutes")?;
    let fg = ints("fg")?;
    let fga = ints("fga")?;
    let fg_percent = floats("fg_percent")?;
    let x3p = ints("x3p")?;
    let x3pa = ints("x3pa")?;
    let x3p_percent = floats("x3p_percent")?;
    let x2p = ints("x2p")?;
    let x2pa = ints("x2pa")?;
    let x2p_percent = floats("x2p_percent")?;
    let e_fg_percent = floats("e_fg_percent")?;
    let ft = ints("ft")?;
    let fta = ints("fta")?;
    let ft_percent = floats("ft_percent")?;
    let orb = ints("orb")?;
    let drb = ints("drb")?;
    let trb = ints("trb")?;
    let ast = ints("ast")?;
    let stl = ints("stl")?;
    let blk = ints("blk")?;
    let tov = ints("tov")?;
    let pf = ints("pf")?;
    let pts = ints("pts")?;
    let ppg = floats("ppg")?;
    let rpg = floats("rpg")?;
    let apg = floats("apg")?;
    let spg = floats("spg")?;
    let bpg = floats("bpg")?;
    let mpg = floats("mpg")?;
    let ts_percent = floats("ts_percent")?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let required = |value: Option<&str>, column: &str| {
            value.map(str::to_string).ok_or_else(|| StoreError::Corrupt {
                row: i,
                reason: format!("null {column}"),
            })
        };
        let position_code = required(position[i].as_deref(), "position")?;
        let group_code = required(position_group[i].as_deref(), "position_group")?;
        let group: PositionGroup = group_code
            .parse()
            .map_err(|reason| StoreError::Corrupt { row: i, reason })?;

        records.push(FactRecord {
            row_id: row_id[i],
            season: season[i].ok_or_else(|| corrupt(i, "null season"))?,
            player_id: player_id[i].ok_or_else(|| corrupt(i, "null player_id"))?,
            player: required(player[i].as_deref(), "player")?,
            birth_year: birth_year[i],
            position: parse_position(i, &position_code)?,
            position_original: required(position_original[i].as_deref(), "position_original")?,
            position_group: group,
            age: age[i],
            experience: experience[i].clone(),
            league: league[i].clone(),
            team: required(team[i].as_deref(), "team")?,
            games: games[i].ok_or_else(|| corrupt(i, "null games"))?,
            stats: StatLine {
                games_started: games_started[i],
                minutes: minutes[i],
                fg: fg[i],
                fga: fga[i],
                fg_percent: fg_percent[i],
                x3p: x3p[i],
                x3pa: x3pa[i],
                x3p_percent: x3p_percent[i],
                x2p: x2p[i],
                x2pa: x2pa[i],
                x2p_percent: x2p_percent[i],
                e_fg_percent: e_fg_percent[i],
                ft: ft[i],
                fta: fta[i],
                ft_percent: ft_percent[i],
                orb: orb[i],
                drb: drb[i],
                trb: trb[i],
                ast: ast[i],
                stl: stl[i],
                blk: blk[i],
                tov: tov[i],
                pf: pf[i],
                pts: pts[i],
            },
            ppg: ppg[i],
            rpg: rpg[i],
            apg: apg[i],
            spg: spg[i],
            bpg: bpg[i],
            mpg: mpg[i],
            ts_percent: ts_percent[i],
        });
    }
    Ok(records)
}

fn corrupt(row: usize, reason: &str) -> StoreError {
    StoreError::Corrupt {
        row,
        reason: reason.to_string(),
    }
}

fn parse_position(row: usize, code: &str) -> Result<Position, StoreError> {
    code.parse()
        .map_err(|reason| StoreError::Corrupt { row, reason })
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), StoreError> {
    let file = fs::File::create(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ParquetWriter::new(file).finish(&mut df.clone())?;
    Ok(())
}
