//! Runtime configuration, read from a TOML file.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! [pipeline]
//! combined_team = "TOT"
//! missing_sentinel = "NA"
//! duplicate_sample_limit = 5
//!
//! [store]
//! path = "data/facts.parquet"
//!
//! [query]
//! default_top_n = 10
//! default_season_from = 2000
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::CanonicalizeOptions;
use crate::error::ErrorKind;
use crate::query::DEFAULT_TOP_N;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Config
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatlabConfig {
    pub pipeline: CanonicalizeOptions,
    pub store: StoreConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/facts.parquet"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_top_n: usize,
    /// Lower season bound applied when a query names none.
    pub default_season_from: Option<i32>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_top_n: DEFAULT_TOP_N,
            default_season_from: None,
        }
    }
}

impl StatlabConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.combined_team.trim().is_empty() {
            return Err(ConfigError::Invalid("pipeline.combined_team is empty".into()));
        }
        if self.query.default_top_n == 0 {
            return Err(ConfigError::Invalid("query.default_top_n must be positive".into()));
        }
        Ok(())
    }
}
