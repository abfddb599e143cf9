//! Metric registry. The ranking engine only understands metrics listed here.

use polars::prelude::*;
use serde::Serialize;

/// How a metric's per-row values combine into one value per player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Aggregation {
    Sum,
    /// Unweighted mean over matching rows.
    Avg,
}

impl Aggregation {
    pub fn as_str(self) -> &'static str {
        match self {
            Aggregation::Sum => "SUM",
            Aggregation::Avg => "AVG",
        }
    }

    fn apply(self, expr: Expr) -> Expr {
        match self {
            Aggregation::Sum => expr.sum(),
            Aggregation::Avg => expr.mean(),
        }
    }
}

/// A registered metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSpec {
    pub name: &'static str,
    pub label: &'static str,
    /// Fact table column the metric reads.
    pub source: &'static str,
    pub aggregation: Aggregation,
}

impl MetricSpec {
    const fn sum(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            source: name,
            aggregation: Aggregation::Sum,
        }
    }

    const fn avg(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            source: name,
            aggregation: Aggregation::Avg,
        }
    }

    /// Per-row value expression, as Float64.
    pub fn source_expr(&self) -> Expr {
        col(self.source).cast(DataType::Float64)
    }

    /// Per-player aggregate expression.
    pub fn aggregate_expr(&self) -> Expr {
        self.aggregation.apply(self.source_expr())
    }
}

pub const METRICS: &[MetricSpec] = &[
    MetricSpec::sum("pts", "Total Points"),
    MetricSpec::sum("trb", "Total Rebounds"),
    MetricSpec::sum("ast", "Total Assists"),
    MetricSpec::sum("stl", "Total Steals"),
    MetricSpec::sum("blk", "Total Blocks"),
    MetricSpec::avg("ppg", "Points Per Game"),
    MetricSpec::avg("rpg", "Rebounds Per Game"),
    MetricSpec::avg("apg", "Assists Per Game"),
    MetricSpec::avg("spg", "Steals Per Game"),
    MetricSpec::avg("bpg", "Blocks Per Game"),
    MetricSpec::avg("mpg", "Minutes Per Game"),
    MetricSpec::avg("fg_percent", "Field Goal %"),
    MetricSpec::avg("x3p_percent", "Three Point %"),
    MetricSpec::avg("ft_percent", "Free Throw %"),
    MetricSpec::avg("ts_percent", "True Shooting %"),
];

/// Allowed `top_n` choices offered to callers.
pub const TOP_N_OPTIONS: [usize; 5] = [3, 5, 10, 15, 20];

pub const DEFAULT_TOP_N: usize = 10;

/// Look up a metric by name.
pub fn lookup(name: &str) -> Option<&'static MetricSpec> {
    METRICS.iter().find(|m| m.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::FactSchema;

    #[test]
    fn registry_names_are_unique() {
        let mut names: Vec<_> = METRICS.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), METRICS.len());
    }

    #[test]
    fn every_source_is_an_aggregable_column() {
        for m in METRICS {
            assert!(FactSchema::is_aggregable(m.source), "{} is not aggregable", m.source);
        }
    }

    #[test]
    fn lookup_known_and_unknown() {
        let pts = lookup("pts").unwrap();
        assert_eq!(pts.label, "Total Points");
        assert_eq!(pts.aggregation, Aggregation::Sum);
        assert_eq!(lookup("ppg").unwrap().aggregation, Aggregation::Avg);
        assert!(lookup("PTS").is_none());
        assert!(lookup("plus_minus").is_none());
    }

    #[test]
    fn source_expr_reads_integer_columns_as_float() {
        let df = DataFrame::new(vec![Column::new("pts".into(), &[10i64, 25])]).unwrap();
        let out = df
            .lazy()
            .select([lookup("pts").unwrap().source_expr().alias("value")])
            .collect()
            .unwrap();
        let values: Vec<Option<f64>> =
            out.column("value").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(10.0), Some(25.0)]);
    }

    #[test]
    fn default_top_n_is_an_option() {
        assert!(TOP_N_OPTIONS.contains(&DEFAULT_TOP_N));
    }
}
