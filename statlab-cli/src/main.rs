//! StatLab CLI: load raw season totals and run ranking queries.
//!
//! Commands:
//! - `load`: ingest a raw CSV, canonicalize it, and save the fact store
//! - `query`: rank players by a metric and print their season series
//! - `metrics`: list the metric registry and the top-N options
//! - `stats`: report store size, season range, and position distribution

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use statlab_core::data::{ingest_csv, Canonicalizer, FactStore};
use statlab_core::query::{
    run_query, Facet, QueryOutcome, QueryRequest, QueryResponse, METRICS, TOP_N_OPTIONS,
};
use statlab_core::StatlabConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "statlab", about = "StatLab CLI: season stat rankings")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fact store path. Overrides `[store] path` from the config.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a raw CSV, canonicalize it, and save the fact store.
    Load {
        /// Raw per-season CSV file.
        #[arg(long)]
        input: PathBuf,
    },
    /// Rank players by a metric and print their per-season series.
    Query {
        /// Metric name (see `statlab metrics`).
        #[arg(long, default_value = "pts")]
        metric: String,

        /// Number of players to rank. Defaults to the config value.
        #[arg(long, allow_hyphen_values = true)]
        top_n: Option<i64>,

        /// First season (inclusive).
        #[arg(long)]
        from: Option<i32>,

        /// Last season (inclusive).
        #[arg(long)]
        to: Option<i32>,

        /// Team code, or ALL.
        #[arg(long, default_value = "ALL")]
        team: String,

        /// Canonical position (PG, SG, SF, PF, C), or ALL.
        #[arg(long, default_value = "ALL")]
        position: String,

        /// Player id, or ALL.
        #[arg(long, default_value = "ALL")]
        player: String,

        /// Print the response as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List registered metrics and top-N options.
    Metrics,
    /// Report row count, season range, and position distribution of the store.
    Stats,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => StatlabConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StatlabConfig::default(),
    };
    let store_path = cli.store.clone().unwrap_or_else(|| config.store.path.clone());

    match cli.command {
        Commands::Load { input } => run_load(&config, &input, &store_path),
        Commands::Query {
            metric,
            top_n,
            from,
            to,
            team,
            position,
            player,
            json,
        } => {
            let request = QueryRequest {
                metric,
                top_n: top_n.unwrap_or(config.query.default_top_n as i64),
                season_from: from.or(config.query.default_season_from),
                season_to: to,
                team: Facet::parse_token(&team).context("parsing --team")?,
                position: Facet::parse_token(&position.to_uppercase())
                    .context("parsing --position")?,
                player_id: Facet::parse_token(&player).with_context(|| {
                    format!("--player must be a numeric id or ALL, got '{player}'")
                })?,
            };
            run_query_cmd(&store_path, &request, json)
        }
        Commands::Metrics => {
            print_metrics();
            Ok(())
        }
        Commands::Stats => run_stats(&store_path),
    }
}

fn run_load(config: &StatlabConfig, input: &Path, store_path: &Path) -> Result<()> {
    let raw = ingest_csv(input).with_context(|| format!("ingesting {}", input.display()))?;
    let raw_rows = raw.len();

    let canonicalizer = Canonicalizer::new(config.pipeline.clone());
    let (facts, report) = canonicalizer
        .canonicalize(raw)
        .map_err(|e| anyhow::anyhow!("{e} ({:?} error)", e.kind()))
        .context("canonicalization aborted; no fact store written")?;

    let store = FactStore::from_records(&facts)?;
    store
        .save(store_path)
        .with_context(|| format!("saving fact store to {}", store_path.display()))?;

    println!("Loaded {raw_rows} raw rows from {}", input.display());
    println!(
        "Removed {} combined-team rows ({:.2}%)",
        report.combined_rows_removed,
        report.combined_rows_pct()
    );
    if !report.duplicates.is_empty() {
        println!(
            "Warning: {} duplicate (player_id, season, team) keys; aggregates may double-count",
            report.duplicates.len()
        );
    }
    println!("Wrote {} fact rows to {}", report.output_rows, store_path.display());
    Ok(())
}

fn run_query_cmd(store_path: &Path, request: &QueryRequest, json: bool) -> Result<()> {
    let store = open_store(store_path)?;
    let response = run_query(&store, request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

fn print_response(response: &QueryResponse) {
    println!("{}", response.title);
    println!("{}", response.subtitle);
    println!("Query time: {:.1} ms", response.elapsed.as_secs_f64() * 1000.0);

    if response.outcome == QueryOutcome::NoData {
        return;
    }

    println!();
    println!("{:<4} {:<28} {:>10} {:>14}", "Rank", "Player", "Id", "Value");
    println!("{}", "-".repeat(59));
    for (i, r) in response.ranking.iter().enumerate() {
        println!("{:<4} {:<28} {:>10} {:>14.3}", i + 1, r.player, r.player_id, r.value);
    }

    println!();
    println!("{:<28} {:>6} {:<5} {:>12}", "Player", "Season", "Team", "Value");
    println!("{}", "-".repeat(54));
    for p in &response.series {
        let value = p.value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
        println!("{:<28} {:>6} {:<5} {:>12}", p.player, p.season, p.team, value);
    }
}

fn print_metrics() {
    println!("{:<12} {:<20} {:<4}", "Name", "Label", "Agg");
    println!("{}", "-".repeat(38));
    for m in METRICS {
        println!("{:<12} {:<20} {:<4}", m.name, m.label, m.aggregation.as_str());
    }
    println!();
    let options: Vec<String> = TOP_N_OPTIONS.iter().map(|n| n.to_string()).collect();
    println!("Top-N options: {}", options.join(", "));
}

fn run_stats(store_path: &Path) -> Result<()> {
    let store = open_store(store_path)?;
    let stats = store.stats()?;
    let meta = store.meta();

    println!("Store: {}", store_path.display());
    println!("Rows: {}", stats.rows);
    match stats.season_range {
        Some((min, max)) => println!("Seasons: {min} to {max}"),
        None => println!("Seasons: (none)"),
    }
    println!("Players: {}", stats.unique_players);
    println!("Teams: {}", stats.unique_teams);
    println!("Loaded at: {}", meta.loaded_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Hash: {}", meta.data_hash);
    println!();
    println!("{:<8} {:>8} {:>8}", "Position", "Rows", "Share");
    println!("{}", "-".repeat(26));
    for (position, count) in &stats.position_distribution {
        let share = if stats.rows == 0 {
            0.0
        } else {
            *count as f64 / stats.rows as f64 * 100.0
        };
        println!("{:<8} {:>8} {:>7.1}%", position.as_str(), count, share);
    }
    Ok(())
}

fn open_store(path: &Path) -> Result<FactStore> {
    if !path.exists() {
        bail!(
            "fact store not found at {}; run `statlab load --input <csv>` first",
            path.display()
        );
    }
    FactStore::open(path).with_context(|| format!("opening fact store {}", path.display()))
}
