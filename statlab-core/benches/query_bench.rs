//! Criterion benchmarks for StatLab hot paths.
//!
//! Benchmarks:
//! 1. Canonicalization of a synthetic raw batch
//! 2. Ranking (aggregate + sort + top N) at several table sizes
//! 3. Full rank-then-expand query through the orchestrator

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use statlab_core::data::{canonicalize, FactStore};
use statlab_core::domain::{RawRecord, POSITION_TABLE};
use statlab_core::query::{lookup, rank, run_query, Facet, Predicate, QueryRequest};

const TEAMS: &[&str] = &["ATL", "BOS", "CHI", "DAL", "LAL", "MIA", "NYK", "SAS", "TOT"];

// ── Helpers ──────────────────────────────────────────────────────────

fn make_raw(n: usize) -> Vec<RawRecord> {
    (0..n)
        .map(|i| {
            let player_id = (i % (n / 10).max(1)) as i64;
            let season = 1980 + (i % 45) as i32;
            let games = (i % 83) as i64;
            RawRecord {
                row_id: Some(i.to_string()),
                season: Some(season.to_string()),
                player_id: Some(player_id.to_string()),
                player: Some(format!("Player {player_id}")),
                position: Some(POSITION_TABLE[i % POSITION_TABLE.len()].0.to_string()),
                team: Some(TEAMS[i % TEAMS.len()].to_string()),
                games: Some(games.to_string()),
                minutes: Some((games * 30).to_string()),
                pts: Some(((i * 37) % 2500).to_string()),
                trb: Some(((i * 13) % 900).to_string()),
                ast: Some(((i * 7) % 700).to_string()),
                fg: Some(((i * 11) % 800).to_string()),
                fga: Some(((i * 11) % 800 + 200).to_string()),
                ft: Some(((i * 3) % 400).to_string()),
                fta: if i % 17 == 0 {
                    Some("NA".into())
                } else {
                    Some(((i * 3) % 400 + 50).to_string())
                },
                ..Default::default()
            }
        })
        .collect()
}

fn make_store(n: usize) -> FactStore {
    let (facts, _) = canonicalize(make_raw(n)).unwrap();
    FactStore::from_records(&facts).unwrap()
}

// ── 1. Canonicalization ──────────────────────────────────────────────

fn bench_canonicalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonicalize");

    for &rows in &[1_000, 10_000, 30_000] {
        let raw = make_raw(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| canonicalize(black_box(raw.clone())).unwrap())
        });
    }

    group.finish();
}

// ── 2. Ranking ───────────────────────────────────────────────────────

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    let pts = lookup("pts").unwrap();
    let ppg = lookup("ppg").unwrap();

    for &rows in &[1_000, 10_000, 30_000] {
        let store = make_store(rows);
        let predicate = Predicate::all();

        group.bench_with_input(BenchmarkId::new("sum_pts", rows), &rows, |b, _| {
            b.iter(|| rank(black_box(&store), &predicate, pts, 10).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("avg_ppg", rows), &rows, |b, _| {
            b.iter(|| rank(black_box(&store), &predicate, ppg, 10).unwrap())
        });
    }

    group.finish();
}

// ── 3. Rank then expand ──────────────────────────────────────────────

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_query");
    let store = make_store(30_000);

    let unfiltered = QueryRequest::new("pts");
    group.bench_function("unfiltered_top10", |b| {
        b.iter(|| run_query(black_box(&store), &unfiltered).unwrap())
    });

    let mut faceted = QueryRequest::new("ts_percent");
    faceted.top_n = 20;
    faceted.season_from = Some(2000);
    faceted.season_to = Some(2020);
    faceted.team = Facet::Equals("BOS".into());
    group.bench_function("faceted_top20", |b| {
        b.iter(|| run_query(black_box(&store), &faceted).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_canonicalize, bench_rank, bench_query);
criterion_main!(benches);
