//! Property tests for pipeline and query invariants.
//!
//! Uses proptest to verify:
//! 1. Idempotence: identical raw input gives byte-identical fact rows
//! 2. No combined-team leakage
//! 3. Position closure: every row carries a canonical position and its group
//! 4. Null-safe rates: zero games means every per-game field is null
//! 5. Ranking determinism, including tie order
//! 6. Rank/expand consistency: expanded rows belong to ranked players and
//!    satisfy the ranking predicate

use proptest::prelude::*;
use statlab_core::data::{canonicalize, FactStore};
use statlab_core::domain::{FactRecord, Position, RawRecord, POSITION_TABLE};
use statlab_core::query::{compose, expand, rank, Facet, Predicate, METRICS};

const TEAMS: &[&str] = &["BOS", "NYK", "LAL", "TOT"];

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_stat() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (0i64..2500).prop_map(|v| v.to_string()),
        1 => Just("NA".to_string()),
        1 => Just(String::new()),
    ]
}

fn arb_raw() -> impl Strategy<Value = RawRecord> {
    (
        1i64..8,
        2015i32..2021,
        0usize..TEAMS.len(),
        0usize..POSITION_TABLE.len(),
        prop_oneof![1 => Just(0i64), 4 => 1i64..82],
        arb_stat(),
        arb_stat(),
        arb_stat(),
        arb_stat(),
    )
        .prop_map(|(id, season, team, pos, games, pts, trb, fga, fta)| RawRecord {
            row_id: Some(format!("{id}{season}")),
            season: Some(season.to_string()),
            player_id: Some(id.to_string()),
            player: Some(format!("Player {}", id % 5)),
            position: Some(POSITION_TABLE[pos].0.to_string()),
            team: Some(TEAMS[team].to_string()),
            games: Some(games.to_string()),
            pts: Some(pts),
            trb: Some(trb),
            ast: Some("NA".into()),
            fg: Some("0".into()),
            fga: Some(fga),
            ft: Some("0".into()),
            fta: Some(fta),
            ..Default::default()
        })
}

fn arb_batch() -> impl Strategy<Value = Vec<RawRecord>> {
    prop::collection::vec(arb_raw(), 1..40)
}

fn arb_facet<T: Clone + std::fmt::Debug + 'static>(
    values: Vec<T>,
) -> impl Strategy<Value = Facet<T>> {
    prop_oneof![
        2 => Just(Facet::Any),
        1 => prop::sample::select(values).prop_map(Facet::Equals),
    ]
}

fn arb_predicate() -> impl Strategy<Value = Predicate> {
    (
        prop::option::of(2014i32..2022),
        prop::option::of(2014i32..2022),
        arb_facet(vec!["BOS".to_string(), "NYK".to_string(), "SEA".to_string()]),
        arb_facet(Position::ALL.iter().map(|p| p.as_str().to_string()).collect()),
        arb_facet(vec![1i64, 2, 3]),
    )
        .prop_map(|(from, to, team, position, player)| compose(from, to, team, position, player))
}

fn facts_of(batch: Vec<RawRecord>) -> Vec<FactRecord> {
    canonicalize(batch).unwrap().0
}

// ── 1-4. Canonicalizer ───────────────────────────────────────────────

proptest! {
    #[test]
    fn canonicalization_is_idempotent(batch in arb_batch()) {
        let first = canonicalize(batch.clone()).unwrap();
        let second = canonicalize(batch).unwrap();
        prop_assert_eq!(
            serde_json::to_vec(&first.0).unwrap(),
            serde_json::to_vec(&second.0).unwrap()
        );
        prop_assert_eq!(first.1, second.1);
    }

    #[test]
    fn no_combined_team_rows_survive(batch in arb_batch()) {
        let combined = batch.iter().filter(|r| r.team.as_deref() == Some("TOT")).count();
        let (facts, report) = canonicalize(batch.clone()).unwrap();
        prop_assert!(facts.iter().all(|f| f.team != "TOT"));
        prop_assert_eq!(report.combined_rows_removed, combined);
        prop_assert_eq!(facts.len(), batch.len() - combined);
    }

    #[test]
    fn positions_are_closed_and_grouped(batch in arb_batch()) {
        for f in facts_of(batch) {
            prop_assert!(Position::ALL.contains(&f.position));
            prop_assert_eq!(f.position_group, f.position.group());
            prop_assert_eq!(Position::consolidate(&f.position_original), Some(f.position));
        }
    }

    #[test]
    fn zero_games_rates_are_null(batch in arb_batch()) {
        for f in facts_of(batch) {
            if f.games == 0 {
                prop_assert!(f.per_game().iter().all(Option::is_none));
            }
            for rate in f.per_game().into_iter().chain([f.ts_percent]).flatten() {
                prop_assert!(rate.is_finite());
            }
        }
    }
}

// ── 5-6. Query engine ────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ranking_is_deterministic(
        batch in arb_batch(),
        predicate in arb_predicate(),
        metric in prop::sample::select(METRICS.to_vec()),
        top_n in -2i64..12,
    ) {
        let store = FactStore::from_records(&facts_of(batch)).unwrap();
        let first = rank(&store, &predicate, &metric, top_n).unwrap();
        let second = rank(&store, &predicate, &metric, top_n).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert!(first.len() as i64 <= top_n.max(0));
        prop_assert!(first.windows(2).all(|w| w[0].value >= w[1].value));
    }

    #[test]
    fn expansion_is_consistent_with_ranking(
        batch in arb_batch(),
        predicate in arb_predicate(),
        metric in prop::sample::select(METRICS.to_vec()),
        top_n in 1i64..6,
    ) {
        let facts = facts_of(batch);
        let store = FactStore::from_records(&facts).unwrap();
        let ranked = rank(&store, &predicate, &metric, top_n).unwrap();
        let ids: Vec<i64> = ranked.iter().map(|r| r.player_id).collect();
        let series = expand(&store, &predicate, &ids, &metric).unwrap();

        for point in &series {
            prop_assert!(ids.contains(&point.player_id));
            let matching = facts.iter().any(|f| {
                f.player_id == point.player_id
                    && f.season == point.season
                    && f.team == point.team
                    && predicate.matches(f)
            });
            prop_assert!(matching, "series row outside predicate: {:?}", point);
        }

        let expected = facts
            .iter()
            .filter(|f| ids.contains(&f.player_id) && predicate.matches(f))
            .count();
        prop_assert_eq!(series.len(), expected);

        let order: Vec<(&str, i32)> =
            series.iter().map(|p| (p.player.as_str(), p.season)).collect();
        prop_assert!(order.windows(2).all(|w| w[0] <= w[1]));
    }
}
