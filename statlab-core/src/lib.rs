//! StatLab Core: season stat canonicalization and the rank-then-expand query engine.
//!
//! This crate contains:
//! - Domain types (raw rows, canonical fact rows, positions)
//! - CSV ingest with structural validation
//! - The canonicalizer: combined-row removal, position consolidation,
//!   missing-value normalization, identity validation, derived metrics
//! - A Parquet-backed columnar fact store
//! - The query engine: filter composer, ranking, series expansion, orchestration
//! - TOML configuration

pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod query;

pub use config::{ConfigError, StatlabConfig};
pub use error::ErrorKind;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the store and query types can be shared across
    /// threads, so concurrent readers need no wrapper.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::FactRecord>();
        require_sync::<domain::FactRecord>();
        require_send::<data::FactStore>();
        require_sync::<data::FactStore>();
        require_send::<query::Predicate>();
        require_sync::<query::Predicate>();
        require_send::<query::QueryResponse>();
        require_sync::<query::QueryResponse>();
        require_send::<query::QueryError>();
        require_sync::<query::QueryError>();
    }

    #[test]
    fn concurrent_queries_share_one_store() {
        use query::test_support::{fact, store_of};

        let store = store_of(vec![
            fact(1, "Avery", 2020, "BOS", Some(10)),
            fact(2, "Blake", 2020, "NYK", Some(20)),
        ]);
        let rankings: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| query::run_query(&store, &query::QueryRequest::new("pts"))))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap().unwrap().ranking)
                .collect()
        });
        assert!(rankings.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(rankings[0][0].player_id, 2);
    }
}
