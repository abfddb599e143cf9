//! Raw ingest, canonicalization and the columnar fact store.

pub mod canonicalize;
pub mod ingest;
pub mod schema;
pub mod store;

pub use canonicalize::{
    canonicalize, CanonicalizeError, CanonicalizeOptions, CanonicalizeReport, Canonicalizer,
    DuplicateKey,
};
pub use ingest::{ingest_csv, ingest_reader, summarize, IngestError, IngestSummary};
pub use schema::{FactSchema, SchemaError, FILTER_COLUMNS};
pub use store::{FactStore, StoreError, StoreMeta, StoreStats};
