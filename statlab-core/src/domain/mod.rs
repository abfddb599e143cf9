//! Domain types: raw rows, canonical fact rows, positions.

pub mod position;
pub mod record;

pub use position::{Position, PositionGroup, POSITION_TABLE};
pub use record::{
    finite_ratio, true_shooting, FactKey, FactRecord, RawRecord, StatLine, REQUIRED_RAW_COLUMNS,
};
