use polars::prelude::*;

/// Expected schema for the fact table
pub struct FactSchema;

/// Columns that may be filtered by the query engine.
pub const FILTER_COLUMNS: &[&str] = &["season", "team", "position", "player_id"];

impl FactSchema {
    /// Get the canonical fact schema
    pub fn schema() -> Schema {
        let int = |name: &str| Field::new(name.into(), DataType::Int64);
        let float = |name: &str| Field::new(name.into(), DataType::Float64);
        let text = |name: &str| Field::new(name.into(), DataType::String);

        Schema::from_iter(vec![
            int("row_id"),
            Field::new("season".into(), DataType::Int32),
            int("player_id"),
            text("player"),
            Field::new("birth_year".into(), DataType::Int32),
            text("position"),
            text("position_original"),
            text("position_group"),
            Field::new("age".into(), DataType::Int32),
            text("experience"),
            text("league"),
            text("team"),
            int("games"),
            int("games_started"),
            float("minutes"),
            int("fg"),
            int("fga"),
            float("fg_percent"),
            int("x3p"),
            int("x3pa"),
            float("x3p_percent"),
            int("x2p"),
            int("x2pa"),
            float("x2p_percent"),
            float("e_fg_percent"),
            int("ft"),
            int("fta"),
            float("ft_percent"),
            int("orb"),
            int("drb"),
            int("trb"),
            int("ast"),
            int("stl"),
            int("blk"),
            int("tov"),
            int("pf"),
            int("pts"),
            float("ppg"),
            float("rpg"),
            float("apg"),
            float("spg"),
            float("bpg"),
            float("mpg"),
            float("ts_percent"),
        ])
    }

    /// True if `column` exists and can be summed or averaged.
    pub fn is_aggregable(column: &str) -> bool {
        matches!(
            Self::schema().get(column),
            Some(DataType::Int32 | DataType::Int64 | DataType::Float64)
        )
    }

    /// Validate DataFrame against schema
    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        let expected = Self::schema();
        let actual = df.schema();

        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
            if actual_dtype != field.dtype() {
                return Err(SchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: actual_dtype.clone(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_identity_and_filter_columns() {
        let schema = FactSchema::schema();
        for name in ["player_id", "player", "season", "team", "position", "games"] {
            assert!(schema.contains(name), "missing {name}");
        }
        for name in FILTER_COLUMNS {
            assert!(schema.contains(name));
        }
    }

    #[test]
    fn test_aggregable_columns() {
        assert!(FactSchema::is_aggregable("pts"));
        assert!(FactSchema::is_aggregable("ppg"));
        assert!(FactSchema::is_aggregable("season"));
        assert!(!FactSchema::is_aggregable("team"));
        assert!(!FactSchema::is_aggregable("no_such_column"));
    }

    #[test]
    fn test_validate_rejects_missing_column() {
        let df = DataFrame::new(vec![
            Column::new("season".into(), &[2024i32]),
            Column::new("player".into(), &["A"]),
        ])
        .unwrap();

        let result = FactSchema::validate(&df);
        assert!(matches!(result, Err(SchemaError::MissingColumn(_))));
    }
}
