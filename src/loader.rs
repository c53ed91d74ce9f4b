// 📥 Source Loader
// One configured source + its table → normalized (scope, indicator, value) triples.

use crate::config::SourceConfig;
use crate::error::{NormalizeError, SourceError};
use crate::normalize::{normalize_monthly_value, normalize_scope};
use crate::registry::{Scope, StateRegistry};
use crate::table::Table;
use tracing::{debug, warn};

/// One normalized candidate value
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub scope: Scope,
    pub key: String,
    /// Dollars per month
    pub value: f64,
}

/// Everything one source produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceLoad {
    pub key: String,
    pub records: Vec<SourceRecord>,
    /// Emitted state-scope records; national emissions are not counted
    pub state_records: usize,
    /// Rows removed by the row filter
    pub filtered_out: usize,
    /// Rows whose scope or value did not normalize
    pub dropped: usize,
}

pub struct SourceLoader<'a> {
    registry: &'a StateRegistry,
}

impl<'a> SourceLoader<'a> {
    pub fn new(registry: &'a StateRegistry) -> Self {
        SourceLoader { registry }
    }

    /// Normalize every kept row of `table` according to `config`.
    ///
    /// Both declared columns must exist, otherwise the source contributes nothing.
    pub fn load(&self, config: &SourceConfig, table: &Table) -> Result<SourceLoad, SourceError> {
        let (state_idx, value_idx) = match (
            table.column_index(&config.state_col),
            table.column_index(&config.value_col),
        ) {
            (Some(s), Some(v)) => (s, v),
            _ => {
                return Err(SourceError::MissingColumns {
                    state_col: config.state_col.clone(),
                    value_col: config.value_col.clone(),
                })
            }
        };

        // A filter on an absent column filters nothing
        let filter = config.filter.as_ref().and_then(|f| match table.column_index(&f.col) {
            Some(idx) => Some((idx, f)),
            None => {
                warn!(
                    "Filter column '{}' not found in '{}', keeping all rows",
                    f.col, config.key
                );
                None
            }
        });

        let mut load = SourceLoad {
            key: config.key.clone(),
            ..Default::default()
        };

        for row in table.rows() {
            if let Some((idx, f)) = filter {
                if !f.matches(Table::cell(row, idx)) {
                    load.filtered_out += 1;
                    continue;
                }
            }

            match self.normalize_row(config, Table::cell(row, state_idx), Table::cell(row, value_idx)) {
                Ok(record) => {
                    if !record.scope.is_national() {
                        load.state_records += 1;
                    }
                    load.records.push(record);
                }
                Err(reason) => {
                    debug!("'{}': dropped row ({})", config.key, reason);
                    load.dropped += 1;
                }
            }
        }

        Ok(load)
    }

    fn normalize_row(
        &self,
        config: &SourceConfig,
        state_cell: &str,
        value_cell: &str,
    ) -> Result<SourceRecord, NormalizeError> {
        let scope = normalize_scope(state_cell, self.registry)?;
        let value = normalize_monthly_value(value_cell, config.frequency)?;

        Ok(SourceRecord {
            scope,
            key: config.key.clone(),
            value,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RowFilter;
    use crate::normalize::Frequency;
    use crate::registry::tests::sample_registry;

    fn ca() -> Scope {
        Scope::State("CA".to_string())
    }

    #[test]
    fn test_load_emits_normalized_triples() {
        let registry = sample_registry();
        let loader = SourceLoader::new(&registry);
        let config = SourceConfig::new("rent", "rent.csv", "State", "Rent")
            .with_frequency(Frequency::Annual);
        let table = Table::from_rows(
            &["State", "Rent"],
            &[&["California", "$24,000"], &["tx", "18000"]],
        );

        let load = loader.load(&config, &table).unwrap();

        assert_eq!(load.records.len(), 2);
        assert_eq!(load.records[0], SourceRecord { scope: ca(), key: "rent".to_string(), value: 2000.0 });
        assert_eq!(load.records[1].value, 1500.0);
        assert_eq!(load.state_records, 2);

        println!("✅ Loaded {} records", load.state_records);
    }

    #[test]
    fn test_national_rows_are_not_counted() {
        let registry = sample_registry();
        let loader = SourceLoader::new(&registry);
        let config = SourceConfig::new("rent", "rent.csv", "State", "Rent");
        let table = Table::from_rows(
            &["State", "Rent"],
            &[&["United States", "1700"], &["CA", "2000"]],
        );

        let load = loader.load(&config, &table).unwrap();

        assert_eq!(load.records.len(), 2);
        assert_eq!(load.records[0].scope, Scope::National);
        assert_eq!(load.state_records, 1);
    }

    #[test]
    fn test_unresolved_and_unparsable_rows_are_dropped() {
        let registry = sample_registry();
        let loader = SourceLoader::new(&registry);
        let config = SourceConfig::new("rent", "rent.csv", "State", "Rent");
        let table = Table::from_rows(
            &["State", "Rent"],
            &[&["Mars", "100"], &["CA", "N/A"], &["NY", ""], &["Texas", "1400"]],
        );

        let load = loader.load(&config, &table).unwrap();

        assert_eq!(load.records.len(), 1);
        assert_eq!(load.records[0].scope, Scope::State("TX".to_string()));
        assert_eq!(load.dropped, 3);
    }

    #[test]
    fn test_missing_columns_skip_source() {
        let registry = sample_registry();
        let loader = SourceLoader::new(&registry);
        let config = SourceConfig::new("rent", "rent.csv", "State", "Median Rent");
        let table = Table::from_rows(&["State", "Rent"], &[&["CA", "2000"]]);

        let err = loader.load(&config, &table).unwrap_err();

        assert!(matches!(err, SourceError::MissingColumns { .. }));
    }

    #[test]
    fn test_row_filter_is_exact_string_equality() {
        let registry = sample_registry();
        let loader = SourceLoader::new(&registry);
        let config = SourceConfig::new("rent", "rent.csv", "State", "Rent")
            .with_filter(RowFilter::new("Year", "2024"));
        let table = Table::from_rows(
            &["State", "Rent", "Year"],
            &[
                &["CA", "1900", "2023"],
                &["CA", "2000", "2024"],
                &["NY", "2500", "2024.0"],
                &["TX", "1400", "2024"],
            ],
        );

        let load = loader.load(&config, &table).unwrap();

        let kept: Vec<(Scope, f64)> = load.records.iter().map(|r| (r.scope.clone(), r.value)).collect();
        assert_eq!(
            kept,
            vec![(ca(), 2000.0), (Scope::State("TX".to_string()), 1400.0)]
        );
        assert_eq!(load.filtered_out, 2);

        println!("✅ Filter kept {} of {} rows", load.records.len(), table.len());
    }

    #[test]
    fn test_numeric_filter_value_matches_integer_cells() {
        let registry = sample_registry();
        let loader = SourceLoader::new(&registry);
        let config = SourceConfig::new("rent", "rent.csv", "State", "Rent")
            .with_filter(RowFilter::new("Year", 2024));
        let table = Table::from_rows(
            &["State", "Rent", "Year"],
            &[&["CA", "2000", "2024"], &["NY", "2500", "2024.0"]],
        );

        let load = loader.load(&config, &table).unwrap();

        assert_eq!(load.records.len(), 1);
        assert_eq!(load.records[0].scope, ca());
    }

    #[test]
    fn test_filter_on_absent_column_keeps_all_rows() {
        let registry = sample_registry();
        let loader = SourceLoader::new(&registry);
        let config = SourceConfig::new("rent", "rent.csv", "State", "Rent")
            .with_filter(RowFilter::new("Year", "2024"));
        let table = Table::from_rows(&["State", "Rent"], &[&["CA", "2000"], &["NY", "2500"]]);

        let load = loader.load(&config, &table).unwrap();

        assert_eq!(load.records.len(), 2);
        assert_eq!(load.filtered_out, 0);
    }
}
