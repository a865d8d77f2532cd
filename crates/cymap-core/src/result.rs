//! Result envelope and per-invocation mapping context.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::convert::{ConverterRegistry, ValueConverter};
use crate::de::{RowDeserializer, ValueDeserializer};
use crate::error::MapError;
use crate::value::GraphValue;

/// Wire-result convention for a query's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMode {
    /// Each row is a single column holding a whole node/relationship-like
    /// object; the row's target is poured from that one value.
    Set,
    /// Each row has one column per scalar/object field; struct targets
    /// are served by column name, tuple targets by column order.
    Projection,
}

/// Per-mapping state: result mode plus the converter chain.
///
/// Built fresh per invocation; mapping is synchronous and carries no
/// shared mutable state.
pub struct MapContext {
    mode: ResultMode,
    converters: ConverterRegistry,
}

impl MapContext {
    pub fn new(mode: ResultMode) -> Self {
        Self {
            mode,
            converters: ConverterRegistry::new(),
        }
    }

    /// Context for set-mode results.
    pub fn set() -> Self {
        Self::new(ResultMode::Set)
    }

    /// Context for projection-mode results.
    pub fn projection() -> Self {
        Self::new(ResultMode::Projection)
    }

    /// Add a user converter; runs before any previously active defaults.
    pub fn with_converter(mut self, converter: Box<dyn ValueConverter>) -> Self {
        self.converters.register(converter);
        self
    }

    pub fn mode(&self) -> ResultMode {
        self.mode
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }
}

/// An ordered set of named columns with one value vector per row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<GraphValue>>,
}

impl ResultSet {
    /// Build a result set, validating that every row carries exactly
    /// one value per declared column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<GraphValue>>) -> Result<Self, MapError> {
        for row in &rows {
            if row.len() != columns.len() {
                return Err(MapError::RowArity {
                    got: row.len(),
                    expected: columns.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<GraphValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a named column, with remediation text when absent.
    pub fn column_index(&self, name: &str) -> Result<usize, MapError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| MapError::MissingColumn(name.to_string()))
    }

    /// Map every row onto `T` under the given context.
    pub fn map_rows<T: DeserializeOwned>(&self, ctx: &MapContext) -> Result<Vec<T>, MapError> {
        debug!(
            rows = self.rows.len(),
            mode = ?ctx.mode(),
            target_type = std::any::type_name::<T>(),
            "mapping result rows"
        );
        self.rows.iter().map(|row| self.map_one(row, ctx)).collect()
    }

    /// Map a single row by index.
    pub fn map_row<T: DeserializeOwned>(
        &self,
        index: usize,
        ctx: &MapContext,
    ) -> Result<T, MapError> {
        let row = self
            .rows
            .get(index)
            .ok_or_else(|| MapError::Message(format!("row index {} out of bounds", index)))?;
        self.map_one(row, ctx)
    }

    fn map_one<T: DeserializeOwned>(
        &self,
        row: &[GraphValue],
        ctx: &MapContext,
    ) -> Result<T, MapError> {
        match ctx.mode() {
            ResultMode::Set => {
                if self.columns.len() != 1 {
                    return Err(MapError::SetModeColumns(self.columns.len()));
                }
                let value = row.first().cloned().unwrap_or(GraphValue::Null);
                T::deserialize(ValueDeserializer::new(value, ctx)?)
            }
            ResultMode::Projection => {
                T::deserialize(RowDeserializer::new(&self.columns, row.to_vec(), ctx)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_arity_validated() {
        let err = ResultSet::new(
            vec!["a".into(), "b".into()],
            vec![vec![GraphValue::Int(1)]],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MapError::RowArity {
                got: 1,
                expected: 2
            }
        ));
    }

    #[test]
    fn test_set_mode_rejects_multi_column() {
        let set = ResultSet::new(
            vec!["a".into(), "b".into()],
            vec![vec![GraphValue::Int(1), GraphValue::Int(2)]],
        )
        .unwrap();
        let err = set.map_rows::<i64>(&MapContext::set()).unwrap_err();
        assert!(matches!(err, MapError::SetModeColumns(2)));
    }

    #[test]
    fn test_missing_column_names_remediation() {
        let set = ResultSet::new(vec!["count".into()], Vec::new()).unwrap();
        let err = set.column_index("total").unwrap_err();
        assert!(err.to_string().contains("RETURN clause"));
    }
}
