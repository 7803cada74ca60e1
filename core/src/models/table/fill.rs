//! Bulk loading from tabular results

use log::info;
use serde::{Serialize, Deserialize};

use crate::error::{CoreError, Result};
use crate::events::TableEvent;
use crate::models::row::RowState;
use crate::models::value::Value;
use super::Table;

/// Where loaded rows go relative to existing ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillMode {
    /// Replace all rows
    Overwrite,

    /// After the existing rows
    Append,

    /// Before the existing rows, keeping the source order
    Prepend,
}

/// Generic tabular result: named columns and records of values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Column names, in record order
    pub columns: Vec<String>,

    /// Records, each aligned to `columns`
    pub records: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Create an empty result with the given columns
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        ResultSet {
            columns: columns.into_iter().map(Into::into).collect(),
            records: Vec::new(),
        }
    }

    /// Builder-style record append
    pub fn with_record(mut self, record: Vec<Value>) -> Self {
        self.records.push(record);
        self
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Table {
    /// Load records as Unchanged rows.
    ///
    /// Source columns are matched by name. Unknown source columns and
    /// persistent table columns missing from the source are errors unless
    /// the table's fill flags allow them. All records are validated and
    /// checked for uniqueness before any row is added; on failure the table
    /// is unchanged. Fires a single `StructureChanged`.
    pub fn fill(&mut self, data: ResultSet, mode: FillMode) -> Result<usize> {
        let mapping = self.fill_mapping(&data.columns)?;

        let mut prepared = Vec::with_capacity(data.records.len());
        for (n, record) in data.records.into_iter().enumerate() {
            if record.len() != mapping.len() {
                return Err(CoreError::ShapeError(format!(
                    "record {} has {} values, expected {}",
                    n,
                    record.len(),
                    mapping.len()
                )));
            }
            let mut values = self.initial_values();
            for (target, value) in mapping.iter().zip(record) {
                if let Some(pos) = *target {
                    values[pos] = self.columns[pos].prepare(value, self.config.truncate_strings)?;
                }
            }
            self.check_required(&values)?;
            prepared.push(values);
        }

        let mut indices = self.indices.clone();
        if mode == FillMode::Overwrite {
            for index in indices.iter_mut() {
                index.clear();
            }
        }
        for values in &prepared {
            if self.config.enforce_unique {
                for index in &indices {
                    index.check_insert(&self.columns, values)?;
                }
            }
            for index in indices.iter_mut() {
                index.try_insert(&self.columns, values);
            }
        }

        let count = prepared.len();
        let at = match mode {
            FillMode::Overwrite => {
                self.rows.clear();
                0
            }
            FillMode::Append => self.rows.len(),
            FillMode::Prepend => 0,
        };
        self.splice_rows(at, prepared, RowState::Unchanged, indices);

        info!("{}: loaded {} rows ({:?})", self.name, count, mode);
        self.notify(TableEvent::StructureChanged);
        Ok(count)
    }

    /// Target position for every source column, `None` for ignored ones
    fn fill_mapping(&self, source: &[String]) -> Result<Vec<Option<usize>>> {
        let mut mapping = Vec::with_capacity(source.len());
        let mut seen = vec![false; self.columns.len()];
        for name in source {
            match self.column_index(name) {
                Some(pos) => {
                    if seen[pos] {
                        return Err(CoreError::ShapeError(format!("column {} appears twice in the source", name)));
                    }
                    seen[pos] = true;
                    mapping.push(Some(pos));
                }
                None if self.config.allow_superfluous_fill_columns => mapping.push(None),
                None => return Err(CoreError::UnknownColumn(name.clone())),
            }
        }

        if !self.config.allow_missing_fill_columns {
            if let Some(missing) = self
                .columns
                .iter()
                .zip(&seen)
                .find(|(c, seen)| c.is_persistent() && !**seen)
                .map(|(c, _)| c)
            {
                return Err(CoreError::ShapeError(format!(
                    "source lacks column {} of table {}",
                    missing.name(),
                    self.name
                )));
            }
        }
        Ok(mapping)
    }
}
