//! The typed table every metric group consumes.
//!
//! Cells are typed once, when the table is built, into [`Value`]s. Metrics
//! then ask a [`Column`] for the view they need (numeric, temporal or
//! rendered text) instead of re-inspecting raw strings.

mod column;
mod value;

use std::collections::HashSet;

use indexmap::IndexMap;

pub use column::{Column, ColumnKind};
pub use value::{Timestamp, Value, ValueKind};

use crate::error::{AssayError, MetricError, Result};
use crate::input::DataTable;

/// Ordered, named columns with aligned rows.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Build a table from columns; names must be unique and lengths equal.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(AssayError::InvalidTable(format!(
                    "duplicate column name '{}'",
                    column.name()
                )));
            }
            if column.len() != row_count {
                return Err(AssayError::InvalidTable(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name(),
                    column.len(),
                    row_count
                )));
            }
        }

        Ok(Self { columns, row_count })
    }

    /// Type a parsed [`DataTable`].
    ///
    /// Repeated headers get the first free `.N` suffix; a suffix never
    /// reuses a name that appears among the original headers.
    pub fn from_data_table(data: &DataTable) -> Result<Self> {
        let originals: HashSet<&str> = data.headers.iter().map(String::as_str).collect();
        let mut used: HashSet<String> = HashSet::new();
        let mut occurrences: IndexMap<&str, usize> = IndexMap::new();
        let columns = data
            .headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let seen = occurrences.entry(header.as_str()).or_insert(0);
                let mut name = header.clone();
                let mut suffix = *seen;
                while suffix > 0 && (originals.contains(name.as_str()) || used.contains(&name)) {
                    name = format!("{header}.{suffix}");
                    suffix += 1;
                }
                *seen += 1;
                used.insert(name.clone());
                Column::from_raw(name, data.column_values(idx))
            })
            .collect();

        Self::new(columns)
    }

    /// Build a table from literal rows of raw strings.
    pub fn from_rows(headers: &[&str], rows: &[Vec<&str>]) -> Result<Self> {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                Column::from_raw(*name, rows.iter().map(|r| r.get(idx).copied().unwrap_or("")))
            })
            .collect();
        Self::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.row_count * self.columns.len()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Look up a column, reporting absence as a metric error.
    pub fn require(&self, name: &str) -> std::result::Result<&Column, MetricError> {
        self.column(name)
            .ok_or_else(|| MetricError::ColumnNotFound(name.to_string()))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Names of numeric (or all-missing) columns, in table order.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.kind().is_numeric())
            .map(|c| c.name().to_string())
            .collect()
    }

    /// The subset of `names` present in the table, in the given order.
    pub fn present(&self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter(|n| self.has_column(n))
            .cloned()
            .collect()
    }

    /// Cells of one row, in column order.
    pub fn row(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.columns.iter().map(move |c| &c.values()[index])
    }
}
