//! Typed columns and per-column coercions.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::value::{Timestamp, Value, ValueKind};
use crate::error::MetricError;

/// Kind of a whole column, derived from its present values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// No present values at all.
    Empty,
    Numeric,
    Boolean,
    Temporal,
    Text,
    /// More than one value kind present.
    Mixed,
}

impl ColumnKind {
    /// Returns true for columns numeric metrics should consider.
    ///
    /// An all-missing column counts as numeric so numeric metrics report it
    /// as having no data rather than skipping it silently.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Numeric | ColumnKind::Empty)
    }
}

/// A named column of typed values.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    values: Vec<Value>,
    kind: ColumnKind,
}

impl Column {
    /// Create a column, deriving its kind from the values.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let kinds: BTreeSet<ValueKind> = values.iter().filter_map(Value::kind).collect();
        let kind = match (kinds.len(), kinds.iter().next()) {
            (0, _) => ColumnKind::Empty,
            (1, Some(ValueKind::Numeric)) => ColumnKind::Numeric,
            (1, Some(ValueKind::Boolean)) => ColumnKind::Boolean,
            (1, Some(ValueKind::Temporal)) => ColumnKind::Temporal,
            (1, Some(ValueKind::Text)) => ColumnKind::Text,
            _ => ColumnKind::Mixed,
        };

        Self {
            name: name.into(),
            values,
            kind,
        }
    }

    /// Create a column by typing raw strings.
    pub fn from_raw<'a>(name: impl Into<String>, raw: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(name, raw.into_iter().map(Value::infer).collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// Number of rows, including missing cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of missing cells.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }

    /// Present values in row order.
    pub fn present(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().filter(|v| !v.is_missing())
    }

    /// Distinct value kinds among present values.
    pub fn value_kinds(&self) -> BTreeSet<ValueKind> {
        self.values.iter().filter_map(Value::kind).collect()
    }

    /// Number of distinct present values.
    pub fn distinct_count(&self) -> usize {
        self.present().collect::<HashSet<_>>().len()
    }

    /// Row-aligned numeric view; fails on the first non-numeric present value.
    pub fn numeric(&self) -> Result<Vec<Option<f64>>, MetricError> {
        self.values
            .iter()
            .map(|v| match v {
                Value::Missing => Ok(None),
                other => other.as_f64().map(Some).ok_or_else(|| MetricError::NotNumeric {
                    column: self.name.clone(),
                    value: other.to_string(),
                }),
            })
            .collect()
    }

    /// Present numeric values in row order.
    pub fn numeric_values(&self) -> Result<Vec<f64>, MetricError> {
        Ok(self.numeric()?.into_iter().flatten().collect())
    }

    /// Row-aligned temporal view; unparseable values become `None`.
    pub fn timestamps(&self) -> Vec<Option<Timestamp>> {
        self.values.iter().map(Value::as_timestamp).collect()
    }

    /// Present values rendered as text, in row order.
    pub fn rendered(&self) -> Vec<String> {
        self.values.iter().filter_map(Value::render).collect()
    }
}
