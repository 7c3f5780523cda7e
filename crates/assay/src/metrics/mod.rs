//! Metric groups and the result vocabulary they share.
//!
//! Each group is a stateless struct exposing one method per metric. Methods
//! return typed records; per-column metrics return [`PerColumn`], which keeps
//! a failing column from affecting its siblings.

pub mod analytics;
pub mod core;
pub mod information;
pub mod precision;
pub mod semantic;
pub mod statistical;
pub mod stats;
pub mod structural;
pub mod temporal;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::warn;

use crate::error::MetricError;
use crate::table::{Column, Table};

pub use self::analytics::AdvancedAnalytics;
pub use self::core::CoreQuality;
pub use self::information::InformationQuality;
pub use self::precision::PrecisionQuality;
pub use self::semantic::SemanticQuality;
pub use self::statistical::StatisticalQuality;
pub use self::structural::StructuralQuality;
pub use self::temporal::TemporalQuality;

/// Status label attached to every metric record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    Issue,
    #[serde(rename = "GOOD")]
    Good,
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "CRITICAL")]
    Critical,
    Inconsistent,
    Invalid,
    Valid,
    Normal,
    #[serde(rename = "Non-normal")]
    NonNormal,
    Stable,
    Unstable,
    #[serde(rename = "High Skew")]
    HighSkew,
    #[serde(rename = "High Kurtosis")]
    HighKurtosis,
    #[serde(rename = "High Variability")]
    HighVariability,
    #[serde(rename = "Anomalies Found")]
    AnomaliesFound,
    #[serde(rename = "Drift Detected")]
    DriftDetected,
    #[serde(rename = "Low cardinality issue")]
    LowCardinality,
    #[serde(rename = "No identifier columns configured")]
    NotConfigured,
    #[serde(rename = "Low entropy")]
    LowEntropy,
    /// Empty input for most metrics.
    #[serde(rename = "No data")]
    NoData,
    /// Empty column for `range_conformity`.
    #[serde(rename = "No Data")]
    NoDataColumn,
    #[serde(rename = "No Data / Constant Values")]
    Constant,
    #[serde(rename = "N/A")]
    NotApplicable,
    Error,
}

impl Status {
    /// `Issue` when `bad` holds, `OK` otherwise.
    pub fn issue_if(bad: bool) -> Self {
        if bad { Status::Issue } else { Status::Ok }
    }

    /// Returns true for labels that signal a problem.
    pub fn is_problem(&self) -> bool {
        !matches!(
            self,
            Status::Ok
                | Status::Good
                | Status::Valid
                | Status::Normal
                | Status::Stable
                | Status::NoData
                | Status::NoDataColumn
                | Status::Constant
                | Status::NotApplicable
        )
    }
}

/// Per-column results in table order.
///
/// `Err` entries serialize as `{"status": "Error", "error": <message>}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerColumn<T>(IndexMap<String, Result<T, MetricError>>);

impl<T> PerColumn<T> {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Record a column result, logging failures.
    pub fn insert(&mut self, column: impl Into<String>, result: Result<T, MetricError>) {
        let column = column.into();
        if let Err(e) = &result {
            warn!(column = %column, error = %e, "Column metric failed");
        }
        self.0.insert(column, result);
    }

    /// Record a successful column result.
    pub fn ok(&mut self, column: impl Into<String>, record: T) {
        self.0.insert(column.into(), Ok(record));
    }

    pub fn get(&self, column: &str) -> Option<&Result<T, MetricError>> {
        self.0.get(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Result<T, MetricError>)> {
        self.0.iter()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<T> Default for PerColumn<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialized form of a failed column or metric.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub status: Status,
    pub error: String,
}

impl ErrorRecord {
    pub fn new(error: &MetricError) -> Self {
        Self {
            status: Status::Error,
            error: error.to_string(),
        }
    }
}

impl<T: Serialize> Serialize for PerColumn<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (column, result) in &self.0 {
            match result {
                Ok(record) => map.serialize_entry(column, record)?,
                Err(e) => map.serialize_entry(column, &ErrorRecord::new(e))?,
            }
        }
        map.end()
    }
}

/// Apply `f` to the present numeric values of each named column.
pub(crate) fn per_numeric_column<T>(
    table: &Table,
    columns: &[String],
    mut f: impl FnMut(&Column, Vec<f64>) -> Option<T>,
) -> PerColumn<T> {
    let mut results = PerColumn::new();
    for name in columns {
        let values = table
            .require(name)
            .and_then(|column| column.numeric_values().map(|v| (column, v)));
        match values {
            Ok((column, values)) => {
                if let Some(record) = f(column, values) {
                    results.ok(name.clone(), record);
                }
            }
            Err(e) => results.insert(name.clone(), Err(e)),
        }
    }
    results
}

// =============================================================================
// ROUNDING
// =============================================================================

/// Round half away from zero to `places` decimals; non-finite values pass through.
pub fn round_to(value: f64, places: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(places);
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() { rounded } else { value }
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

pub fn round3(value: f64) -> f64 {
    round_to(value, 3)
}

/// Percentage of `part` in `whole`; 0 when `whole` is 0.
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// `Some(x)` when `x` is finite.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
