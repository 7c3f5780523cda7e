//! Structural quality: schema conformity, naming, typing and identifier cardinality.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{round2, Status};
use crate::engine::{GroupKind, MetricGroup, Report, ScoringContext};
use crate::table::Table;

static COLUMN_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

const MAX_NAME_LEN: usize = 50;
const MIN_TYPE_CONSISTENCY: f64 = 0.9;
const MIN_NAMING_SCORE: f64 = 0.7;
const MIN_UNIQUE_RATIO: f64 = 0.5;
const MIN_METADATA_COLUMNS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaConformity {
    pub missing_columns: Vec<String>,
    pub conformity_score: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeConsistency {
    pub inconsistent_columns: Vec<String>,
    pub consistency_score: Option<f64>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamingConvention {
    pub invalid_columns: Vec<String>,
    pub naming_score: Option<f64>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralIntegrity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardinalities: Option<IndexMap<String, usize>>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardinalityQuality {
    pub unique_ratios: IndexMap<String, f64>,
    pub low_cardinality_columns: Vec<String>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDrift {
    pub new_columns: Vec<String>,
    pub missing_columns: Vec<String>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataCompleteness {
    pub datetime_present: bool,
    pub column_count: usize,
    pub status: Status,
}

/// Table-shape metrics; all results are table-level.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralQuality;

impl StructuralQuality {
    /// Share of expected columns that are present.
    pub fn schema_conformity(&self, table: &Table, expected_schema: &[String]) -> SchemaConformity {
        let missing: Vec<String> = expected_schema
            .iter()
            .filter(|c| !table.has_column(c))
            .cloned()
            .collect();
        let score = if expected_schema.is_empty() {
            1.0
        } else {
            1.0 - missing.len() as f64 / expected_schema.len() as f64
        };

        SchemaConformity {
            status: Status::issue_if(!missing.is_empty()),
            missing_columns: missing,
            conformity_score: round2(score),
        }
    }

    /// Columns holding more than one kind of present value.
    pub fn data_type_consistency(&self, table: &Table) -> TypeConsistency {
        let inconsistent: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| c.value_kinds().len() > 1)
            .map(|c| c.name().to_string())
            .collect();

        let Some(score) = share_valid(inconsistent.len(), table.column_count()) else {
            return TypeConsistency {
                inconsistent_columns: inconsistent,
                consistency_score: None,
                status: Status::NoData,
            };
        };
        TypeConsistency {
            inconsistent_columns: inconsistent,
            consistency_score: Some(round2(score)),
            status: Status::issue_if(score < MIN_TYPE_CONSISTENCY),
        }
    }

    /// Column names limited to `[A-Za-z0-9_]` and 50 characters.
    pub fn naming_convention(&self, table: &Table) -> NamingConvention {
        let invalid: Vec<String> = table
            .column_names()
            .into_iter()
            .filter(|name| !COLUMN_NAME.is_match(name) || name.chars().count() > MAX_NAME_LEN)
            .map(str::to_string)
            .collect();

        let Some(score) = share_valid(invalid.len(), table.column_count()) else {
            return NamingConvention {
                invalid_columns: invalid,
                naming_score: None,
                status: Status::NoData,
            };
        };
        NamingConvention {
            invalid_columns: invalid,
            naming_score: Some(round2(score)),
            status: Status::issue_if(score < MIN_NAMING_SCORE),
        }
    }

    /// Identifier columns should agree on their number of distinct values.
    pub fn structural_integrity(&self, table: &Table, identifier_columns: &[String]) -> StructuralIntegrity {
        if identifier_columns.is_empty() {
            return StructuralIntegrity {
                cardinalities: None,
                status: Status::NotConfigured,
            };
        }

        let cardinalities: IndexMap<String, usize> = identifier_columns
            .iter()
            .filter_map(|name| table.column(name))
            .map(|c| (c.name().to_string(), c.distinct_count()))
            .collect();

        let mut counts = cardinalities.values();
        let consistent = match counts.next() {
            Some(first) => counts.all(|c| c == first),
            None => false,
        };

        StructuralIntegrity {
            cardinalities: Some(cardinalities),
            status: if consistent {
                Status::Ok
            } else {
                Status::Inconsistent
            },
        }
    }

    /// Distinct-to-row ratio per present identifier column.
    pub fn cardinality_quality(&self, table: &Table, identifier_columns: &[String]) -> CardinalityQuality {
        let rows = table.row_count();
        let ratios: IndexMap<String, f64> = identifier_columns
            .iter()
            .filter_map(|name| table.column(name))
            .map(|c| {
                let ratio = if rows > 0 {
                    c.distinct_count() as f64 / rows as f64
                } else {
                    0.0
                };
                (c.name().to_string(), round2(ratio))
            })
            .collect();

        let low: Vec<String> = ratios
            .iter()
            .filter(|(_, ratio)| **ratio < MIN_UNIQUE_RATIO)
            .map(|(name, _)| name.clone())
            .collect();

        CardinalityQuality {
            status: if low.is_empty() {
                Status::Ok
            } else {
                Status::LowCardinality
            },
            unique_ratios: ratios,
            low_cardinality_columns: low,
        }
    }

    /// Columns added to or missing from the expected schema.
    pub fn schema_drift(&self, table: &Table, expected_schema: &[String]) -> SchemaDrift {
        let new_columns: Vec<String> = table
            .column_names()
            .into_iter()
            .filter(|name| !expected_schema.iter().any(|e| e.as_str() == *name))
            .map(str::to_string)
            .collect();
        let mut missing_columns: Vec<String> = Vec::new();
        for name in expected_schema {
            if !table.has_column(name) && !missing_columns.contains(name) {
                missing_columns.push(name.clone());
            }
        }

        SchemaDrift {
            status: if new_columns.is_empty() && missing_columns.is_empty() {
                Status::Ok
            } else {
                Status::DriftDetected
            },
            new_columns,
            missing_columns,
        }
    }

    /// A datetime column is present and the table has at least five columns.
    pub fn metadata_completeness(&self, table: &Table, datetime_columns: &[String]) -> MetadataCompleteness {
        let datetime_present = datetime_columns.iter().any(|c| table.has_column(c));
        let column_count = table.column_count();
        MetadataCompleteness {
            datetime_present,
            column_count,
            status: Status::issue_if(!(datetime_present && column_count >= MIN_METADATA_COLUMNS)),
        }
    }
}

/// `1 - bad / total`, or `None` when there is nothing to score.
fn share_valid(bad: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| 1.0 - bad as f64 / total as f64)
}

impl MetricGroup for StructuralQuality {
    fn kind(&self) -> GroupKind {
        GroupKind::Structural
    }

    fn evaluate(&self, table: &Table, ctx: &ScoringContext<'_>) -> Report {
        let settings = ctx.settings;

        let mut report = Report::new(self.kind());
        report.push("schema_conformity", &self.schema_conformity(table, &settings.expected_schema));
        report.push("data_type_consistency", &self.data_type_consistency(table));
        report.push("naming_convention", &self.naming_convention(table));
        report.push(
            "structural_integrity",
            &self.structural_integrity(table, &settings.identifier_columns),
        );
        report.push(
            "cardinality_quality",
            &self.cardinality_quality(table, &settings.identifier_columns),
        );
        report.push("schema_drift", &self.schema_drift(table, &settings.expected_schema));
        report.push(
            "metadata_completeness",
            &self.metadata_completeness(table, &settings.datetime_columns),
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table(headers: &[&str], rows: Vec<Vec<&str>>) -> Table {
        Table::from_rows(headers, &rows).unwrap()
    }

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_schema_conformity() {
        let table = make_table(&["a", "b"], vec![vec!["1", "2"]]);
        let result = StructuralQuality.schema_conformity(&table, &names(&["a", "b", "c", "d"]));
        assert_eq!(result.missing_columns, vec!["c", "d"]);
        assert_eq!(result.conformity_score, 0.5);
        assert_eq!(result.status, Status::Issue);

        let empty = StructuralQuality.schema_conformity(&table, &[]);
        assert_eq!(empty.conformity_score, 1.0);
        assert_eq!(empty.status, Status::Ok);
    }

    #[test]
    fn test_data_type_consistency() {
        let table = make_table(
            &["num", "mixed", "text"],
            vec![vec!["1", "1", "a"], vec!["2", "b", ""], vec!["", "2024-01-01", "c"]],
        );
        let result = StructuralQuality.data_type_consistency(&table);
        assert_eq!(result.inconsistent_columns, vec!["mixed"]);
        assert_eq!(result.consistency_score, Some(0.67));
        assert_eq!(result.status, Status::Issue);
    }

    #[test]
    fn test_naming_convention() {
        let long = "x".repeat(51);
        let table = make_table(&["good_name", "bad name", long.as_str(), "ok2"], vec![]);
        let result = StructuralQuality.naming_convention(&table);
        assert_eq!(result.invalid_columns, vec!["bad name".to_string(), long.clone()]);
        assert_eq!(result.naming_score, Some(0.5));
        assert_eq!(result.status, Status::Issue);
    }

    #[test]
    fn test_structural_integrity() {
        let table = make_table(
            &["id", "code", "site"],
            vec![vec!["1", "a", "x"], vec!["2", "b", "x"], vec!["3", "c", "y"]],
        );
        let unconfigured = StructuralQuality.structural_integrity(&table, &[]);
        assert_eq!(unconfigured.status, Status::NotConfigured);
        let json = serde_json::to_value(&unconfigured).unwrap();
        assert_eq!(json, serde_json::json!({"status": "No identifier columns configured"}));

        let ok = StructuralQuality.structural_integrity(&table, &names(&["id", "code", "absent"]));
        assert_eq!(ok.status, Status::Ok);
        assert_eq!(ok.cardinalities.unwrap().len(), 2);

        let bad = StructuralQuality.structural_integrity(&table, &names(&["id", "site"]));
        assert_eq!(bad.status, Status::Inconsistent);
    }

    #[test]
    fn test_cardinality_quality() {
        let table = make_table(
            &["id", "site"],
            vec![vec!["1", "x"], vec!["2", "x"], vec!["3", "x"], vec!["4", "y"]],
        );
        let result = StructuralQuality.cardinality_quality(&table, &names(&["id", "site"]));
        assert_eq!(result.unique_ratios["id"], 1.0);
        assert_eq!(result.unique_ratios["site"], 0.5);
        assert!(result.low_cardinality_columns.is_empty());
        assert_eq!(result.status, Status::Ok);

        let low = make_table(&["site"], vec![vec!["x"], vec!["x"], vec!["x"]]);
        let result = StructuralQuality.cardinality_quality(&low, &names(&["site"]));
        assert_eq!(result.low_cardinality_columns, vec!["site"]);
        assert_eq!(result.status, Status::LowCardinality);
    }

    #[test]
    fn test_schema_drift() {
        let table = make_table(&["a", "b"], vec![]);
        let same = StructuralQuality.schema_drift(&table, &names(&["a", "b"]));
        assert!(same.new_columns.is_empty() && same.missing_columns.is_empty());
        assert_eq!(same.status, Status::Ok);

        let drift = StructuralQuality.schema_drift(&table, &names(&["a", "c"]));
        assert_eq!(drift.new_columns, vec!["b"]);
        assert_eq!(drift.missing_columns, vec!["c"]);
        assert_eq!(drift.status, Status::DriftDetected);
    }

    #[test]
    fn test_metadata_completeness() {
        let table = make_table(&["ts", "a", "b", "c", "d"], vec![]);
        let ok = StructuralQuality.metadata_completeness(&table, &names(&["ts"]));
        assert!(ok.datetime_present);
        assert_eq!(ok.status, Status::Ok);

        let missing = StructuralQuality.metadata_completeness(&table, &names(&["time"]));
        assert_eq!(missing.status, Status::Issue);
    }
}
