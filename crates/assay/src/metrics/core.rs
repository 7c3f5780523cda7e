//! Core quality: completeness, consistency, accuracy, validity, timeliness, uniqueness.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use super::{percent, round2, stats, PerColumn, Status};
use crate::engine::{GroupKind, MetricGroup, Report, ScoringContext};
use crate::table::{Table, Value};

const CRITICAL_MISSING: f64 = 0.20;
const WARNING_MISSING: f64 = 0.10;
const MIN_VALIDITY_PCT: f64 = 90.0;
const OUTLIER_Z: f64 = 3.0;
const MAX_OUTLIER_PCT: f64 = 10.0;
const LARGE_GAP_FACTOR: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completeness {
    pub score: f64,
    pub missing_cells: usize,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateValidity {
    #[serde(rename = "validity_%")]
    pub validity_pct: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierShare {
    #[serde(rename = "outlier_%")]
    pub outlier_pct: Option<f64>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeValidity {
    pub invalid_count: usize,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeliness {
    pub large_gaps: usize,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Uniqueness {
    pub duplicate_count: usize,
    pub uniqueness_score: Option<f64>,
    pub status: Status,
}

/// Baseline data-quality metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreQuality;

impl CoreQuality {
    /// Share of non-missing cells across the whole table.
    pub fn completeness(&self, table: &Table) -> Completeness {
        let total = table.cell_count();
        let missing: usize = table.columns().iter().map(|c| c.missing_count()).sum();

        if total == 0 {
            return Completeness {
                score: 100.0,
                missing_cells: 0,
                status: Status::NoData,
            };
        }

        let missing_ratio = missing as f64 / total as f64;
        let status = if missing_ratio > CRITICAL_MISSING {
            Status::Critical
        } else if missing_ratio > WARNING_MISSING {
            Status::Warning
        } else {
            Status::Good
        };

        Completeness {
            score: round2(percent(total - missing, total)),
            missing_cells: missing,
            status,
        }
    }

    /// Share of rows that parse as a timestamp, per datetime column.
    pub fn consistency(&self, table: &Table, datetime_columns: &[String]) -> PerColumn<DateValidity> {
        let mut results = PerColumn::new();
        for name in datetime_columns {
            let result = table.require(name).map(|column| {
                let parsed = column.timestamps().iter().filter(|t| t.is_some()).count();
                if column.is_empty() {
                    return DateValidity {
                        validity_pct: 0.0,
                        status: Status::NoData,
                    };
                }
                let validity = percent(parsed, column.len());
                DateValidity {
                    validity_pct: round2(validity),
                    status: if validity < MIN_VALIDITY_PCT {
                        Status::Inconsistent
                    } else {
                        Status::Ok
                    },
                }
            });
            results.insert(name.clone(), result);
        }
        results
    }

    /// Share of rows with a population z-score above 3, per numeric column.
    pub fn accuracy(&self, table: &Table, numeric_columns: &[String]) -> PerColumn<OutlierShare> {
        let mut results = PerColumn::new();
        for name in numeric_columns {
            let result = table.require(name).and_then(|column| {
                let values = column.numeric_values()?;
                if values.is_empty() {
                    return Ok(OutlierShare {
                        outlier_pct: None,
                        status: Status::NoData,
                    });
                }

                let outliers = stats::z_scores(&values)
                    .map(|z| z.iter().filter(|v| v.abs() > OUTLIER_Z).count())
                    .unwrap_or(0);
                let share = percent(outliers, column.len());
                Ok(OutlierShare {
                    outlier_pct: Some(round2(share)),
                    status: Status::issue_if(share > MAX_OUTLIER_PCT),
                })
            });
            results.insert(name.clone(), result);
        }
        results
    }

    /// Count of values outside the configured inclusive range, per present column.
    pub fn validity(
        &self,
        table: &Table,
        value_ranges: &IndexMap<String, (f64, f64)>,
    ) -> PerColumn<RangeValidity> {
        let mut results = PerColumn::new();
        for (name, (min, max)) in value_ranges {
            let Some(column) = table.column(name) else {
                continue;
            };
            let result = column.numeric_values().map(|values| {
                let invalid = values.iter().filter(|v| **v < *min || **v > *max).count();
                RangeValidity {
                    invalid_count: invalid,
                    status: if invalid > 0 { Status::Invalid } else { Status::Valid },
                }
            });
            results.insert(name.clone(), result);
        }
        results
    }

    /// Gaps larger than three times the median gap, per fully temporal column.
    pub fn timeliness(&self, table: &Table, datetime_columns: &[String]) -> PerColumn<Timeliness> {
        let mut results = PerColumn::new();
        for name in datetime_columns {
            let column = match table.require(name) {
                Ok(column) => column,
                Err(e) => {
                    results.insert(name.clone(), Err(e));
                    continue;
                }
            };

            // Skip columns with any unparseable value
            let parsed: Option<Vec<_>> = column
                .present()
                .map(|v| v.as_timestamp().map(|t| t.instant()))
                .collect();
            let Some(mut instants) = parsed else {
                continue;
            };
            instants.sort();

            let gaps: Vec<f64> = instants
                .windows(2)
                .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 1000.0)
                .collect();
            if gaps.is_empty() {
                continue;
            }

            let threshold = stats::median(&gaps) * LARGE_GAP_FACTOR;
            let large = gaps.iter().filter(|g| **g > threshold).count();
            results.ok(
                name.clone(),
                Timeliness {
                    large_gaps: large,
                    status: Status::issue_if(large > 0),
                },
            );
        }
        results
    }

    /// Full-row duplicates after their first occurrence.
    pub fn uniqueness(&self, table: &Table) -> Uniqueness {
        let rows = table.row_count();
        if rows == 0 {
            return Uniqueness {
                duplicate_count: 0,
                uniqueness_score: None,
                status: Status::NoData,
            };
        }

        let mut seen: HashSet<Vec<&Value>> = HashSet::with_capacity(rows);
        let duplicates = (0..rows)
            .filter(|&i| !seen.insert(table.row(i).collect()))
            .count();

        Uniqueness {
            duplicate_count: duplicates,
            uniqueness_score: Some(round2(100.0 - percent(duplicates, rows))),
            status: Status::issue_if(duplicates > 0),
        }
    }
}

impl MetricGroup for CoreQuality {
    fn kind(&self) -> GroupKind {
        GroupKind::Core
    }

    fn evaluate(&self, table: &Table, ctx: &ScoringContext<'_>) -> Report {
        let numeric = table.numeric_columns();
        let datetime = ctx.datetime_columns(table);

        let mut report = Report::new(self.kind());
        report.push("completeness", &self.completeness(table));
        report.push("consistency", &self.consistency(table, &datetime));
        report.push("accuracy", &self.accuracy(table, &numeric));
        report.push("validity", &self.validity(table, &ctx.settings.value_ranges));
        report.push("timeliness", &self.timeliness(table, &datetime));
        report.push("uniqueness", &self.uniqueness(table));
        report
    }
}
