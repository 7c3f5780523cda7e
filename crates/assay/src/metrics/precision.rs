//! Numeric precision: decimal places, rounding, significant figures and
//! additive consistency between columns.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::{per_numeric_column, percent, round2, PerColumn, Status};
use crate::engine::{GroupKind, MetricGroup, Report, ScoringContext};
use crate::error::MetricError;
use crate::table::Table;

const MAX_DECIMAL_COUNTS: usize = 3;
const MIN_ROUNDING_PCT: f64 = 88.0;
const SIG_FIG_RENDER_PLACES: usize = 10;
const MIN_SIG_FIGS: usize = 2;
const MIN_SIG_FIG_PCT: f64 = 85.0;
const MIN_PRECISION_PCT: f64 = 90.0;
const MIN_CALCULATION_PCT: f64 = 92.0;
const CALCULATION_TOLERANCE: f64 = 0.01;

// isclose defaults for rounding comparisons
const REL_TOLERANCE: f64 = 1e-5;
const ABS_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecimalPrecision {
    pub unique_decimal_counts: Vec<usize>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundingConsistency {
    #[serde(rename = "match_%")]
    pub match_pct: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignificantFigures {
    #[serde(rename = "valid_%")]
    pub valid_pct: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementPrecision {
    pub most_common_decimals: Option<usize>,
    #[serde(rename = "precision_%")]
    pub precision_pct: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationAccuracy {
    #[serde(rename = "accuracy_%")]
    pub accuracy_pct: f64,
    pub status: Status,
}

/// Precision metrics over numeric columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecisionQuality;

/// Digits after the decimal point in the shortest round-trip rendering.
pub fn decimal_places(value: f64) -> usize {
    let rendered = value.to_string();
    rendered.split_once('.').map_or(0, |(_, fraction)| fraction.len())
}

/// Significant digits at a fixed rendering precision.
pub fn significant_figures(value: f64) -> usize {
    let rendered = format!("{:.*}", SIG_FIG_RENDER_PLACES, value.abs());
    rendered
        .trim_end_matches('0')
        .replace('.', "")
        .trim_start_matches('0')
        .chars()
        .filter(char::is_ascii_digit)
        .count()
}

fn is_close(a: f64, b: f64, rel: f64, abs: f64) -> bool {
    (a - b).abs() <= abs + rel * b.abs()
}

/// Whole or half-integer within tolerance.
fn is_rounded(value: f64) -> bool {
    let doubled = value * 2.0;
    is_close(value, value.round(), REL_TOLERANCE, ABS_TOLERANCE)
        || is_close(doubled, doubled.round(), REL_TOLERANCE, ABS_TOLERANCE)
}

impl PrecisionQuality {
    /// Distinct decimal-place counts per column.
    pub fn decimal_precision(&self, table: &Table, columns: &[String]) -> PerColumn<DecimalPrecision> {
        per_numeric_column(table, columns, |_, values| {
            if values.is_empty() {
                return Some(DecimalPrecision {
                    unique_decimal_counts: Vec::new(),
                    status: Status::NoData,
                });
            }
            let counts: BTreeSet<usize> = values.iter().map(|v| decimal_places(*v)).collect();
            Some(DecimalPrecision {
                status: Status::issue_if(counts.len() > MAX_DECIMAL_COUNTS),
                unique_decimal_counts: counts.into_iter().collect(),
            })
        })
    }

    /// Share of values on a whole or half-integer.
    pub fn rounding_consistency(&self, table: &Table, columns: &[String]) -> PerColumn<RoundingConsistency> {
        per_numeric_column(table, columns, |_, values| {
            if values.is_empty() {
                return Some(RoundingConsistency {
                    match_pct: 0.0,
                    status: Status::NoData,
                });
            }
            let matched = values.iter().filter(|v| is_rounded(**v)).count();
            let match_pct = round2(percent(matched, values.len()));
            Some(RoundingConsistency {
                match_pct,
                status: Status::issue_if(match_pct < MIN_ROUNDING_PCT),
            })
        })
    }

    /// Share of values carrying at least two significant digits.
    pub fn significant_figures(&self, table: &Table, columns: &[String]) -> PerColumn<SignificantFigures> {
        per_numeric_column(table, columns, |_, values| {
            if values.is_empty() {
                return Some(SignificantFigures {
                    valid_pct: 0.0,
                    status: Status::NoData,
                });
            }
            let valid = values
                .iter()
                .filter(|v| significant_figures(**v) >= MIN_SIG_FIGS)
                .count();
            let valid_pct = round2(percent(valid, values.len()));
            Some(SignificantFigures {
                valid_pct,
                status: Status::issue_if(valid_pct < MIN_SIG_FIG_PCT),
            })
        })
    }

    /// Modal decimal-place count and the share of values using it.
    ///
    /// Ties resolve to the smaller count.
    pub fn measurement_precision(&self, table: &Table, columns: &[String]) -> PerColumn<MeasurementPrecision> {
        per_numeric_column(table, columns, |_, values| {
            let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
            for value in &values {
                *counts.entry(decimal_places(*value)).or_insert(0) += 1;
            }

            let mut mode: Option<(usize, usize)> = None;
            for (places, count) in counts {
                if mode.map_or(true, |(_, best)| count > best) {
                    mode = Some((places, count));
                }
            }

            let Some((places, count)) = mode else {
                return Some(MeasurementPrecision {
                    most_common_decimals: None,
                    precision_pct: 0.0,
                    status: Status::NoData,
                });
            };
            let precision_pct = round2(percent(count, values.len()));
            Some(MeasurementPrecision {
                most_common_decimals: Some(places),
                precision_pct,
                status: Status::issue_if(precision_pct < MIN_PRECISION_PCT),
            })
        })
    }

    /// Share of rows where `c == a + b` within 0.01, for `columns = [a, b, c]`.
    ///
    /// Rows missing any of the three values are skipped.
    pub fn calculation_accuracy(
        &self,
        table: &Table,
        columns: &[String],
    ) -> Result<CalculationAccuracy, MetricError> {
        if columns.len() != 3 {
            return Err(MetricError::Configuration(
                "Provide exactly 3 columns: [a, b, c] where c should equal a+b".to_string(),
            ));
        }
        let missing: Vec<&str> = columns
            .iter()
            .filter(|name| !table.has_column(name))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(MetricError::Configuration(format!(
                "Missing columns: {missing:?}"
            )));
        }

        let a = table.require(&columns[0])?.numeric()?;
        let b = table.require(&columns[1])?.numeric()?;
        let c = table.require(&columns[2])?.numeric()?;

        let rows: Vec<(f64, f64, f64)> = a
            .iter()
            .zip(&b)
            .zip(&c)
            .filter_map(|((a, b), c)| Some(((*a)?, (*b)?, (*c)?)))
            .collect();
        if rows.is_empty() {
            return Ok(CalculationAccuracy {
                accuracy_pct: 0.0,
                status: Status::NoData,
            });
        }

        let matched = rows
            .iter()
            .filter(|(a, b, c)| is_close(a + b, *c, REL_TOLERANCE, CALCULATION_TOLERANCE))
            .count();
        let accuracy_pct = round2(percent(matched, rows.len()));
        Ok(CalculationAccuracy {
            accuracy_pct,
            status: Status::issue_if(accuracy_pct < MIN_CALCULATION_PCT),
        })
    }
}

impl MetricGroup for PrecisionQuality {
    fn kind(&self) -> GroupKind {
        GroupKind::Precision
    }

    fn evaluate(&self, table: &Table, ctx: &ScoringContext<'_>) -> Report {
        let numeric = table.numeric_columns();

        let mut report = Report::new(self.kind());
        report.push("decimal_precision", &self.decimal_precision(table, &numeric));
        report.push("rounding_consistency", &self.rounding_consistency(table, &numeric));
        report.push("significant_figures", &self.significant_figures(table, &numeric));
        report.push("measurement_precision", &self.measurement_precision(table, &numeric));
        report.push_result(
            "calculation_accuracy",
            &self.calculation_accuracy(table, &ctx.settings.calculation_columns),
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

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn get<T: Clone>(results: &PerColumn<T>, column: &str) -> T {
        results.get(column).unwrap().as_ref().unwrap().clone()
    }

    #[test]
    fn test_decimal_places() {
        assert_eq!(decimal_places(2.0), 0);
        assert_eq!(decimal_places(1.5), 1);
        assert_eq!(decimal_places(-3.125), 3);
        assert_eq!(decimal_places(0.1 + 0.2), 17);
    }

    #[test]
    fn test_significant_figures_helper() {
        assert_eq!(significant_figures(5.0), 1);
        assert_eq!(significant_figures(0.0), 0);
        assert_eq!(significant_figures(12.5), 3);
        assert_eq!(significant_figures(-0.0034), 2);
    }

    #[test]
    fn test_decimal_precision() {
        let table = make_table(
            &["few", "many", "empty"],
            vec![
                vec!["1", "1", ""],
                vec!["1.5", "1.5", ""],
                vec!["2.25", "2.25", ""],
                vec!["3", "3.125", ""],
                vec!["4.5", "4.0625", ""],
            ],
        );
        let results = PrecisionQuality.decimal_precision(&table, &cols(&["few", "many", "empty"]));

        let few = get(&results, "few");
        assert_eq!(few.unique_decimal_counts, vec![0, 1, 2]);
        assert_eq!(few.status, Status::Ok);

        let many = get(&results, "many");
        assert_eq!(many.unique_decimal_counts, vec![0, 1, 2, 3, 4]);
        assert_eq!(many.status, Status::Issue);

        assert_eq!(get(&results, "empty").status, Status::NoData);
    }

    #[test]
    fn test_rounding_consistency() {
        let table = make_table(
            &["a"],
            vec![vec!["1"], vec!["2.5"], vec!["3.0"], vec!["4.3"]],
        );
        let result = get(&PrecisionQuality.rounding_consistency(&table, &cols(&["a"])), "a");
        assert_eq!(result.match_pct, 75.0);
        assert_eq!(result.status, Status::Issue);
    }

    #[test]
    fn test_measurement_precision_prefers_smaller_on_tie() {
        let table = make_table(&["a"], vec![vec!["1.5"], vec!["2"], vec!["3.5"], vec!["4"]]);
        let result = get(&PrecisionQuality.measurement_precision(&table, &cols(&["a"])), "a");
        assert_eq!(result.most_common_decimals, Some(0));
        assert_eq!(result.precision_pct, 50.0);
        assert_eq!(result.status, Status::Issue);

        let empty = make_table(&["a"], vec![vec![""]]);
        let result = get(&PrecisionQuality.measurement_precision(&empty, &cols(&["a"])), "a");
        assert_eq!(result.most_common_decimals, None);
        assert_eq!(result.status, Status::NoData);
    }

    #[test]
    fn test_calculation_accuracy() {
        let table = make_table(
            &["a", "b", "c"],
            vec![
                vec!["1", "10", "11"],
                vec!["2", "20", "22"],
                vec!["3", "30", "33"],
                vec!["4", "40", "44"],
            ],
        );
        let result = PrecisionQuality
            .calculation_accuracy(&table, &cols(&["a", "b", "c"]))
            .unwrap();
        assert_eq!(result.accuracy_pct, 100.0);
        assert_eq!(result.status, Status::Ok);
    }

    #[test]
    fn test_calculation_accuracy_skips_incomplete_rows() {
        let table = make_table(
            &["a", "b", "c"],
            vec![
                vec!["0.1", "0.2", "0.3"],
                vec!["1", "", "1"],
                vec!["1", "1", "5"],
            ],
        );
        let result = PrecisionQuality
            .calculation_accuracy(&table, &cols(&["a", "b", "c"]))
            .unwrap();
        assert_eq!(result.accuracy_pct, 50.0);
        assert_eq!(result.status, Status::Issue);
    }

    #[test]
    fn test_calculation_accuracy_configuration_errors() {
        let table = make_table(&["a", "b"], vec![vec!["1", "2"]]);

        let err = PrecisionQuality
            .calculation_accuracy(&table, &cols(&["a", "b"]))
            .unwrap_err();
        assert!(matches!(err, MetricError::Configuration(_)));

        let err = PrecisionQuality
            .calculation_accuracy(&table, &cols(&["a", "b", "c"]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing columns: [\"c\"]");
    }

    #[test]
    fn test_evaluate_reports_configuration_error() {
        let table = make_table(&["a"], vec![vec!["1.5"]]);
        let settings = crate::settings::Settings::default();
        let ctx = ScoringContext::new(&settings, chrono::Utc::now());
        let report = PrecisionQuality.evaluate(&table, &ctx);

        let calc = report.get("calculation_accuracy").unwrap();
        assert_eq!(calc["status"], "Error");
        assert_eq!(report.get("decimal_precision").unwrap()["a"]["unique_decimal_counts"][0], 1);
    }
}
