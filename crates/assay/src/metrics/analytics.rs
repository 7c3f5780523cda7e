//! Cross-column analytics over numeric columns: correlation, trend,
//! volatility, rate of change, pooled anomalies and predictability.
//!
//! Table-level metrics carry `score: null` with status `No data` when no
//! column qualifies.

use serde::Serialize;

use super::{round2, round3, stats, PerColumn, Status};
use crate::engine::{GroupKind, MetricGroup, Report, ScoringContext};
use crate::error::MetricError;
use crate::table::Table;

const STRONG_CORRELATION: f64 = 0.7;
const MIN_TREND_SLOPE: f64 = 0.01;
const ANOMALY_Z: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub score: Option<f64>,
    pub strong_pairs: usize,
    pub total_pairs: usize,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub score: Option<f64>,
    pub trending_columns: usize,
    pub evaluated_columns: usize,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Volatility {
    pub score: Option<f64>,
    pub mean_cv: Option<f64>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateOfChange {
    #[serde(rename = "change_%")]
    pub change_pct: Option<f64>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyScore {
    pub score: Option<f64>,
    pub anomalies: usize,
    pub valid_values: usize,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predictability {
    pub score: Option<f64>,
    pub evaluated_columns: usize,
    pub status: Status,
}

/// Table-level analytics across numeric columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvancedAnalytics;

fn status_for(score: Option<f64>) -> Status {
    if score.is_some() { Status::Ok } else { Status::NoData }
}

/// Row-aligned numeric views of the named columns.
fn numeric_series(table: &Table, columns: &[String]) -> Result<Vec<Vec<Option<f64>>>, MetricError> {
    columns
        .iter()
        .map(|name| table.require(name)?.numeric())
        .collect()
}

fn present(series: &[Option<f64>]) -> Vec<f64> {
    series.iter().flatten().copied().collect()
}

impl AdvancedAnalytics {
    /// Share of column pairs with `|r| > 0.7`, over pairwise-complete rows.
    pub fn correlation_quality(&self, table: &Table, columns: &[String]) -> Result<Correlation, MetricError> {
        let series = numeric_series(table, columns)?;
        let n = series.len();
        if n < 2 {
            return Ok(Correlation {
                score: None,
                strong_pairs: 0,
                total_pairs: 0,
                status: Status::NoData,
            });
        }

        let mut strong_pairs = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                let (x, y): (Vec<f64>, Vec<f64>) = series[i]
                    .iter()
                    .zip(&series[j])
                    .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                    .unzip();
                let r = stats::pearson(&x, &y).abs();
                if r > STRONG_CORRELATION {
                    strong_pairs += 1;
                }
            }
        }
        let total_pairs = n * (n - 1) / 2;
        let score = Some(round2(strong_pairs as f64 / total_pairs as f64 * 100.0));
        Ok(Correlation {
            score,
            strong_pairs,
            total_pairs,
            status: status_for(score),
        })
    }

    /// Share of columns whose least-squares slope against the row index exceeds 0.01 in magnitude.
    ///
    /// Gaps are forward-filled; leading missing rows are dropped.
    pub fn trend_consistency(&self, table: &Table, columns: &[String]) -> Result<Trend, MetricError> {
        let series = numeric_series(table, columns)?;

        let mut slopes = Vec::new();
        for column in &series {
            let mut x = Vec::with_capacity(column.len());
            let mut y = Vec::with_capacity(column.len());
            let mut last = None;
            for (index, value) in column.iter().enumerate() {
                if value.is_some() {
                    last = *value;
                }
                if let Some(filled) = last {
                    x.push(index as f64);
                    y.push(filled);
                }
            }
            if y.len() < 2 {
                continue;
            }
            let slope = stats::slope(&x, &y);
            if slope.is_finite() {
                slopes.push(slope);
            }
        }

        let trending_columns = slopes.iter().filter(|s| s.abs() > MIN_TREND_SLOPE).count();
        let score = (!slopes.is_empty())
            .then(|| round2(trending_columns as f64 / slopes.len() as f64 * 100.0));
        Ok(Trend {
            score,
            trending_columns,
            evaluated_columns: slopes.len(),
            status: status_for(score),
        })
    }

    /// `100 * (1 - mean CV)`; columns with a zero mean or undefined CV are skipped.
    pub fn volatility_score(&self, table: &Table, columns: &[String]) -> Result<Volatility, MetricError> {
        let series = numeric_series(table, columns)?;

        let cvs: Vec<f64> = series
            .iter()
            .filter_map(|column| {
                let values = present(column);
                let mean = stats::mean(&values);
                if mean == 0.0 {
                    return None;
                }
                let cv = stats::std_dev(&values, 1) / mean;
                cv.is_finite().then_some(cv)
            })
            .collect();

        let mean_cv = (!cvs.is_empty()).then(|| stats::mean(&cvs));
        let score = mean_cv.map(|cv| round2((1.0 - cv) * 100.0));
        Ok(Volatility {
            score,
            mean_cv: mean_cv.map(round3),
            status: status_for(score),
        })
    }

    /// Mean percentage change between consecutive present values, per column.
    pub fn rate_of_change(&self, table: &Table, columns: &[String]) -> PerColumn<RateOfChange> {
        let mut results = PerColumn::new();
        for name in columns {
            let values = table.require(name).and_then(|column| column.numeric_values());
            let result = values.map(|values| {
                let changes: Vec<f64> = values
                    .windows(2)
                    .map(|w| (w[1] - w[0]) / w[0])
                    .filter(|c| c.is_finite())
                    .collect();
                let change_pct = (!changes.is_empty()).then(|| round2(stats::mean(&changes) * 100.0));
                RateOfChange {
                    change_pct,
                    status: status_for(change_pct),
                }
            });
            results.insert(name.clone(), result);
        }
        results
    }

    /// Share of numeric cells within three pooled standard deviations of the pooled mean.
    pub fn anomaly_score(&self, table: &Table, columns: &[String]) -> Result<AnomalyScore, MetricError> {
        let series = numeric_series(table, columns)?;
        let pooled: Vec<f64> = series.iter().flat_map(|column| present(column)).collect();

        let anomalies = stats::z_scores(&pooled)
            .map(|z| z.iter().filter(|z| z.abs() > ANOMALY_Z).count())
            .unwrap_or(0);
        let valid_values = pooled.len();
        let score = (valid_values > 0)
            .then(|| round2((1.0 - anomalies as f64 / valid_values as f64) * 100.0));
        Ok(AnomalyScore {
            score,
            anomalies,
            valid_values,
            status: status_for(score),
        })
    }

    /// Mean absolute lag-1 autocorrelation across columns, as a percentage.
    pub fn predictability_score(&self, table: &Table, columns: &[String]) -> Result<Predictability, MetricError> {
        let series = numeric_series(table, columns)?;

        let correlations: Vec<f64> = series
            .iter()
            .map(|column| present(column))
            .filter(|values| values.len() >= 2)
            .map(|values| stats::autocorrelation_lag1(&values).abs())
            .filter(|r| r.is_finite())
            .collect();

        let score = (!correlations.is_empty()).then(|| round2(stats::mean(&correlations) * 100.0));
        Ok(Predictability {
            score,
            evaluated_columns: correlations.len(),
            status: status_for(score),
        })
    }
}

impl MetricGroup for AdvancedAnalytics {
    fn kind(&self) -> GroupKind {
        GroupKind::Analytics
    }

    fn evaluate(&self, table: &Table, _ctx: &ScoringContext<'_>) -> Report {
        let numeric = table.numeric_columns();

        let mut report = Report::new(self.kind());
        report.push_result("correlation_quality", &self.correlation_quality(table, &numeric));
        report.push_result("trend_consistency", &self.trend_consistency(table, &numeric));
        report.push_result("volatility_score", &self.volatility_score(table, &numeric));
        report.push("rate_of_change", &self.rate_of_change(table, &numeric));
        report.push_result("anomaly_score", &self.anomaly_score(table, &numeric));
        report.push_result("predictability_score", &self.predictability_score(table, &numeric));
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

    fn trending_table() -> Table {
        make_table(
            &["up", "down", "noise"],
            vec![
                vec!["1", "40", "5"],
                vec!["2", "30", "1"],
                vec!["3", "20", "4"],
                vec!["4", "10", "2"],
            ],
        )
    }

    #[test]
    fn test_correlation_quality() {
        let table = trending_table();
        let result = AdvancedAnalytics
            .correlation_quality(&table, &cols(&["up", "down", "noise"]))
            .unwrap();
        assert_eq!(result.total_pairs, 3);
        assert_eq!(result.strong_pairs, 1);
        assert_eq!(result.score, Some(33.33));
        assert_eq!(result.status, Status::Ok);

        let single = AdvancedAnalytics.correlation_quality(&table, &cols(&["up"])).unwrap();
        assert_eq!(single.score, None);
        assert_eq!(single.status, Status::NoData);
    }

    #[test]
    fn test_trend_consistency_forward_fills() {
        let table = make_table(
            &["up", "flat"],
            vec![vec!["", "5"], vec!["1", "5"], vec!["", "5"], vec!["3", "5"]],
        );
        let result = AdvancedAnalytics
            .trend_consistency(&table, &cols(&["up", "flat"]))
            .unwrap();
        assert_eq!(result.evaluated_columns, 2);
        assert_eq!(result.trending_columns, 1);
        assert_eq!(result.score, Some(50.0));
    }

    #[test]
    fn test_volatility_score() {
        let table = make_table(
            &["steady", "zero"],
            vec![vec!["10", "-1"], vec!["10", "1"], vec!["10", "0"]],
        );
        let result = AdvancedAnalytics
            .volatility_score(&table, &cols(&["steady", "zero"]))
            .unwrap();
        assert_eq!(result.mean_cv, Some(0.0));
        assert_eq!(result.score, Some(100.0));

        let none = AdvancedAnalytics.volatility_score(&table, &cols(&["zero"])).unwrap();
        assert_eq!(none.score, None);
        assert_eq!(none.status, Status::NoData);
    }

    #[test]
    fn test_rate_of_change() {
        let table = make_table(
            &["grow", "single"],
            vec![vec!["100", "1"], vec!["", ""], vec!["110", ""], vec!["121", ""]],
        );
        let results = AdvancedAnalytics.rate_of_change(&table, &cols(&["grow", "single"]));

        let grow = results.get("grow").unwrap().as_ref().unwrap();
        assert_eq!(grow.change_pct, Some(10.0));
        assert_eq!(grow.status, Status::Ok);

        let single = results.get("single").unwrap().as_ref().unwrap();
        assert_eq!(single.change_pct, None);
        assert_eq!(single.status, Status::NoData);
    }

    #[test]
    fn test_anomaly_score_pools_columns() {
        let mut rows: Vec<Vec<&str>> = vec![vec!["10", "10"]; 10];
        rows.push(vec!["10", "1000"]);
        let table = make_table(&["a", "b"], rows);
        let result = AdvancedAnalytics.anomaly_score(&table, &cols(&["a", "b"])).unwrap();
        assert_eq!(result.valid_values, 22);
        assert_eq!(result.anomalies, 1);
        assert_eq!(result.score, Some(95.45));

        let empty = make_table(&["a"], vec![vec![""]]);
        let result = AdvancedAnalytics.anomaly_score(&empty, &cols(&["a"])).unwrap();
        assert_eq!(result.score, None);
    }

    #[test]
    fn test_predictability_score() {
        let table = trending_table();
        let result = AdvancedAnalytics
            .predictability_score(&table, &cols(&["up", "down"]))
            .unwrap();
        assert_eq!(result.evaluated_columns, 2);
        assert_eq!(result.score, Some(100.0));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let table = trending_table();
        let err = AdvancedAnalytics
            .correlation_quality(&table, &cols(&["up", "ghost"]))
            .unwrap_err();
        assert_eq!(err, MetricError::ColumnNotFound("ghost".into()));
    }
}
