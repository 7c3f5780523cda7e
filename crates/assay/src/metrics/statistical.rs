//! Statistical quality: distribution shape, dispersion and anomalies per numeric column.

use indexmap::IndexMap;
use serde::Serialize;

use super::core::OutlierShare;
use super::{per_numeric_column, percent, round2, round3, round_to, stats, PerColumn, Status};
use crate::engine::{GroupKind, MetricGroup, Report, ScoringContext};
use crate::table::Table;

const NORMALITY_MIN_SAMPLES: usize = 3;
const NORMALITY_MAX_SAMPLES: usize = 5000;
const NORMALITY_ALPHA: f64 = 0.01;
const IQR_FENCE: f64 = 1.5;
const MAX_TUKEY_OUTLIER_PCT: f64 = 5.0;
const VARIANCE_CHUNKS: usize = 5;
const MAX_VARIANCE_CV: f64 = 0.5;
const MAX_ABS_SKEW: f64 = 2.0;
const MAX_ABS_KURTOSIS: f64 = 7.0;
const MAX_CV: f64 = 2.0;
const SPIKE_FACTOR: f64 = 5.0;
const DROP_FACTOR: f64 = 0.2;
const MIN_CONFORMITY_PCT: f64 = 90.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Normality {
    pub p_value: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceStability {
    pub cv_variance: Option<f64>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skewness {
    pub skew: Option<f64>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kurtosis {
    pub kurtosis: Option<f64>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variation {
    pub cv: Option<f64>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomalies {
    pub spikes: usize,
    pub drops: usize,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeConformity {
    #[serde(rename = "conformity_%")]
    pub conformity_pct: Option<f64>,
    pub status: Status,
}

/// Distribution and dispersion metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticalQuality;

impl StatisticalQuality {
    /// Shapiro-Wilk test on the first 5000 present values; columns with 3 or fewer are omitted.
    pub fn distribution_normality(&self, table: &Table, columns: &[String]) -> PerColumn<Normality> {
        per_numeric_column(table, columns, |_, values| {
            if values.len() <= NORMALITY_MIN_SAMPLES {
                return None;
            }
            let sample = &values[..values.len().min(NORMALITY_MAX_SAMPLES)];
            let test = stats::shapiro_wilk(sample)?;
            Some(Normality {
                p_value: round_to(test.p_value, 5),
                status: if test.p_value < NORMALITY_ALPHA {
                    Status::NonNormal
                } else {
                    Status::Normal
                },
            })
        })
    }

    /// Share of rows outside the Tukey fences.
    pub fn outlier_score(&self, table: &Table, columns: &[String]) -> PerColumn<OutlierShare> {
        per_numeric_column(table, columns, |column, values| {
            if values.is_empty() {
                return Some(OutlierShare {
                    outlier_pct: None,
                    status: Status::NoData,
                });
            }
            let sorted = stats::sorted(&values);
            let q1 = stats::quantile_sorted(&sorted, 0.25);
            let q3 = stats::quantile_sorted(&sorted, 0.75);
            let iqr = q3 - q1;
            let (lower, upper) = (q1 - IQR_FENCE * iqr, q3 + IQR_FENCE * iqr);

            let outliers = values.iter().filter(|v| **v < lower || **v > upper).count();
            let share = percent(outliers, column.len());
            Some(OutlierShare {
                outlier_pct: Some(round2(share)),
                status: Status::issue_if(share > MAX_TUKEY_OUTLIER_PCT),
            })
        })
    }

    /// Dispersion of variances across five contiguous chunks.
    pub fn variance_stability(&self, table: &Table, columns: &[String]) -> PerColumn<VarianceStability> {
        per_numeric_column(table, columns, |_, values| {
            let variances: Vec<f64> = stats::split_even(&values, VARIANCE_CHUNKS)
                .into_iter()
                .filter(|chunk| chunk.len() > 1)
                .map(|chunk| stats::variance(chunk, 1))
                .collect();
            if variances.len() < 2 {
                return None;
            }

            let mean = stats::mean(&variances);
            if mean == 0.0 {
                return Some(VarianceStability {
                    cv_variance: None,
                    status: Status::NotApplicable,
                });
            }
            let cv = stats::std_dev(&variances, 0) / mean;
            Some(VarianceStability {
                cv_variance: Some(round3(cv)),
                status: if cv > MAX_VARIANCE_CV {
                    Status::Unstable
                } else {
                    Status::Stable
                },
            })
        })
    }

    pub fn skewness_quality(&self, table: &Table, columns: &[String]) -> PerColumn<Skewness> {
        per_numeric_column(table, columns, |_, values| {
            if is_degenerate(&values) {
                return Some(Skewness {
                    skew: None,
                    status: Status::Constant,
                });
            }
            let skew = stats::skewness(&values);
            Some(Skewness {
                skew: Some(round3(skew)),
                status: if skew.abs() > MAX_ABS_SKEW {
                    Status::HighSkew
                } else {
                    Status::Ok
                },
            })
        })
    }

    pub fn kurtosis_quality(&self, table: &Table, columns: &[String]) -> PerColumn<Kurtosis> {
        per_numeric_column(table, columns, |_, values| {
            if is_degenerate(&values) {
                return Some(Kurtosis {
                    kurtosis: None,
                    status: Status::Constant,
                });
            }
            let kurtosis = stats::kurtosis(&values);
            Some(Kurtosis {
                kurtosis: Some(round3(kurtosis)),
                status: if kurtosis.abs() > MAX_ABS_KURTOSIS {
                    Status::HighKurtosis
                } else {
                    Status::Ok
                },
            })
        })
    }

    /// Sample standard deviation over mean.
    pub fn coefficient_variation(&self, table: &Table, columns: &[String]) -> PerColumn<Variation> {
        per_numeric_column(table, columns, |_, values| {
            if values.is_empty() {
                return Some(Variation {
                    cv: None,
                    status: Status::NoData,
                });
            }
            let mean = stats::mean(&values);
            let cv = stats::std_dev(&values, 1) / mean;
            if mean == 0.0 || !cv.is_finite() {
                return Some(Variation {
                    cv: None,
                    status: Status::NotApplicable,
                });
            }
            Some(Variation {
                cv: Some(round3(cv)),
                status: if cv > MAX_CV {
                    Status::HighVariability
                } else {
                    Status::Ok
                },
            })
        })
    }

    /// Values above five times or below a fifth of the median.
    pub fn statistical_anomalies(&self, table: &Table, columns: &[String]) -> PerColumn<Anomalies> {
        per_numeric_column(table, columns, |_, values| {
            if values.is_empty() {
                return Some(Anomalies {
                    spikes: 0,
                    drops: 0,
                    status: Status::NoData,
                });
            }
            let median = stats::median(&values);
            let spikes = values.iter().filter(|v| **v > median * SPIKE_FACTOR).count();
            let drops = values.iter().filter(|v| **v < median * DROP_FACTOR).count();
            Some(Anomalies {
                spikes,
                drops,
                status: if spikes + drops > 0 {
                    Status::AnomaliesFound
                } else {
                    Status::Ok
                },
            })
        })
    }

    /// Share of present values inside the configured range, per present column.
    pub fn range_conformity(
        &self,
        table: &Table,
        value_ranges: &IndexMap<String, (f64, f64)>,
    ) -> PerColumn<RangeConformity> {
        let mut results = PerColumn::new();
        for (name, (min, max)) in value_ranges {
            let Some(column) = table.column(name) else {
                continue;
            };
            let result = column.numeric_values().map(|values| {
                if values.is_empty() {
                    return RangeConformity {
                        conformity_pct: None,
                        status: Status::NoDataColumn,
                    };
                }
                let inside = values.iter().filter(|v| **v >= *min && **v <= *max).count();
                let conformity = percent(inside, values.len());
                RangeConformity {
                    conformity_pct: Some(round2(conformity)),
                    status: Status::issue_if(conformity < MIN_CONFORMITY_PCT),
                }
            });
            results.insert(name.clone(), result);
        }
        results
    }
}

/// Fewer than two values, or a single distinct numeric value.
fn is_degenerate(values: &[f64]) -> bool {
    match values.split_first() {
        Some((first, rest)) => rest.is_empty() || rest.iter().all(|v| v == first),
        None => true,
    }
}

impl MetricGroup for StatisticalQuality {
    fn kind(&self) -> GroupKind {
        GroupKind::Statistical
    }

    fn evaluate(&self, table: &Table, ctx: &ScoringContext<'_>) -> Report {
        let numeric = table.numeric_columns();

        let mut report = Report::new(self.kind());
        report.push("distribution_normality", &self.distribution_normality(table, &numeric));
        report.push("outlier_score", &self.outlier_score(table, &numeric));
        report.push("variance_stability", &self.variance_stability(table, &numeric));
        report.push("skewness_quality", &self.skewness_quality(table, &numeric));
        report.push("kurtosis_quality", &self.kurtosis_quality(table, &numeric));
        report.push("coefficient_variation", &self.coefficient_variation(table, &numeric));
        report.push("statistical_anomalies", &self.statistical_anomalies(table, &numeric));
        report.push(
            "range_conformity",
            &self.range_conformity(table, &ctx.settings.value_ranges),
        );
        report
    }
}
