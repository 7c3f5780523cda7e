//! Temporal quality of configured datetime columns.
//!
//! Values are coerced leniently: anything that does not parse as a
//! timestamp is treated as missing. Naive timestamps are taken as UTC for
//! ordering and gaps, while hour-of-day metrics use the wall-clock hour as
//! written.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use super::{percent, round2, stats, PerColumn, Status};
use crate::engine::{GroupKind, MetricGroup, Report, ScoringContext};
use crate::error::MetricError;
use crate::table::{Column, Table, Timestamp};

const MIN_ACCURACY_PCT: f64 = 90.0;
const OVERSIZED_GAP_FACTOR: f64 = 2.0;
const MIN_CONTINUITY_PCT: f64 = 88.0;
/// Fixed score when more than one UTC offset is observed.
const MIXED_TIMEZONE_PCT: f64 = 70.0;
const MIN_GRANULARITY_PCT: f64 = 85.0;
const MIN_FRESHNESS_PCT: f64 = 85.0;
const MIN_PATTERN_PCT: f64 = 75.0;
const MIN_SEASONALITY_SAMPLES: usize = 10;
const MIN_SEASONALITY_PCT: f64 = 70.0;
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimestampAccuracy {
    #[serde(rename = "accuracy_%")]
    pub accuracy_pct: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Continuity {
    #[serde(rename = "continuity_%")]
    pub continuity_pct: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimezoneConsistency {
    #[serde(rename = "timezone_consistency_%")]
    pub consistency_pct: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Granularity {
    #[serde(rename = "granularity_%")]
    pub granularity_pct: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Freshness {
    #[serde(rename = "freshness_%")]
    pub freshness_pct: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pattern {
    #[serde(rename = "pattern_score_%")]
    pub pattern_pct: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Seasonality {
    #[serde(rename = "seasonality_%")]
    pub seasonality_pct: f64,
    pub status: Status,
}

/// Metrics over configured datetime columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalQuality;

/// Apply `f` to the parseable timestamps of each named column.
fn per_temporal_column<T>(
    table: &Table,
    columns: &[String],
    mut f: impl FnMut(&Column, Vec<Timestamp>) -> T,
) -> PerColumn<T> {
    let mut results = PerColumn::new();
    for name in columns {
        let result: Result<T, MetricError> = table.require(name).map(|column| {
            let parsed: Vec<Timestamp> = column.timestamps().into_iter().flatten().collect();
            f(column, parsed)
        });
        results.insert(name.clone(), result);
    }
    results
}

/// Ascending UTC instants.
fn sorted_instants(parsed: &[Timestamp]) -> Vec<NaiveDateTime> {
    let mut instants: Vec<NaiveDateTime> = parsed.iter().map(Timestamp::instant).collect();
    instants.sort();
    instants
}

/// Successive gaps in seconds between ascending instants.
fn gaps_in_seconds(instants: &[NaiveDateTime]) -> Vec<f64> {
    instants
        .windows(2)
        .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 1000.0)
        .collect()
}

/// Observation counts per wall-clock hour, for hours that occur.
fn hour_counts(parsed: &[Timestamp]) -> Vec<f64> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for ts in parsed {
        *counts.entry(ts.hour()).or_insert(0) += 1;
    }
    counts.into_values().map(|c| c as f64).collect()
}

/// Sample standard deviation, taken as 0 for a single group.
fn group_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        0.0
    } else {
        stats::std_dev(values, 1)
    }
}

impl TemporalQuality {
    /// Share of rows that parse as timestamps.
    pub fn timestamp_accuracy(&self, table: &Table, columns: &[String]) -> PerColumn<TimestampAccuracy> {
        per_temporal_column(table, columns, |column, parsed| {
            let accuracy = round2(percent(parsed.len(), column.len()));
            TimestampAccuracy {
                accuracy_pct: accuracy,
                status: Status::issue_if(accuracy < MIN_ACCURACY_PCT),
            }
        })
    }

    /// Share of gaps no larger than twice the median gap.
    pub fn temporal_continuity(&self, table: &Table, columns: &[String]) -> PerColumn<Continuity> {
        per_temporal_column(table, columns, |_, parsed| {
            if parsed.len() < 2 {
                return Continuity {
                    continuity_pct: 0.0,
                    status: Status::Issue,
                };
            }
            let gaps = gaps_in_seconds(&sorted_instants(&parsed));
            let median = stats::median(&gaps);
            let oversized_ratio = if median > 0.0 {
                let oversized = gaps.iter().filter(|g| **g > median * OVERSIZED_GAP_FACTOR).count();
                oversized as f64 / gaps.len() as f64
            } else {
                0.0
            };
            let continuity = round2((1.0 - oversized_ratio) * 100.0);
            Continuity {
                continuity_pct: continuity,
                status: Status::issue_if(continuity < MIN_CONTINUITY_PCT),
            }
        })
    }

    /// 100 when at most one UTC offset is observed, a fixed 70 otherwise.
    pub fn time_zone_consistency(&self, table: &Table, columns: &[String]) -> PerColumn<TimezoneConsistency> {
        per_temporal_column(table, columns, |_, parsed| {
            let offsets: HashSet<i32> = parsed
                .iter()
                .filter_map(|ts| ts.offset())
                .map(|o| o.local_minus_utc())
                .collect();
            if offsets.len() > 1 {
                TimezoneConsistency {
                    consistency_pct: MIXED_TIMEZONE_PCT,
                    status: Status::Issue,
                }
            } else {
                TimezoneConsistency {
                    consistency_pct: 100.0,
                    status: Status::Ok,
                }
            }
        })
    }

    /// Regularity of intervals: `1 - std / mean` of the gaps.
    pub fn temporal_granularity(&self, table: &Table, columns: &[String]) -> PerColumn<Granularity> {
        per_temporal_column(table, columns, |_, parsed| {
            let gaps = gaps_in_seconds(&sorted_instants(&parsed));
            let granularity = if gaps.is_empty() {
                0.0
            } else {
                let mean = stats::mean(&gaps);
                let ratio = if mean > 0.0 {
                    stats::std_dev(&gaps, 1) / mean
                } else {
                    f64::INFINITY
                };
                // A single gap has no spread estimate and scores 0
                if ratio.is_nan() {
                    0.0
                } else {
                    round2(((1.0 - ratio) * 100.0).max(0.0))
                }
            };
            Granularity {
                granularity_pct: granularity,
                status: Status::issue_if(granularity < MIN_GRANULARITY_PCT),
            }
        })
    }

    /// `100 - whole days` since the latest timestamp, clamped to [0, 100].
    pub fn freshness_score(
        &self,
        table: &Table,
        columns: &[String],
        now: DateTime<Utc>,
    ) -> PerColumn<Freshness> {
        let now = now.naive_utc();
        per_temporal_column(table, columns, |_, parsed| {
            let score = match parsed.iter().map(Timestamp::instant).max() {
                Some(latest) => {
                    let days = (now - latest).num_seconds().div_euclid(SECONDS_PER_DAY);
                    (100.0 - days as f64).clamp(0.0, 100.0)
                }
                None => 0.0,
            };
            Freshness {
                freshness_pct: round2(score),
                status: Status::issue_if(score < MIN_FRESHNESS_PCT),
            }
        })
    }

    /// `1 - std` of the normalized hour-of-day frequencies.
    pub fn temporal_pattern(&self, table: &Table, columns: &[String]) -> PerColumn<Pattern> {
        per_temporal_column(table, columns, |_, parsed| {
            if parsed.is_empty() {
                return Pattern {
                    pattern_pct: 0.0,
                    status: Status::Issue,
                };
            }
            let total = parsed.len() as f64;
            let frequencies: Vec<f64> = hour_counts(&parsed).into_iter().map(|c| c / total).collect();
            let score = round2((1.0 - group_std(&frequencies)) * 100.0);
            Pattern {
                pattern_pct: score,
                status: Status::issue_if(score < MIN_PATTERN_PCT),
            }
        })
    }

    /// Evenness of hour-of-day group sizes; needs at least 10 timestamps.
    pub fn seasonality_detection(&self, table: &Table, columns: &[String]) -> PerColumn<Seasonality> {
        per_temporal_column(table, columns, |_, parsed| {
            if parsed.len() < MIN_SEASONALITY_SAMPLES {
                return Seasonality {
                    seasonality_pct: 0.0,
                    status: Status::Issue,
                };
            }
            let counts = hour_counts(&parsed);
            let mean = stats::mean(&counts);
            let strength = if mean > 0.0 {
                round2((1.0 - group_std(&counts) / mean) * 100.0)
            } else {
                0.0
            };
            Seasonality {
                seasonality_pct: strength,
                status: Status::issue_if(strength < MIN_SEASONALITY_PCT),
            }
        })
    }
}

impl MetricGroup for TemporalQuality {
    fn kind(&self) -> GroupKind {
        GroupKind::Temporal
    }

    fn evaluate(&self, table: &Table, ctx: &ScoringContext<'_>) -> Report {
        let columns = ctx.datetime_columns(table);

        let mut report = Report::new(self.kind());
        report.push("timestamp_accuracy", &self.timestamp_accuracy(table, &columns));
        report.push("temporal_continuity", &self.temporal_continuity(table, &columns));
        report.push("time_zone_consistency", &self.time_zone_consistency(table, &columns));
        report.push("temporal_granularity", &self.temporal_granularity(table, &columns));
        report.push("freshness_score", &self.freshness_score(table, &columns, ctx.now));
        report.push("temporal_pattern", &self.temporal_pattern(table, &columns));
        report.push("seasonality_detection", &self.seasonality_detection(table, &columns));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn column_table(values: &[&str]) -> Table {
        Table::from_rows(&["ts"], &values.iter().map(|v| vec![*v]).collect::<Vec<_>>()).unwrap()
    }

    fn ts() -> Vec<String> {
        vec!["ts".to_string()]
    }

    fn hourly(n: u32) -> Vec<String> {
        (0..n)
            .map(|h| format!("2024-01-{:02} {:02}:00:00", 1 + h / 24, h % 24))
            .collect()
    }

    #[test]
    fn test_timestamp_accuracy() {
        let table = column_table(&["2024-01-01", "not-a-date", "2024-01-03"]);
        let results = TemporalQuality.timestamp_accuracy(&table, &ts());
        let result = results.get("ts").unwrap().as_ref().unwrap();
        assert_eq!(result.accuracy_pct, 66.67);
        assert_eq!(result.status, Status::Issue);

        let missing = TemporalQuality.timestamp_accuracy(&table, &["nope".to_string()]);
        assert!(missing.get("nope").unwrap().is_err());
    }

    #[test]
    fn test_temporal_continuity() {
        let table = column_table(&[
            "2024-01-01 00:00",
            "2024-01-01 01:00",
            "2024-01-01 02:00",
            "2024-01-01 03:00",
            "2024-01-01 10:00",
        ]);
        let results = TemporalQuality.temporal_continuity(&table, &ts());
        let result = results.get("ts").unwrap().as_ref().unwrap();
        assert_eq!(result.continuity_pct, 75.0);
        assert_eq!(result.status, Status::Issue);

        let single = column_table(&["2024-01-01"]);
        let results = TemporalQuality.temporal_continuity(&single, &ts());
        assert_eq!(results.get("ts").unwrap().as_ref().unwrap().continuity_pct, 0.0);
    }

    #[test]
    fn test_time_zone_consistency() {
        let naive = column_table(&["2024-01-01 00:00", "2024-01-01 01:00"]);
        let results = TemporalQuality.time_zone_consistency(&naive, &ts());
        assert_eq!(results.get("ts").unwrap().as_ref().unwrap().consistency_pct, 100.0);

        let mixed = column_table(&["2024-01-01T00:00:00+00:00", "2024-01-01T01:00:00+02:00"]);
        let results = TemporalQuality.time_zone_consistency(&mixed, &ts());
        let result = results.get("ts").unwrap().as_ref().unwrap();
        assert_eq!(result.consistency_pct, 70.0);
        assert_eq!(result.status, Status::Issue);
    }

    #[test]
    fn test_temporal_granularity() {
        let regular = hourly(6);
        let refs: Vec<&str> = regular.iter().map(String::as_str).collect();
        let results = TemporalQuality.temporal_granularity(&column_table(&refs), &ts());
        let result = results.get("ts").unwrap().as_ref().unwrap();
        assert_eq!(result.granularity_pct, 100.0);
        assert_eq!(result.status, Status::Ok);

        let two = column_table(&["2024-01-01", "2024-01-02"]);
        let results = TemporalQuality.temporal_granularity(&two, &ts());
        assert_eq!(results.get("ts").unwrap().as_ref().unwrap().granularity_pct, 0.0);

        let none = column_table(&["2024-01-01"]);
        let results = TemporalQuality.temporal_granularity(&none, &ts());
        assert_eq!(results.get("ts").unwrap().as_ref().unwrap().granularity_pct, 0.0);
    }

    #[test]
    fn test_freshness_score() {
        let table = column_table(&["2024-01-01 12:00", "2024-01-05 12:00"]);
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap();
        let results = TemporalQuality.freshness_score(&table, &ts(), now);
        let result = results.get("ts").unwrap().as_ref().unwrap();
        assert_eq!(result.freshness_pct, 91.0);
        assert_eq!(result.status, Status::Ok);

        let stale = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let results = TemporalQuality.freshness_score(&table, &ts(), stale);
        assert_eq!(results.get("ts").unwrap().as_ref().unwrap().freshness_pct, 0.0);

        let future = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let results = TemporalQuality.freshness_score(&table, &ts(), future);
        assert_eq!(results.get("ts").unwrap().as_ref().unwrap().freshness_pct, 100.0);

        let empty = column_table(&["garbage"]);
        let results = TemporalQuality.freshness_score(&empty, &ts(), now);
        assert_eq!(results.get("ts").unwrap().as_ref().unwrap().freshness_pct, 0.0);
    }

    #[test]
    fn test_temporal_pattern() {
        let single_hour = column_table(&["2024-01-01 08:00", "2024-01-02 08:00"]);
        let results = TemporalQuality.temporal_pattern(&single_hour, &ts());
        assert_eq!(results.get("ts").unwrap().as_ref().unwrap().pattern_pct, 100.0);

        let skewed = column_table(&["2024-01-01 08:00", "2024-01-02 08:00", "2024-01-02 08:30", "2024-01-03 09:00"]);
        let results = TemporalQuality.temporal_pattern(&skewed, &ts());
        // frequencies 0.75 and 0.25, sample std 0.3536
        assert_eq!(results.get("ts").unwrap().as_ref().unwrap().pattern_pct, 64.64);

        let empty = column_table(&[""]);
        let results = TemporalQuality.temporal_pattern(&empty, &ts());
        assert_eq!(results.get("ts").unwrap().as_ref().unwrap().status, Status::Issue);
    }

    #[test]
    fn test_seasonality_detection() {
        let even = hourly(48);
        let refs: Vec<&str> = even.iter().map(String::as_str).collect();
        let results = TemporalQuality.seasonality_detection(&column_table(&refs), &ts());
        let result = results.get("ts").unwrap().as_ref().unwrap();
        assert_eq!(result.seasonality_pct, 100.0);
        assert_eq!(result.status, Status::Ok);

        let few = column_table(&["2024-01-01", "2024-01-02"]);
        let results = TemporalQuality.seasonality_detection(&few, &ts());
        assert_eq!(results.get("ts").unwrap().as_ref().unwrap().seasonality_pct, 0.0);
    }
}
