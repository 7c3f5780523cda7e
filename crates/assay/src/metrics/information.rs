//! Information quality: entropy, density, sparsity, redundancy and compressibility.
//!
//! Every column is scored; values are treated as opaque categories via their
//! text rendering.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::{percent, round2, round3, PerColumn, Status};
use crate::engine::{GroupKind, MetricGroup, Report, ScoringContext};
use crate::table::{Column, Table, Value};

const MIN_ENTROPY: f64 = 0.1;
const MIN_DENSITY_PCT: f64 = 80.0;
const MIN_REDUNDANCY_PCT: f64 = 90.0;
const MIN_COMPRESSION_PCT: f64 = 85.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entropy {
    pub entropy_score: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Density {
    #[serde(rename = "information_density_%")]
    pub density_pct: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sparsity {
    #[serde(rename = "sparsity_%")]
    pub sparsity_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Redundancy {
    #[serde(rename = "redundancy_%")]
    pub redundancy_pct: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Compression {
    #[serde(rename = "compression_ratio_%")]
    pub compression_pct: f64,
    pub status: Status,
}

/// Information-theoretic metrics over every column.
#[derive(Debug, Clone, Copy, Default)]
pub struct InformationQuality;

fn per_column<T>(table: &Table, f: impl Fn(&Column) -> T) -> PerColumn<T> {
    let mut results = PerColumn::new();
    for column in table.columns() {
        results.ok(column.name(), f(column));
    }
    results
}

fn density(column: &Column) -> f64 {
    percent(column.len() - column.missing_count(), column.len())
}

impl InformationQuality {
    /// Shannon entropy of the value distribution, normalized by `log2(distinct)`.
    pub fn entropy_score(&self, table: &Table) -> PerColumn<Entropy> {
        per_column(table, |column| {
            let rendered = column.rendered();
            if rendered.is_empty() {
                return Entropy {
                    entropy_score: 0.0,
                    status: Status::LowEntropy,
                };
            }

            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for value in &rendered {
                *counts.entry(value.as_str()).or_insert(0) += 1;
            }
            let total = rendered.len() as f64;
            let entropy: f64 = counts
                .values()
                .map(|c| {
                    let p = *c as f64 / total;
                    -p * p.log2()
                })
                .sum();
            let max_entropy = if counts.len() > 1 {
                (counts.len() as f64).log2()
            } else {
                1.0
            };

            let normalized = round3(entropy / max_entropy).abs();
            Entropy {
                entropy_score: normalized,
                status: if normalized < MIN_ENTROPY {
                    Status::LowEntropy
                } else {
                    Status::Ok
                },
            }
        })
    }

    /// Share of non-missing cells.
    pub fn information_density(&self, table: &Table) -> PerColumn<Density> {
        per_column(table, |column| {
            if column.is_empty() {
                return Density {
                    density_pct: 0.0,
                    status: Status::NoData,
                };
            }
            let density = round2(density(column));
            Density {
                density_pct: density,
                status: Status::issue_if(density < MIN_DENSITY_PCT),
            }
        })
    }

    /// Share of missing cells.
    pub fn sparsity_score(&self, table: &Table) -> PerColumn<Sparsity> {
        per_column(table, |column| Sparsity {
            sparsity_pct: round2(100.0 - density(column)),
        })
    }

    /// `100 - share of rows repeating an earlier value` (missing repeats missing).
    pub fn redundancy_score(&self, table: &Table) -> PerColumn<Redundancy> {
        per_column(table, |column| {
            if column.is_empty() {
                return Redundancy {
                    redundancy_pct: 0.0,
                    status: Status::NoData,
                };
            }
            let mut seen: HashSet<&Value> = HashSet::new();
            let duplicates = column.values().iter().filter(|v| !seen.insert(*v)).count();
            let redundancy = round2(100.0 - percent(duplicates, column.len()));
            Redundancy {
                redundancy_pct: redundancy,
                status: Status::issue_if(redundancy < MIN_REDUNDANCY_PCT),
            }
        })
    }

    /// `100 * (1 - distinct / present)` over rendered values.
    pub fn compression_ratio(&self, table: &Table) -> PerColumn<Compression> {
        per_column(table, |column| {
            let rendered = column.rendered();
            if rendered.is_empty() {
                return Compression {
                    compression_pct: 0.0,
                    status: Status::NoData,
                };
            }
            let distinct: HashSet<&String> = rendered.iter().collect();
            let compression = round2((1.0 - distinct.len() as f64 / rendered.len() as f64) * 100.0);
            Compression {
                compression_pct: compression,
                status: Status::issue_if(compression < MIN_COMPRESSION_PCT),
            }
        })
    }
}

impl MetricGroup for InformationQuality {
    fn kind(&self) -> GroupKind {
        GroupKind::Information
    }

    fn evaluate(&self, table: &Table, _ctx: &ScoringContext<'_>) -> Report {
        let mut report = Report::new(self.kind());
        report.push("entropy_score", &self.entropy_score(table));
        report.push("information_density", &self.information_density(table));
        report.push("sparsity_score", &self.sparsity_score(table));
        report.push("redundancy_score", &self.redundancy_score(table));
        report.push("compression_ratio", &self.compression_ratio(table));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table(headers: &[&str], rows: Vec<Vec<&str>>) -> Table {
        Table::from_rows(headers, &rows).unwrap()
    }

    fn get<T: Clone>(results: &PerColumn<T>, column: &str) -> T {
        results.get(column).unwrap().as_ref().unwrap().clone()
    }

    #[test]
    fn test_entropy_score() {
        let table = make_table(
            &["same", "even", "empty"],
            vec![vec!["x", "a", ""], vec!["x", "b", ""], vec!["x", "a", ""], vec!["x", "b", ""]],
        );
        let results = InformationQuality.entropy_score(&table);

        let same = get(&results, "same");
        assert_eq!(same.entropy_score, 0.0);
        assert_eq!(same.status, Status::LowEntropy);

        let even = get(&results, "even");
        assert_eq!(even.entropy_score, 1.0);
        assert_eq!(even.status, Status::Ok);

        let empty = get(&results, "empty");
        assert_eq!(empty.entropy_score, 0.0);
        assert_eq!(empty.status, Status::LowEntropy);
    }

    #[test]
    fn test_density_and_sparsity() {
        let table = make_table(
            &["a"],
            vec![vec!["1"], vec![""], vec!["3"], vec!["4"], vec!["5"]],
        );
        let density = get(&InformationQuality.information_density(&table), "a");
        assert_eq!(density.density_pct, 80.0);
        assert_eq!(density.status, Status::Ok);

        let sparsity = get(&InformationQuality.sparsity_score(&table), "a");
        assert_eq!(sparsity.sparsity_pct, 20.0);
        let json = serde_json::to_value(&sparsity).unwrap();
        assert_eq!(json, serde_json::json!({"sparsity_%": 20.0}));
    }

    #[test]
    fn test_redundancy_counts_missing_repeats() {
        let table = make_table(&["a"], vec![vec!["1"], vec![""], vec!["1"], vec!["NA"]]);
        let result = get(&InformationQuality.redundancy_score(&table), "a");
        assert_eq!(result.redundancy_pct, 50.0);
        assert_eq!(result.status, Status::Issue);

        let empty = make_table(&["a"], vec![]);
        let result = get(&InformationQuality.redundancy_score(&empty), "a");
        assert_eq!(result.status, Status::NoData);
    }

    #[test]
    fn test_compression_ratio() {
        let mut rows = vec![vec!["on"]; 19];
        rows.push(vec!["off"]);
        let table = make_table(&["state"], rows);
        let result = get(&InformationQuality.compression_ratio(&table), "state");
        assert_eq!(result.compression_pct, 90.0);
        assert_eq!(result.status, Status::Ok);

        let unique = make_table(&["id"], vec![vec!["1"], vec!["2"]]);
        let result = get(&InformationQuality.compression_ratio(&unique), "id");
        assert_eq!(result.compression_pct, 0.0);
        assert_eq!(result.status, Status::Issue);
    }
}
