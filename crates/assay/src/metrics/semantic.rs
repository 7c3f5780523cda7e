//! Semantic quality: business rules, referential integrity and domain checks.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::Serialize;

use super::{round2, stats, Status};
use crate::engine::{GroupKind, MetricGroup, Report, ScoringContext};
use crate::error::MetricError;
use crate::settings::DomainRule;
use crate::table::{Column, Table, Value};

const MAX_FREQUENCY_STD: f64 = 0.2;
const POWER_FACTOR_RANGE: (f64, f64) = (-1.0, 1.0);
const RULE_EPSILON: f64 = 1e-6;
const MIN_COMPLIANCE: f64 = 0.95;
const MAX_IDENTIFIER_NULL_RATIO: f64 = 0.05;
const MIN_INTEGRITY: f64 = 0.95;
const MIN_CROSS_FIELD: f64 = 0.9;
const MIN_DOMAIN_VALIDITY: f64 = 0.88;
const MIN_SEMANTIC_SCORE: f64 = 0.92;
const MIN_LINEAGE: f64 = 0.85;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessRules {
    pub rule_violations: usize,
    pub compliance_score: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferentialIntegrity {
    pub inconsistent_columns: Vec<String>,
    pub integrity_score: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossField {
    pub violations: Vec<String>,
    pub cross_field_score: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainValidity {
    pub invalid_columns: Vec<String>,
    pub domain_validity_score: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticConsistency {
    pub semantic_inconsistencies: usize,
    pub semantic_score: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lineage {
    pub tracked_columns: Vec<String>,
    pub lineage_score: f64,
    pub status: Status,
}

/// Rule-driven metrics; every result is table-level.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticQuality;

impl SemanticQuality {
    /// Frequency columns must be steady; power factors must stay within [-1, 1].
    pub fn business_rule_compliance(
        &self,
        table: &Table,
        frequency_columns: &[String],
        powerfactor_columns: &[String],
    ) -> Result<BusinessRules, MetricError> {
        let frequency: Vec<&Column> = frequency_columns.iter().filter_map(|c| table.column(c)).collect();
        let power: Vec<&Column> = powerfactor_columns.iter().filter_map(|c| table.column(c)).collect();

        let mut violations = 0;
        for column in &frequency {
            let std = stats::std_dev(&column.numeric_values()?, 1);
            if std.is_finite() && std > MAX_FREQUENCY_STD {
                violations += 1;
            }
        }
        for column in &power {
            let (min, max) = POWER_FACTOR_RANGE;
            violations += column
                .numeric_values()?
                .iter()
                .filter(|v| **v < min || **v > max)
                .count();
        }

        let rules = (frequency.len() + power.len()) as f64;
        let score = 1.0 - violations as f64 / (rules + RULE_EPSILON);
        Ok(BusinessRules {
            rule_violations: violations,
            compliance_score: round2(score),
            status: Status::issue_if(score < MIN_COMPLIANCE),
        })
    }

    /// Identifier columns with more than 5% missing values.
    pub fn referential_integrity(&self, table: &Table, identifier_columns: &[String]) -> ReferentialIntegrity {
        let inconsistent: Vec<String> = identifier_columns
            .iter()
            .filter_map(|name| table.column(name))
            .filter(|c| !c.is_empty() && c.missing_count() as f64 / c.len() as f64 > MAX_IDENTIFIER_NULL_RATIO)
            .map(|c| c.name().to_string())
            .collect();

        let score = if identifier_columns.is_empty() {
            1.0
        } else {
            1.0 - inconsistent.len() as f64 / identifier_columns.len() as f64
        };
        ReferentialIntegrity {
            inconsistent_columns: inconsistent,
            integrity_score: round2(score),
            status: Status::issue_if(score < MIN_INTEGRITY),
        }
    }

    /// Pairs `(a, b)` where some row has `a > b`.
    pub fn cross_field_validation(&self, table: &Table, rules: &[(String, String)]) -> CrossField {
        let violations: Vec<String> = rules
            .iter()
            .filter_map(|(a, b)| Some((table.column(a)?, table.column(b)?)))
            .filter(|(a, b)| {
                a.values()
                    .iter()
                    .zip(b.values())
                    .any(|(x, y)| x.compare(y) == Some(Ordering::Greater))
            })
            .map(|(a, b)| format!("{}>{}", a.name(), b.name()))
            .collect();

        let score = 1.0 - violations.len() as f64 / rules.len().max(1) as f64;
        CrossField {
            violations,
            cross_field_score: round2(score),
            status: Status::issue_if(score < MIN_CROSS_FIELD),
        }
    }

    /// Columns holding values outside their domain rule.
    pub fn domain_value_validity(&self, table: &Table, rules: &IndexMap<String, DomainRule>) -> DomainValidity {
        let invalid: Vec<String> = rules
            .iter()
            .filter_map(|(name, rule)| table.column(name).map(|c| (c, rule)))
            .filter(|(column, rule)| column.present().any(|v| !rule_accepts(rule, v)))
            .map(|(column, _)| column.name().to_string())
            .collect();

        let score = 1.0 - invalid.len() as f64 / rules.len().max(1) as f64;
        DomainValidity {
            invalid_columns: invalid,
            domain_validity_score: round2(score),
            status: Status::issue_if(score < MIN_DOMAIN_VALIDITY),
        }
    }

    /// Rows where a voltage and a current column have opposite signs.
    pub fn semantic_consistency(&self, table: &Table) -> Result<SemanticConsistency, MetricError> {
        let matching = |needle: &str| -> Vec<&Column> {
            table
                .columns()
                .iter()
                .filter(|c| c.name().to_lowercase().contains(needle))
                .collect()
        };
        let voltage = matching("volt");
        let current = matching("current");

        let mut inconsistent = 0;
        for v in &voltage {
            let v_values = v.numeric()?;
            for c in &current {
                let c_values = c.numeric()?;
                inconsistent += v_values
                    .iter()
                    .zip(&c_values)
                    .filter(|(a, b)| matches!((a, b), (Some(a), Some(b)) if a * b < 0.0))
                    .count();
            }
        }

        let rows = table.row_count();
        let pairs = (voltage.len() * current.len()).max(1);
        let score = if rows > 0 {
            1.0 - inconsistent as f64 / (rows * pairs) as f64
        } else {
            1.0
        };
        Ok(SemanticConsistency {
            semantic_inconsistencies: inconsistent,
            semantic_score: round2(score),
            status: Status::issue_if(score < MIN_SEMANTIC_SCORE),
        })
    }

    /// Share of configured metadata columns present in the table.
    pub fn data_lineage_quality(&self, table: &Table, metadata_columns: &[String]) -> Lineage {
        let tracked = table.present(metadata_columns);
        let score = tracked.len() as f64 / metadata_columns.len().max(1) as f64;
        Lineage {
            tracked_columns: tracked,
            lineage_score: round2(score),
            status: Status::issue_if(score < MIN_LINEAGE),
        }
    }
}

fn rule_accepts(rule: &DomainRule, value: &Value) -> bool {
    match rule {
        DomainRule::Range(min, max) => value.as_f64().is_some_and(|v| v >= *min && v <= *max),
        DomainRule::Allowed(allowed) => allowed.iter().any(|a| a.matches(value)),
    }
}

impl MetricGroup for SemanticQuality {
    fn kind(&self) -> GroupKind {
        GroupKind::Semantic
    }

    fn evaluate(&self, table: &Table, ctx: &ScoringContext<'_>) -> Report {
        let settings = ctx.settings;

        let mut report = Report::new(self.kind());
        report.push_result(
            "business_rule_compliance",
            &self.business_rule_compliance(
                table,
                &settings.frequency_columns,
                &settings.powerfactor_columns,
            ),
        );
        report.push(
            "referential_integrity",
            &self.referential_integrity(table, &settings.identifier_columns),
        );
        report.push(
            "cross_field_validation",
            &self.cross_field_validation(table, &settings.cross_field_rules),
        );
        report.push(
            "domain_value_validity",
            &self.domain_value_validity(table, &settings.domain_rules),
        );
        report.push_result("semantic_consistency", &self.semantic_consistency(table));
        report.push(
            "data_lineage_quality",
            &self.data_lineage_quality(table, &settings.metadata_columns),
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::RuleValue;

    fn make_table(headers: &[&str], rows: Vec<Vec<&str>>) -> Table {
        Table::from_rows(headers, &rows).unwrap()
    }

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_business_rule_compliance() {
        let table = make_table(
            &["freq", "pf"],
            vec![vec!["50.0", "0.9"], vec!["50.1", "1.2"], vec!["49.9", "-0.5"]],
        );
        let result = SemanticQuality
            .business_rule_compliance(&table, &names(&["freq"]), &names(&["pf", "absent"]))
            .unwrap();
        assert_eq!(result.rule_violations, 1);
        assert_eq!(result.compliance_score, 0.5);
        assert_eq!(result.status, Status::Issue);

        let none = SemanticQuality.business_rule_compliance(&table, &[], &[]).unwrap();
        assert_eq!(none.compliance_score, 1.0);
        assert_eq!(none.status, Status::Ok);
    }

    #[test]
    fn test_business_rule_rejects_text_power_factor() {
        let table = make_table(&["pf"], vec![vec!["high"]]);
        let err = SemanticQuality
            .business_rule_compliance(&table, &[], &names(&["pf"]))
            .unwrap_err();
        assert!(matches!(err, MetricError::NotNumeric { .. }));
    }

    #[test]
    fn test_referential_integrity() {
        let mut rows: Vec<Vec<&str>> = (0..19).map(|_| vec!["1", "a"]).collect();
        rows.push(vec!["", "b"]);
        rows.push(vec!["", "c"]);
        let table = make_table(&["meter", "site"], rows);

        let result = SemanticQuality.referential_integrity(&table, &names(&["meter", "site", "absent"]));
        assert_eq!(result.inconsistent_columns, vec!["meter"]);
        assert_eq!(result.integrity_score, 0.67);
        assert_eq!(result.status, Status::Issue);

        let none = SemanticQuality.referential_integrity(&table, &[]);
        assert_eq!(none.integrity_score, 1.0);
    }

    #[test]
    fn test_cross_field_validation() {
        let table = make_table(
            &["low", "high", "label"],
            vec![vec!["1", "2", "a"], vec!["5", "3", "b"]],
        );
        let rules = vec![
            ("low".to_string(), "high".to_string()),
            ("high".to_string(), "label".to_string()),
            ("low".to_string(), "absent".to_string()),
        ];
        let result = SemanticQuality.cross_field_validation(&table, &rules);
        assert_eq!(result.violations, vec!["low>high"]);
        assert_eq!(result.cross_field_score, 0.67);
        assert_eq!(result.status, Status::Issue);
    }

    #[test]
    fn test_domain_value_validity_allowed_set() {
        let table = make_table(&["status"], vec![vec!["A"], vec!["B"], vec!["C"]]);
        let mut rules = IndexMap::new();
        rules.insert(
            "status".to_string(),
            DomainRule::Allowed(vec![RuleValue::Text("A".into()), RuleValue::Text("B".into())]),
        );
        let result = SemanticQuality.domain_value_validity(&table, &rules);
        assert_eq!(result.invalid_columns, vec!["status"]);
        assert_eq!(result.domain_validity_score, 0.0);
        assert_eq!(result.status, Status::Issue);
    }

    #[test]
    fn test_domain_value_validity_range() {
        let table = make_table(&["pf", "other"], vec![vec!["0.5", "x"], vec!["", "y"]]);
        let mut rules = IndexMap::new();
        rules.insert("pf".to_string(), DomainRule::Range(-1.0, 1.0));
        rules.insert("other".to_string(), DomainRule::Range(0.0, 1.0));
        let result = SemanticQuality.domain_value_validity(&table, &rules);
        assert_eq!(result.invalid_columns, vec!["other"]);
        assert_eq!(result.domain_validity_score, 0.5);
    }

    #[test]
    fn test_semantic_consistency() {
        let table = make_table(
            &["Voltage_L1", "current_a", "power"],
            vec![vec!["230", "1.5", "1"], vec!["231", "-1.0", "1"], vec!["229", "", "1"], vec!["-5", "2", "1"]],
        );
        let result = SemanticQuality.semantic_consistency(&table).unwrap();
        assert_eq!(result.semantic_inconsistencies, 2);
        assert_eq!(result.semantic_score, 0.5);
        assert_eq!(result.status, Status::Issue);

        let empty = make_table(&["voltage", "current"], vec![]);
        assert_eq!(SemanticQuality.semantic_consistency(&empty).unwrap().semantic_score, 1.0);
    }

    #[test]
    fn test_data_lineage_quality() {
        let table = make_table(&["source", "ingested_at"], vec![]);
        let result = SemanticQuality.data_lineage_quality(&table, &names(&["source", "ingested_at", "owner"]));
        assert_eq!(result.tracked_columns, vec!["source", "ingested_at"]);
        assert_eq!(result.lineage_score, 0.67);
        assert_eq!(result.status, Status::Issue);

        let none = SemanticQuality.data_lineage_quality(&table, &[]);
        assert_eq!(none.lineage_score, 0.0);
    }
}
