//! Scoring configuration: expected schema, ranges, column roles and rules.
//!
//! Settings are loaded once from a YAML or JSON document and validated at
//! load time. Every field is optional; an absent field is an empty list or
//! mapping, and the metrics that depend on it degrade accordingly.
//!
//! ```yaml
//! expected_schema: [timestamp, voltage, current, frequency]
//! value_ranges:
//!   voltage: [210, 250]
//! datetime_columns: [timestamp]
//! identifier_columns: [meter_id]
//! domain_rules:
//!   status: [A, B]
//!   power_factor: [-1, 1]
//! cross_field_rules:
//!   - [min_reading, max_reading]
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AssayError, Result};
use crate::table::Value;

/// Parsed, validated scoring configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Canonical column order.
    pub expected_schema: Vec<String>,
    /// Inclusive `[min, max]` bounds per column.
    pub value_ranges: IndexMap<String, (f64, f64)>,
    pub datetime_columns: Vec<String>,
    pub identifier_columns: Vec<String>,
    pub metadata_columns: Vec<String>,
    pub frequency_columns: Vec<String>,
    pub powerfactor_columns: Vec<String>,
    pub domain_rules: IndexMap<String, DomainRule>,
    /// Pairs `(a, b)` asserting `a` never exceeds `b`.
    pub cross_field_rules: Vec<(String, String)>,
    /// Columns `[a, b, c]` for the `c == a + b` check.
    pub calculation_columns: Vec<String>,
}

/// A domain rule: a numeric range or an allowed-value set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainRule {
    Range(f64, f64),
    Allowed(Vec<RuleValue>),
}

/// One literal in an allowed-value set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl RuleValue {
    /// Returns true when a present cell equals this literal.
    ///
    /// Text literals also match the cell's rendering, so `"1"` in a rule
    /// accepts a numeric cell `1`.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (RuleValue::Boolean(a), Value::Boolean(b)) => a == b,
            (RuleValue::Number(a), other) => other.as_f64().is_some_and(|b| *a == b),
            (RuleValue::Text(a), Value::Text(b)) => a == b,
            (RuleValue::Text(a), other) => other.render().is_some_and(|r| *a == r),
            _ => false,
        }
    }
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Boolean(b) => write!(f, "{b}"),
            RuleValue::Number(n) => write!(f, "{n}"),
            RuleValue::Text(s) => f.write_str(s),
        }
    }
}

impl Settings {
    /// Load settings from a file; `.json` is read as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| AssayError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let settings = if is_json {
            Self::from_json_str(&contents)?
        } else {
            Self::from_yaml_str(&contents)?
        };

        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Parse and validate a YAML document. An empty document is the default.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check bounds and names.
    pub fn validate(&self) -> Result<()> {
        for (column, (min, max)) in &self.value_ranges {
            check_bounds("value_ranges", column, *min, *max)?;
        }

        for (column, rule) in &self.domain_rules {
            if let DomainRule::Range(min, max) = rule {
                check_bounds("domain_rules", column, *min, *max)?;
            }
        }

        let lists: [(&str, &Vec<String>); 7] = [
            ("expected_schema", &self.expected_schema),
            ("datetime_columns", &self.datetime_columns),
            ("identifier_columns", &self.identifier_columns),
            ("metadata_columns", &self.metadata_columns),
            ("frequency_columns", &self.frequency_columns),
            ("powerfactor_columns", &self.powerfactor_columns),
            ("calculation_columns", &self.calculation_columns),
        ];
        for (field, names) in lists {
            if names.iter().any(|n| n.trim().is_empty()) {
                return Err(AssayError::Config(format!(
                    "{field} contains an empty column name"
                )));
            }
        }

        let keyed = self
            .value_ranges
            .keys()
            .chain(self.domain_rules.keys())
            .chain(self.cross_field_rules.iter().flat_map(|(a, b)| [a, b]));
        if keyed.into_iter().any(|n| n.trim().is_empty()) {
            return Err(AssayError::Config(
                "rule refers to an empty column name".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_bounds(field: &str, column: &str, min: f64, max: f64) -> Result<()> {
    if !min.is_finite() || !max.is_finite() {
        return Err(AssayError::Config(format!(
            "{field}.{column}: bounds must be finite"
        )));
    }
    if min > max {
        return Err(AssayError::Config(format!(
            "{field}.{column}: min {min} is greater than max {max}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(Settings::from_yaml_str("").unwrap(), Settings::default());
        assert_eq!(Settings::from_json_str("{}").unwrap(), Settings::default());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
expected_schema: [timestamp, voltage]
value_ranges:
  voltage: [210, 250]
datetime_columns: [timestamp]
domain_rules:
  status: [A, B]
  power_factor: [-1, 1]
  active: [true]
cross_field_rules:
  - [low, high]
"#;
        let settings = Settings::from_yaml_str(yaml).unwrap();
        assert_eq!(settings.expected_schema, vec!["timestamp", "voltage"]);
        assert_eq!(settings.value_ranges["voltage"], (210.0, 250.0));
        assert_eq!(settings.domain_rules["power_factor"], DomainRule::Range(-1.0, 1.0));
        assert_eq!(
            settings.domain_rules["status"],
            DomainRule::Allowed(vec![
                RuleValue::Text("A".into()),
                RuleValue::Text("B".into())
            ])
        );
        assert_eq!(
            settings.domain_rules["active"],
            DomainRule::Allowed(vec![RuleValue::Boolean(true)])
        );
        assert_eq!(
            settings.cross_field_rules,
            vec![("low".to_string(), "high".to_string())]
        );
        assert!(settings.identifier_columns.is_empty());
    }

    #[test]
    fn test_three_numbers_are_an_allowed_set() {
        let settings = Settings::from_json_str(r#"{"domain_rules": {"grade": [1, 2, 3]}}"#).unwrap();
        assert!(matches!(settings.domain_rules["grade"], DomainRule::Allowed(ref v) if v.len() == 3));
    }

    #[test]
    fn test_rejects_inverted_range() {
        let err = Settings::from_json_str(r#"{"value_ranges": {"v": [5, 1]}}"#).unwrap_err();
        assert!(matches!(err, AssayError::Config(_)));

        let err = Settings::from_yaml_str("domain_rules:\n  pf: [1, -1]\n").unwrap_err();
        assert!(matches!(err, AssayError::Config(_)));
    }

    #[test]
    fn test_rejects_empty_names() {
        let err = Settings::from_yaml_str("identifier_columns: ['', id]\n").unwrap_err();
        assert!(matches!(err, AssayError::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_document() {
        assert!(matches!(
            Settings::from_yaml_str("value_ranges: [1, 2, 3]\n"),
            Err(AssayError::Yaml(_))
        ));
        assert!(matches!(
            Settings::from_json_str("{not json"),
            Err(AssayError::Json(_))
        ));
    }

    #[test]
    fn test_from_path_by_extension() {
        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(json, r#"{{"datetime_columns": ["ts"]}}"#).unwrap();
        assert_eq!(Settings::from_path(json.path()).unwrap().datetime_columns, vec!["ts"]);

        let mut yaml = NamedTempFile::new().unwrap();
        writeln!(yaml, "metadata_columns: [source]").unwrap();
        assert_eq!(Settings::from_path(yaml.path()).unwrap().metadata_columns, vec!["source"]);

        assert!(matches!(
            Settings::from_path("/nonexistent/assay.yaml"),
            Err(AssayError::Io { .. })
        ));
    }

    #[test]
    fn test_rule_value_matches() {
        assert!(RuleValue::Text("A".into()).matches(&Value::Text("A".into())));
        assert!(!RuleValue::Text("A".into()).matches(&Value::Text("C".into())));
        assert!(RuleValue::Number(1.0).matches(&Value::Numeric(1.0)));
        assert!(RuleValue::Text("1".into()).matches(&Value::Numeric(1.0)));
        assert!(RuleValue::Boolean(false).matches(&Value::Boolean(false)));
    }
}
