//! Report orchestration: select metric groups, run them, merge their output.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::{debug, info, warn};

use crate::error::MetricError;
use crate::metrics::{
    AdvancedAnalytics, CoreQuality, ErrorRecord, InformationQuality, PrecisionQuality,
    SemanticQuality, StatisticalQuality, StructuralQuality, TemporalQuality,
};
use crate::settings::Settings;
use crate::table::Table;

/// The eight metric groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Core,
    Statistical,
    Structural,
    Semantic,
    Temporal,
    Information,
    Precision,
    Analytics,
}

impl GroupKind {
    /// Every group, in report order.
    pub const ALL: [GroupKind; 8] = [
        GroupKind::Core,
        GroupKind::Statistical,
        GroupKind::Structural,
        GroupKind::Semantic,
        GroupKind::Temporal,
        GroupKind::Information,
        GroupKind::Precision,
        GroupKind::Analytics,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GroupKind::Core => "core",
            GroupKind::Statistical => "statistical",
            GroupKind::Structural => "structural",
            GroupKind::Semantic => "semantic",
            GroupKind::Temporal => "temporal",
            GroupKind::Information => "information",
            GroupKind::Precision => "precision",
            GroupKind::Analytics => "analytics",
        }
    }

    /// HTTP path segment serving this group.
    pub fn route(&self) -> &'static str {
        match self {
            GroupKind::Core => "data-quality",
            GroupKind::Statistical => "statistical-quality",
            GroupKind::Structural => "structural-quality",
            GroupKind::Semantic => "semantic-quality",
            GroupKind::Temporal => "temporal-quality",
            GroupKind::Information => "information-quality",
            GroupKind::Precision => "precision-quality",
            GroupKind::Analytics => "advanced-analytics",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GroupKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        GroupKind::ALL
            .into_iter()
            .find(|k| k.name() == lower || k.route() == lower)
            .ok_or_else(|| format!("unknown metric group '{s}'"))
    }
}

/// Inputs shared by every group for one request.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub settings: &'a Settings,
    /// Reference time for freshness.
    pub now: DateTime<Utc>,
}

impl<'a> ScoringContext<'a> {
    pub fn new(settings: &'a Settings, now: DateTime<Utc>) -> Self {
        Self { settings, now }
    }

    /// Configured datetime columns present in the table.
    pub fn datetime_columns(&self, table: &Table) -> Vec<String> {
        table.present(&self.settings.datetime_columns)
    }
}

/// Output of one metric group: metric name to JSON value, in metric order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub group: GroupKind,
    pub metrics: IndexMap<String, Json>,
}

impl Report {
    pub fn new(group: GroupKind) -> Self {
        Self {
            group,
            metrics: IndexMap::new(),
        }
    }

    /// Add a metric; non-finite numbers become `null`.
    pub fn push<T: Serialize>(&mut self, name: &str, value: &T) {
        let json = match serde_json::to_value(value) {
            Ok(json) => sanitize(json),
            Err(e) => {
                warn!(metric = name, error = %e, "Failed to serialize metric");
                serde_json::json!({ "status": "Error", "error": e.to_string() })
            }
        };
        self.metrics.insert(name.to_string(), json);
    }

    /// Add a metric that may have failed as a whole.
    pub fn push_result<T: Serialize>(&mut self, name: &str, result: &Result<T, MetricError>) {
        match result {
            Ok(value) => self.push(name, value),
            Err(e) => {
                warn!(metric = name, error = %e, "Metric failed");
                self.push(name, &ErrorRecord::new(e));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Json> {
        self.metrics.get(name)
    }

    /// The metrics map as a JSON object.
    pub fn to_json(&self) -> Json {
        Json::Object(self.metrics.clone().into_iter().collect())
    }
}

/// A family of related metrics evaluated together.
pub trait MetricGroup: Send + Sync {
    fn kind(&self) -> GroupKind;

    /// Run every metric of the group.
    fn evaluate(&self, table: &Table, ctx: &ScoringContext<'_>) -> Report;
}

/// Replace non-finite numbers with `null`, recursively.
pub fn sanitize(value: Json) -> Json {
    match value {
        Json::Number(n) => match n.as_f64() {
            Some(f) if !f.is_finite() => Json::Null,
            _ => Json::Number(n),
        },
        Json::Array(items) => Json::Array(items.into_iter().map(sanitize).collect()),
        Json::Object(map) => Json::Object(map.into_iter().map(|(k, v)| (k, sanitize(v))).collect()),
        other => other,
    }
}

/// Runs metric groups against tables.
///
/// # Example
///
/// ```
/// use assay::{Assay, GroupKind, Settings, Table};
///
/// let table = Table::from_rows(&["a", "b"], &[vec!["1", "2"], vec!["3", ""]]).unwrap();
/// let report = Assay::new(Settings::default()).score(&table, GroupKind::Core);
/// assert_eq!(report.metrics["completeness"]["score"], 75.0);
/// ```
pub struct Assay {
    settings: Settings,
    now: Option<DateTime<Utc>>,
    groups: Vec<Box<dyn MetricGroup>>,
}

impl Assay {
    /// Create an orchestrator with every group.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            now: None,
            groups: vec![
                Box::new(CoreQuality),
                Box::new(StatisticalQuality),
                Box::new(StructuralQuality),
                Box::new(SemanticQuality),
                Box::new(TemporalQuality),
                Box::new(InformationQuality),
                Box::new(PrecisionQuality),
                Box::new(AdvancedAnalytics),
            ],
        }
    }

    /// Fix the reference time instead of reading the clock.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn context(&self) -> ScoringContext<'_> {
        ScoringContext::new(&self.settings, self.now.unwrap_or_else(Utc::now))
    }

    /// Run one group.
    pub fn score(&self, table: &Table, kind: GroupKind) -> Report {
        self.score_with(table, kind, &self.context())
    }

    fn score_with(&self, table: &Table, kind: GroupKind, ctx: &ScoringContext<'_>) -> Report {
        let Some(group) = self.groups.iter().find(|g| g.kind() == kind) else {
            return Report::new(kind);
        };

        debug!(
            group = %kind,
            rows = table.row_count(),
            columns = table.column_count(),
            "Scoring group"
        );
        let report = group.evaluate(table, ctx);
        debug!(group = %kind, metrics = report.metrics.len(), "Group scored");
        report
    }

    /// Run every group with a single reference time.
    pub fn score_all(&self, table: &Table) -> Vec<Report> {
        let ctx = self.context();
        let reports: Vec<Report> = GroupKind::ALL
            .into_iter()
            .map(|kind| self.score_with(table, kind, &ctx))
            .collect();

        info!(
            rows = table.row_count(),
            columns = table.column_count(),
            groups = reports.len(),
            "Report complete"
        );
        reports
    }

    /// Run every group and key the metric maps by group name.
    pub fn report(&self, table: &Table) -> Json {
        let merged: serde_json::Map<String, Json> = self
            .score_all(table)
            .into_iter()
            .map(|r| (r.group.name().to_string(), r.to_json()))
            .collect();
        Json::Object(merged)
    }
}

impl Default for Assay {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
