//! Tagged cell values and lenient temporal coercion.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::input::DataTable;

/// Timestamp layouts carrying an explicit UTC offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%:z",
];

/// Naive date-time layouts (interpreted as UTC).
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Date-only layouts (midnight).
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// A point in time parsed from a cell.
///
/// `instant` is the UTC instant used for ordering and gaps; `local` is the
/// wall-clock time as written, which drives hour-of-day metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    instant: NaiveDateTime,
    local: NaiveDateTime,
    offset: Option<FixedOffset>,
}

impl Timestamp {
    /// Timestamp without zone information.
    pub fn naive(local: NaiveDateTime) -> Self {
        Self {
            instant: local,
            local,
            offset: None,
        }
    }

    /// Timestamp with an explicit UTC offset.
    pub fn with_offset(value: DateTime<FixedOffset>) -> Self {
        Self {
            instant: value.naive_utc(),
            local: value.naive_local(),
            offset: Some(*value.offset()),
        }
    }

    /// Leniently parse a timestamp; `None` when no known layout matches.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.len() < 6 || !s.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self::with_offset(dt));
        }

        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Some(Self::with_offset(dt));
            }
        }

        // Trailing Z / UTC marker on an otherwise naive layout
        let (body, utc) = match s.strip_suffix('Z').or_else(|| s.strip_suffix(" UTC")) {
            Some(body) => (body, true),
            None => (s, false),
        };

        let naive = DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(body, fmt).ok())
            .or_else(|| {
                DATE_FORMATS.iter().find_map(|fmt| {
                    NaiveDate::parse_from_str(body, fmt)
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                })
            })?;

        if utc {
            Some(Self::with_offset(naive.and_utc().fixed_offset()))
        } else {
            Some(Self::naive(naive))
        }
    }

    /// UTC instant (naive values are taken as UTC).
    pub fn instant(&self) -> NaiveDateTime {
        self.instant
    }

    /// Wall-clock time as written.
    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    /// Wall-clock hour of day, 0-23.
    pub fn hour(&self) -> u32 {
        self.local.hour()
    }

    /// Explicit UTC offset, if the source carried one.
    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{}{}", self.local.format("%Y-%m-%d %H:%M:%S"), offset),
            None => write!(f, "{}", self.local.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Runtime kind of a non-missing cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Boolean,
    Numeric,
    Temporal,
    Text,
}

/// A single typed cell.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value, distinct from empty text or zero.
    Missing,
    Boolean(bool),
    Numeric(f64),
    Temporal(Timestamp),
    Text(String),
}

impl Value {
    /// Type a raw cell: missing, then boolean, numeric, temporal, text.
    pub fn infer(raw: &str) -> Self {
        if DataTable::is_null_value(raw) {
            return Value::Missing;
        }
        let trimmed = raw.trim();

        if trimmed.eq_ignore_ascii_case("true") {
            return Value::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Value::Boolean(false);
        }

        if let Ok(num) = trimmed.parse::<f64>() {
            if num.is_finite() {
                return Value::Numeric(num);
            }
        }

        if let Some(ts) = Timestamp::parse(trimmed) {
            return Value::Temporal(ts);
        }

        Value::Text(trimmed.to_string())
    }

    /// Returns true for the missing marker.
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Kind of a present value; `None` when missing.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Missing => None,
            Value::Boolean(_) => Some(ValueKind::Boolean),
            Value::Numeric(_) => Some(ValueKind::Numeric),
            Value::Temporal(_) => Some(ValueKind::Temporal),
            Value::Text(_) => Some(ValueKind::Text),
        }
    }

    /// Numeric view; booleans coerce to 1/0.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Numeric(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Temporal view.
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Temporal(ts) => Some(*ts),
            Value::Text(s) => Timestamp::parse(s),
            _ => None,
        }
    }

    /// Categorical rendering; `None` when missing.
    pub fn render(&self) -> Option<String> {
        match self {
            Value::Missing => None,
            other => Some(other.to_string()),
        }
    }

    /// Ordering between two present values of the same kind.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Numeric(a), Value::Numeric(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Temporal(a), Value::Temporal(b)) => Some(a.instant.cmp(&b.instant)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Numeric(n) => write!(f, "{n}"),
            Value::Temporal(ts) => write!(f, "{ts}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Missing, Value::Missing) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Numeric(a), Value::Numeric(b)) => a == b,
            (Value::Temporal(a), Value::Temporal(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

// Numeric cells are always finite, so equality is reflexive.
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Missing => {}
            Value::Boolean(b) => b.hash(state),
            // -0.0 == 0.0, so both must hash alike
            Value::Numeric(n) => (if *n == 0.0 { 0.0f64 } else { *n }).to_bits().hash(state),
            Value::Temporal(ts) => ts.hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}
