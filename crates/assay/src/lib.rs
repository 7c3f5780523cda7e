//! Assay: data-quality scoring for tabular datasets.
//!
//! Assay reads a table, types every cell once, and runs eight families of
//! quality metrics over it. Each family produces a [`Report`] mapping metric
//! names to JSON-ready records carrying a score and a status label.
//!
//! # Core Principles
//!
//! - **Isolation**: a failing column or metric is recorded in the report and
//!   never aborts its siblings
//! - **Pure scoring**: metrics read the table and settings only; the clock is
//!   injected through [`ScoringContext`]
//! - **Finite output**: every numeric leaf in a report is finite or `null`
//!
//! # Example
//!
//! ```no_run
//! use assay::{Assay, Parser, Settings, Table};
//!
//! let (data, _meta) = Parser::new().parse_file("readings.csv").unwrap();
//! let table = Table::from_data_table(&data).unwrap();
//!
//! let assay = Assay::new(Settings::default());
//! println!("{}", assay.report(&table));
//! ```

pub mod engine;
pub mod error;
pub mod input;
pub mod metrics;
pub mod settings;
pub mod table;

pub use engine::{sanitize, Assay, GroupKind, MetricGroup, Report, ScoringContext};
pub use error::{AssayError, MetricError, Result};
pub use input::{DataTable, Parser, ParserConfig, SourceMetadata};
pub use metrics::{PerColumn, Status};
pub use settings::{DomainRule, RuleValue, Settings};
pub use table::{Column, ColumnKind, Table, Timestamp, Value, ValueKind};
