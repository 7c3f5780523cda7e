//! Example: Score a tabular data file with Assay.
//!
//! Usage:
//!   cargo run --example score -- <file_path> [settings.yaml]
//!
//! Example:
//!   cargo run --example score -- readings.csv column_config.yaml

use std::env;
use std::path::Path;

use assay::{Assay, Parser, Settings, Status, Table};

fn main() -> assay::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cargo run --example score -- <file_path> [settings.yaml]");
        eprintln!("\nExample:");
        eprintln!("  cargo run --example score -- readings.csv column_config.yaml");
        std::process::exit(1);
    }

    let file_path = &args[1];
    if !Path::new(file_path).exists() {
        eprintln!("Error: File not found: {}", file_path);
        std::process::exit(1);
    }

    let settings = match args.get(2) {
        Some(config) => Settings::from_path(config)?,
        None => Settings::default(),
    };

    let separator = "=".repeat(80);
    println!("{}", separator);
    println!("Assay Report: {}", file_path);
    println!("{}", separator);
    println!();

    let (data, meta) = Parser::new().parse_file(file_path)?;
    let table = Table::from_data_table(&data)?;
    println!(
        "Source: {} ({} rows, {} columns, {})",
        meta.file, meta.row_count, meta.column_count, meta.format
    );
    println!("Hash:   {}", meta.hash);
    println!();

    let assay = Assay::new(settings);
    for report in assay.score_all(&table) {
        println!("{}", format!("[{}]", report.group).to_uppercase());
        for (metric, value) in &report.metrics {
            // Table-level records carry their own status; per-column maps are summarized
            let summary = match value.get("status").and_then(|s| s.as_str()) {
                Some(status) => status.to_string(),
                None => summarize_columns(value),
            };
            println!("  {:28} {}", metric, summary);
        }
        println!();
    }

    let ok = serde_json::to_value(Status::Ok)?;
    println!("{}", separator);
    println!("Status labels other than {} point at columns worth a look.", ok);
    println!("{}", separator);

    Ok(())
}

/// "n columns, m flagged" for a per-column metric map.
fn summarize_columns(value: &serde_json::Value) -> String {
    let Some(columns) = value.as_object() else {
        return value.to_string();
    };
    let flagged = columns
        .values()
        .filter(|record| {
            record
                .get("status")
                .and_then(|s| s.as_str())
                .is_some_and(|s| !matches!(s, "OK" | "Valid" | "Normal" | "Stable" | "No data"))
        })
        .count();
    format!("{} columns, {} flagged", columns.len(), flagged)
}
