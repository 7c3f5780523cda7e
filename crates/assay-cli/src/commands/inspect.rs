//! Inspect command - show how each column was typed.

use std::path::PathBuf;

use assay::ColumnKind;
use colored::Colorize;

use super::load_table;

pub fn run(file: PathBuf, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (table, metadata) = load_table(&file)?;

    println!(
        "{} {}",
        "Inspecting".cyan().bold(),
        metadata.file.white()
    );
    println!(
        "{} rows, {} columns ({})",
        table.row_count().to_string().white().bold(),
        table.column_count().to_string().white().bold(),
        metadata.format
    );
    if verbose {
        println!("  Hash: {}", metadata.hash);
        println!("  Size: {} bytes", metadata.size_bytes);
    }
    println!();

    println!(
        "  {:24} {:10} {:>8} {:>8}",
        "COLUMN".yellow().bold(),
        "KIND".yellow().bold(),
        "MISSING".yellow().bold(),
        "DISTINCT".yellow().bold()
    );
    for column in table.columns() {
        let kind = format!("{:?}", column.kind()).to_lowercase();
        let kind = match column.kind() {
            ColumnKind::Mixed => kind.red(),
            ColumnKind::Empty => kind.dimmed(),
            _ => kind.normal(),
        };
        let missing = column.missing_count();
        let missing = if missing > 0 {
            missing.to_string().yellow()
        } else {
            missing.to_string().normal()
        };
        println!(
            "  {:24} {:10} {:>8} {:>8}",
            column.name(),
            kind,
            missing,
            column.distinct_count()
        );
    }

    Ok(())
}
