//! Score command - run metric groups over a data file and emit the JSON report.

use std::path::PathBuf;

use assay::Assay;
use colored::Colorize;
use tracing::info;

use super::{load_settings, load_table};
use crate::cli::GroupSelection;

pub fn run(
    file: PathBuf,
    group: GroupSelection,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings(config.as_deref())?;
    let (table, metadata) = load_table(&file)?;
    info!(
        file = %metadata.file,
        hash = %metadata.hash,
        rows = metadata.row_count,
        columns = metadata.column_count,
        "Loaded data"
    );

    let assay = Assay::new(settings);
    let report = match group {
        GroupSelection::All => assay.report(&table),
        GroupSelection::One(kind) => assay.score(&table, kind).to_json(),
    };

    let rendered = if compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };

    match output {
        Some(path) => {
            std::fs::write(&path, rendered + "\n")?;
            eprintln!(
                "{} {} ({} group{})",
                "Saved report to".green().bold(),
                path.display().to_string().white(),
                group,
                if group == GroupSelection::All { "s" } else { "" }
            );
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
