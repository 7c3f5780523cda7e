//! CLI command implementations.

pub mod inspect;
pub mod score;
pub mod serve;

use std::path::Path;

use assay::{Parser, Settings, SourceMetadata, Table};
use tracing::debug;

/// Settings from `--config`, or the empty default.
pub fn load_settings(config: Option<&Path>) -> assay::Result<Settings> {
    match config {
        Some(path) => {
            debug!(path = %path.display(), "Loading settings");
            Settings::from_path(path)
        }
        None => Ok(Settings::default()),
    }
}

/// Parse a data file into a typed table.
pub fn load_table(file: &Path) -> Result<(Table, SourceMetadata), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }
    let (data, metadata) = Parser::new().parse_file(file)?;
    let table = Table::from_data_table(&data)?;
    Ok((table, metadata))
}
