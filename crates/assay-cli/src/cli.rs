//! CLI argument definitions using clap.

use assay::GroupKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Assay: data-quality scoring for tabular datasets
#[derive(Parser)]
#[command(name = "assay")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a data file and print the JSON report
    Score {
        /// Path to the data file (CSV, TSV, XLS or XLSX)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Metric group to run
        #[arg(short, long, default_value = "all")]
        group: GroupSelection,

        /// Settings document (YAML or JSON)
        #[arg(short, long, env = "ASSAY_CONFIG")]
        config: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show the inferred kind of every column
    Inspect {
        /// Path to the data file (CSV, TSV, XLS or XLSX)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Serve the scoring API over HTTP
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for web server
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Settings document (YAML or JSON)
        #[arg(short, long, env = "ASSAY_CONFIG")]
        config: Option<PathBuf>,
    },
}

/// Which metric groups to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GroupSelection {
    #[default]
    All,
    One(GroupKind),
}

impl std::str::FromStr for GroupSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(GroupSelection::All);
        }
        s.parse::<GroupKind>().map(GroupSelection::One).map_err(|_| {
            format!(
                "Unknown group: {}. Use all, core, statistical, structural, semantic, temporal, information, precision or analytics.",
                s
            )
        })
    }
}

impl std::fmt::Display for GroupSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupSelection::All => write!(f, "all"),
            GroupSelection::One(kind) => write!(f, "{}", kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_selection_parse() {
        assert_eq!("all".parse::<GroupSelection>().unwrap(), GroupSelection::All);
        assert_eq!(
            "precision".parse::<GroupSelection>().unwrap(),
            GroupSelection::One(GroupKind::Precision)
        );
        assert_eq!(
            "advanced-analytics".parse::<GroupSelection>().unwrap(),
            GroupSelection::One(GroupKind::Analytics)
        );
        assert!("bogus".parse::<GroupSelection>().is_err());
    }

    #[test]
    fn test_cli_parses_score() {
        let cli = Cli::try_parse_from(["assay", "score", "data.csv", "--group", "core", "--compact"])
            .unwrap();
        match cli.command {
            Commands::Score { group, compact, .. } => {
                assert_eq!(group, GroupSelection::One(GroupKind::Core));
                assert!(compact);
            }
            _ => panic!("expected score"),
        }
    }
}
