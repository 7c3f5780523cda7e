//! Assay CLI - data-quality scoring for tabular datasets.

mod cli;
mod commands;
mod server;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let result = match cli.command {
        Commands::Score {
            file,
            group,
            config,
            output,
            compact,
        } => commands::score::run(file, group, config, output, compact),

        Commands::Inspect { file } => commands::inspect::run(file, cli.verbose),

        Commands::Serve { host, port, config } => commands::serve::run(host, port, config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the level chosen by `--verbose`.
fn init_logging(verbose: bool, json: bool) {
    let default = if verbose {
        "assay=debug,assay_cli=debug,warn"
    } else {
        "assay=info,assay_cli=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
