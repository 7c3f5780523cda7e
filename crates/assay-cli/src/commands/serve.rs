//! Serve command - expose the metric groups over HTTP.

use std::path::PathBuf;

use assay::{Assay, GroupKind};
use colored::Colorize;

use super::load_settings;
use crate::server::{app, state::AppState};

pub fn run(host: String, port: u16, config: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings(config.as_deref())?;
    let state = AppState::new(Assay::new(settings));

    let url = format!("http://{}:{}", host, port);
    println!(
        "{} {}",
        "Starting scoring server at".cyan().bold(),
        url.white().bold()
    );
    println!();
    for kind in GroupKind::ALL {
        println!("  POST /{}", kind.route());
    }
    println!("  POST /report");
    println!("  GET  /health");
    println!();
    println!("Press {} to stop the server", "Ctrl+C".yellow().bold());
    println!();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(app::run_server(state, &host, port))?;

    Ok(())
}
