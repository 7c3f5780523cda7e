//! Application state for the web server.

use std::sync::Arc;

use assay::{Assay, Parser};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Orchestrator holding the loaded settings.
    pub assay: Arc<Assay>,
    /// Parser for uploaded files.
    pub parser: Arc<Parser>,
}

impl AppState {
    /// Create new application state.
    pub fn new(assay: Assay) -> Self {
        Self {
            assay: Arc::new(assay),
            parser: Arc::new(Parser::new()),
        }
    }
}
