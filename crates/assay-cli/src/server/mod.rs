//! HTTP adapter over the metric groups.

pub mod app;
pub mod error;
pub mod handlers;
pub mod state;
