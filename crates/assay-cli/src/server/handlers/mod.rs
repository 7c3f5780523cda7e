//! API request handlers.

mod health;
mod score;

pub use health::*;
pub use score::*;
