//! Configuration loading and validation for the playback engine.

mod loader;
mod types;
mod validator;

pub use loader::{ConfigLoader, DEFAULT_CONFIG_FILE};
pub use types::*;
pub use validator::ConfigValidator;
