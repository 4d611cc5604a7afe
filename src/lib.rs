pub mod cli;
pub mod config;
pub mod error;
pub mod sanitizer;
pub mod utils;

// Re-exports
pub use config::Settings;
pub use error::{Error, Result};
pub use sanitizer::{default_policy, sanitize, sanitize_default, sanitize_opt, Policy};
