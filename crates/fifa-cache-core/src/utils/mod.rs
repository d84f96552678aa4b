//! Display helpers shared by the CLI listings and log output.

pub mod format;

pub use format::{format_age, format_bytes, truncate_string};
