//! Command implementations for OxiFlate CLI.

pub mod compress;
pub mod stats;

pub use compress::{CompressOptions, OutputFormat, cmd_compress};
pub use stats::cmd_stats;
