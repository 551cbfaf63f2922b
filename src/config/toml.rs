//! TOML configuration file parsing
//!
//! A file holds any subset of [`BenchConfig`] fields; missing ones take their
//! defaults. Command-line flags are applied on top afterwards.
//!
//! ```toml
//! test_file = "/dev/nvme0n1"
//! block_size = 4096
//! vector_count = 1
//! descriptor_count = 4
//! total_size = 16384
//! rounds = 1000
//!
//! [histogram]
//! end = 2000000
//! step = 50000
//! ```

use super::BenchConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<BenchConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<BenchConfig> {
    let config: BenchConfig = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}
