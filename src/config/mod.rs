//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! The result is a single [`BenchConfig`] value that is built once in `main`
//! and handed by reference to the pool builder and the benchmark loop.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::util::cycles::ClockSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Alignment of every write buffer (page size, satisfies O_DIRECT)
pub const BUFFER_ALIGNMENT: usize = 4096;

/// Default in-flight capacity of the async IO context
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Complete benchmark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// File or block device written by the benchmark
    pub test_file: PathBuf,
    /// Where to write the fixed-width histogram, if anywhere
    pub histogram_path: Option<PathBuf>,
    /// Where to write the JSON report, if anywhere
    pub output_path: Option<PathBuf>,
    /// Size of each buffer in bytes
    pub block_size: u64,
    /// Bytes written per round (all descriptors together)
    pub total_size: u64,
    /// Number of submit/reap rounds
    pub rounds: u64,
    /// Buffers per vectored write
    pub vector_count: u64,
    /// Vectored writes per batch
    pub descriptor_count: u64,
    /// Emit per-round progress diagnostics
    pub verbose: bool,
    /// Write the same region every round instead of advancing
    pub rewrite: bool,
    /// Byte used to fill buffers
    pub filler: u8,
    /// How buffers are filled
    pub fill_pattern: FillMode,
    /// In-flight capacity of the async IO context
    pub queue_capacity: usize,
    /// Open the test file with O_DIRECT
    pub direct: bool,
    /// Timestamp source for submission latency
    pub clock: ClockSource,
    /// Histogram bucket layout
    pub histogram: HistogramConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            test_file: PathBuf::from("test"),
            histogram_path: None,
            output_path: None,
            block_size: 0,
            total_size: 0,
            rounds: 0,
            vector_count: 0,
            descriptor_count: 0,
            verbose: false,
            rewrite: false,
            filler: 0,
            fill_pattern: FillMode::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            direct: true,
            clock: ClockSource::default(),
            histogram: HistogramConfig::default(),
        }
    }
}

impl BenchConfig {
    /// Byte distance between consecutive descriptors within one round
    pub fn descriptor_stride(&self) -> u64 {
        self.total_size.checked_div(self.descriptor_count).unwrap_or(0)
    }

    /// Bytes reserved on a freshly created test file
    pub fn preallocation_size(&self) -> u64 {
        self.total_size.saturating_mul(self.rounds)
    }
}

/// Buffer content policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    /// Every byte set to `BenchConfig::filler`
    #[default]
    Filler,
    /// Pseudo-random bytes
    Random,
}

impl fmt::Display for FillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillMode::Filler => write!(f, "filler"),
            FillMode::Random => write!(f, "random"),
        }
    }
}

/// Fixed-width histogram layout: buckets of `step` covering `[start, end)`,
/// the last bucket also absorbing everything at or above `end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    pub start: u64,
    pub end: u64,
    pub step: u64,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            start: 0,
            end: 5_000_000,
            step: 100_000,
        }
    }
}

impl HistogramConfig {
    /// Number of buckets
    pub fn bucket_count(&self) -> usize {
        (self.end.saturating_sub(self.start) / self.step.max(1)) as usize
    }
}

impl fmt::Display for BenchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        writeln!(f, "  Test file: {}", self.test_file.display())?;
        writeln!(
            f,
            "  Layout: {} descriptors x {} vectors x {} bytes = {} bytes/round",
            self.descriptor_count, self.vector_count, self.block_size, self.total_size
        )?;
        writeln!(
            f,
            "  Rounds: {} ({})",
            self.rounds,
            if self.rewrite { "rewrite" } else { "append" }
        )?;
        writeln!(
            f,
            "  Engine: libaio, capacity={}, direct={}, clock={}",
            self.queue_capacity, self.direct, self.clock
        )?;
        write!(f, "  Fill: {} (0x{:02x})", self.fill_pattern, self.filler)?;
        if let Some(ref path) = self.histogram_path {
            write!(f, "\n  Histogram: {}", path.display())?;
        }
        if let Some(ref path) = self.output_path {
            write!(f, "\n  JSON output: {}", path.display())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BenchConfig::default();
        assert_eq!(config.test_file, PathBuf::from("test"));
        assert_eq!(config.total_size, 0);
        assert_eq!(config.queue_capacity, 256);
        assert!(config.direct);
        assert!(!config.rewrite);
        assert_eq!(config.histogram.bucket_count(), 50);
    }

    #[test]
    fn test_descriptor_stride() {
        let config = BenchConfig {
            block_size: 4096,
            vector_count: 2,
            descriptor_count: 4,
            total_size: 32768,
            rounds: 10,
            ..Default::default()
        };
        assert_eq!(config.descriptor_stride(), 8192);
        assert_eq!(config.preallocation_size(), 327680);
    }

    #[test]
    fn test_descriptor_stride_zero_descriptors() {
        let config = BenchConfig {
            total_size: 4096,
            ..Default::default()
        };
        assert_eq!(config.descriptor_stride(), 0);
    }

    #[test]
    fn test_display_mentions_layout() {
        let config = BenchConfig {
            block_size: 4096,
            vector_count: 1,
            descriptor_count: 4,
            total_size: 16384,
            ..Default::default()
        };
        let text = config.to_string();
        assert!(text.contains("4 descriptors x 1 vectors x 4096 bytes = 16384 bytes/round"));
        assert!(text.contains("append"));
    }
}
