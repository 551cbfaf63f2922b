//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// iosubmit - batch submission latency benchmark for Linux native AIO
///
/// Builds a fixed pool of vectored direct-IO writes and submits the whole pool
/// as one batch per round, timing only the submit call.
///
/// Sizes and counts accept an optional k/m/g suffix (powers of 1024).
#[derive(Parser, Debug, Default)]
#[command(name = "iosubmit")]
#[command(about, long_about = None)]
pub struct Cli {
    /// Size of each buffer (e.g., 4k, 1M)
    #[arg(short = 'b', long = "blocksize")]
    pub block_size: Option<String>,

    /// Bytes written per round; must equal blocksize * iocbsnum * vectornum
    #[arg(short = 't', long = "totalsize")]
    pub total_size: Option<String>,

    /// Number of rounds
    #[arg(short = 'n', long = "number")]
    pub rounds: Option<String>,

    /// Number of vectored writes submitted per batch
    #[arg(short = 'i', long = "iocbsnum")]
    pub descriptor_count: Option<String>,

    /// Number of buffers per vectored write
    #[arg(short = 'V', long = "vectornum")]
    pub vector_count: Option<String>,

    /// JSON report output file
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Histogram output file ("<lower_bound>, <count>" per line)
    #[arg(short = 'H', long = "histout")]
    pub histogram: Option<PathBuf>,

    /// File or block device to write to
    #[arg(short = 'T', long = "testfile")]
    pub test_file: Option<PathBuf>,

    /// Filler character for write buffers (first character is used)
    #[arg(short = 'F', long = "fill")]
    pub fill: Option<String>,

    /// Rewrite the same region every round instead of advancing
    #[arg(short = 'r', long)]
    pub rewrite: bool,

    /// Print per-round progress to stderr
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// In-flight capacity of the AIO context
    #[arg(long)]
    pub queue_capacity: Option<String>,

    /// Timestamp source for submission latency
    #[arg(long, value_enum)]
    pub clock: Option<ClockArg>,

    /// Open the test file without O_DIRECT (for filesystems like tmpfs)
    #[arg(long)]
    pub buffered: bool,

    /// How write buffers are filled
    #[arg(long, value_enum)]
    pub fill_pattern: Option<FillArg>,

    /// TOML configuration file (command-line flags take precedence)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Dry run - validate configuration without executing
    #[arg(long)]
    pub dry_run: bool,
}

/// Timestamp source
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClockArg {
    /// CPU timestamp counter (cycles)
    Tsc,
    /// CLOCK_MONOTONIC (nanoseconds)
    Monotonic,
}

/// Buffer fill pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FillArg {
    /// Every byte set to the --fill character
    Filler,
    /// Random bytes
    Random,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
