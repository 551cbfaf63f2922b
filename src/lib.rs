//! iosubmit - batch submission latency benchmark
//!
//! Measures how long it takes to hand a batch of asynchronous, vectored,
//! direct-IO writes to the kernel, and reports the distribution of those
//! submission latencies.
//!
//! # Architecture
//!
//! - **config**: CLI/TOML configuration and layout validation
//! - **target**: test file open and pre-extension policy
//! - **runner**: request pool construction and the submit/reap round loop
//! - **engine**: async IO backends (libaio via raw syscalls, plus a mock)
//! - **stats**: latency samples, percentile summary, fixed-width histogram
//! - **output**: text summary and JSON report

pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod runner;
pub mod stats;
pub mod target;
pub mod util;

// Re-export commonly used types
pub use config::BenchConfig;
pub use engine::BatchEngine;
pub use error::{ConfigError, SubmitError};

/// Result type used throughout iosubmit
pub type Result<T> = anyhow::Result<T>;
