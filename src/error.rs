//! Typed errors for configuration validation and batch submission
//!
//! Everything else in the crate propagates `anyhow::Error` with context; these
//! two types exist because callers branch on them: a `ConfigError` aborts the
//! run before any IO, a `SubmitError` ends the round loop early but still lets
//! the collected samples be reported.

use std::io;
use thiserror::Error;

/// Rejected configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Total size per round is zero
    #[error("Incorrect args: total == 0")]
    ZeroTotalSize,

    /// `block_size * descriptor_count * vector_count` does not equal the total size
    #[error(
        "Incorrect args: bs * iocbsnum * vectornum != total \
         ({block_size} * {descriptor_count} * {vector_count} != {total_size})"
    )]
    SizeProductMismatch {
        block_size: u64,
        descriptor_count: u64,
        vector_count: u64,
        total_size: u64,
    },

    /// Histogram parameters cannot form fixed-width buckets
    #[error("invalid histogram: start={start}, end={end}, step={step}")]
    InvalidHistogram { start: u64, end: u64, step: u64 },
}

/// Failure of a single batch submission
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The kernel refused the whole batch
    #[error("submit error: {0}")]
    Rejected(#[source] io::Error),

    /// The kernel accepted only part of the batch
    #[error("submit error: only {accepted} of {requested} requests accepted")]
    Partial { accepted: usize, requested: usize },

    /// The batch does not fit in the context's in-flight capacity
    #[error("submit error: batch of {requested} exceeds in-flight capacity {capacity}")]
    OverCapacity { requested: usize, capacity: usize },
}

impl SubmitError {
    /// Number of requests from the failed batch that are in flight anyway
    pub fn in_flight(&self) -> usize {
        match self {
            SubmitError::Partial { accepted, .. } => *accepted,
            _ => 0,
        }
    }
}

/// Strictly parsed size string was malformed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizeParseError {
    #[error("size '{0}' has no numeric prefix")]
    NoDigits(String),

    #[error("size '{0}' overflows 64 bits")]
    Overflow(String),
}
