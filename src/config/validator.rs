//! Configuration validation
//!
//! Only the layout invariants are enforced: a non-zero total size, and
//! `block_size * descriptor_count * vector_count == total_size`. Everything
//! else is used as supplied, so zero rounds simply runs no rounds.

use super::{BenchConfig, HistogramConfig};
use crate::error::ConfigError;

/// Validate complete configuration
pub fn validate_config(config: &BenchConfig) -> Result<(), ConfigError> {
    validate_layout(config)?;
    validate_histogram(&config.histogram)?;
    Ok(())
}

/// Validate the per-round write layout
pub fn validate_layout(config: &BenchConfig) -> Result<(), ConfigError> {
    if config.total_size == 0 {
        return Err(ConfigError::ZeroTotalSize);
    }

    // Overflowing products can never equal the total
    let product = config
        .block_size
        .checked_mul(config.descriptor_count)
        .and_then(|p| p.checked_mul(config.vector_count));

    if product != Some(config.total_size) {
        return Err(ConfigError::SizeProductMismatch {
            block_size: config.block_size,
            descriptor_count: config.descriptor_count,
            vector_count: config.vector_count,
            total_size: config.total_size,
        });
    }

    Ok(())
}

/// Validate histogram bucket layout
pub fn validate_histogram(histogram: &HistogramConfig) -> Result<(), ConfigError> {
    if histogram.step == 0 || histogram.end <= histogram.start || histogram.bucket_count() == 0 {
        return Err(ConfigError::InvalidHistogram {
            start: histogram.start,
            end: histogram.end,
            step: histogram.step,
        });
    }
    Ok(())
}
