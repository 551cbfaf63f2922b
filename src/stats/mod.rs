//! Latency statistics
//!
//! - [`LatencySamples`]: one counter delta per successfully submitted round,
//!   appended in round order and never modified afterwards
//! - [`LatencySummary`]: min/mean/percentiles computed with HdrHistogram
//! - [`histogram::FixedHistogram`]: the fixed-width frequency table written to
//!   the histogram file
//!
//! # Example
//!
//! ```
//! use iosubmit::stats::LatencySamples;
//!
//! let mut samples = LatencySamples::new();
//! samples.push(1200);
//! samples.push(800);
//!
//! let summary = samples.summary();
//! assert_eq!(summary.count, 2);
//! assert_eq!(summary.min, 800);
//! ```

pub mod histogram;

use hdrhistogram::Histogram;
use serde::Serialize;

/// Submission latencies in round order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LatencySamples {
    samples: Vec<u64>,
}

impl LatencySamples {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for the configured number of rounds
    pub fn with_capacity(rounds: usize) -> Self {
        Self {
            samples: Vec::with_capacity(rounds),
        }
    }

    #[inline]
    pub fn push(&mut self, sample: u64) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.samples
    }

    /// Summary statistics over all samples
    pub fn summary(&self) -> LatencySummary {
        LatencySummary::from_samples(&self.samples)
    }
}

/// Summary of a sample set, in the clock's native unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
}

impl LatencySummary {
    /// Build a summary; an empty sample set yields all zeros
    pub fn from_samples(samples: &[u64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        // Auto-resizing, 3 significant digits; min/max/mean come from the raw
        // samples so they stay exact.
        let mut histogram = Histogram::<u64>::new(3)
            .expect("3 significant digits is a valid histogram precision");
        for &sample in samples {
            // Auto-resize only fails near u64::MAX; saturate instead
            if histogram.record(sample).is_err() {
                let _ = histogram.record(histogram.high());
            }
        }

        let sum: u128 = samples.iter().map(|&s| s as u128).sum();

        Self {
            count: samples.len() as u64,
            min: samples.iter().copied().min().unwrap_or(0),
            max: samples.iter().copied().max().unwrap_or(0),
            mean: sum as f64 / samples.len() as f64,
            p50: histogram.value_at_quantile(0.50),
            p90: histogram.value_at_quantile(0.90),
            p99: histogram.value_at_quantile(0.99),
            p999: histogram.value_at_quantile(0.999),
        }
    }
}
