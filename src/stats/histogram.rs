//! Fixed-width latency histogram
//!
//! Buckets of width `step` partition `[start, end)`. A sample lands in bucket
//! `(sample - start) / step`; anything whose index would pass the last bucket
//! (every sample at or above `end`) is folded into the last bucket. Samples
//! below `start` go to bucket 0.
//!
//! The text form is one `"<lower_bound>, <count>"` line per bucket in ascending
//! order, which is what the histogram output file contains.

use crate::config::HistogramConfig;
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One bucket of the frequency table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistogramBucket {
    pub lower_bound: u64,
    pub count: u64,
}

/// Fixed-width frequency table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedHistogram {
    config: HistogramConfig,
    counts: Vec<u64>,
}

impl FixedHistogram {
    /// Empty histogram; `config` must have passed validation
    pub fn new(config: HistogramConfig) -> Self {
        Self {
            counts: vec![0; config.bucket_count()],
            config,
        }
    }

    /// Histogram of every sample in `samples`
    pub fn from_samples(config: HistogramConfig, samples: &[u64]) -> Self {
        let mut histogram = Self::new(config);
        for &sample in samples {
            histogram.record(sample);
        }
        histogram
    }

    /// Count one sample
    pub fn record(&mut self, sample: u64) {
        let Some(last) = self.counts.len().checked_sub(1) else {
            return;
        };
        let index = (sample.saturating_sub(self.config.start) / self.config.step.max(1)) as usize;
        self.counts[index.min(last)] += 1;
    }

    /// Buckets in ascending order
    pub fn buckets(&self) -> Vec<HistogramBucket> {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| HistogramBucket {
                lower_bound: self.config.start + i as u64 * self.config.step,
                count,
            })
            .collect()
    }

    /// Sum of all bucket counts
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Write the `"<lower_bound>, <count>"` table
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for bucket in self.buckets() {
            writeln!(writer, "{}, {}", bucket.lower_bound, bucket.count)?;
        }
        Ok(())
    }

    /// Write the table to a new file at `path`
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create histogram file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)
            .and_then(|_| writer.flush())
            .with_context(|| format!("Failed to write histogram file: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_histogram() -> FixedHistogram {
        FixedHistogram::new(HistogramConfig::default())
    }

    #[test]
    fn test_bucket_layout() {
        let buckets = default_histogram().buckets();
        assert_eq!(buckets.len(), 50);
        assert_eq!(buckets[0].lower_bound, 0);
        assert_eq!(buckets[1].lower_bound, 100_000);
        assert_eq!(buckets[49].lower_bound, 4_900_000);
    }

    #[test]
    fn test_zero_sample_in_first_bucket() {
        let mut histogram = default_histogram();
        histogram.record(0);
        assert_eq!(histogram.buckets()[0].count, 1);
    }

    #[test]
    fn test_bucket_edges() {
        let mut histogram = default_histogram();
        histogram.record(99_999);
        histogram.record(100_000);
        histogram.record(4_899_999);
        histogram.record(4_900_000);

        let buckets = histogram.buckets();
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[1].count, 1);
        assert_eq!(buckets[48].count, 1);
        assert_eq!(buckets[49].count, 1);
    }

    #[test]
    fn test_overflow_folds_into_last_bucket() {
        let mut histogram = default_histogram();
        histogram.record(5_000_000);
        histogram.record(5_000_001);
        histogram.record(u64::MAX);

        let buckets = histogram.buckets();
        assert_eq!(buckets[49].count, 3);
        assert_eq!(histogram.total(), 3);
    }

    #[test]
    fn test_total_matches_sample_count() {
        let samples: Vec<u64> = (0..1000).map(|i| i * 7_919).collect();
        let histogram = FixedHistogram::from_samples(HistogramConfig::default(), &samples);
        assert_eq!(histogram.total(), 1000);
    }

    #[test]
    fn test_nonzero_start() {
        let config = HistogramConfig {
            start: 1000,
            end: 2000,
            step: 250,
        };
        let histogram = FixedHistogram::from_samples(config, &[10, 1000, 1250, 1999, 2500]);
        let counts: Vec<u64> = histogram.buckets().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 1, 0, 2]);
        assert_eq!(histogram.buckets()[3].lower_bound, 1750);
    }

    #[test]
    fn test_text_format() {
        let config = HistogramConfig {
            start: 0,
            end: 300,
            step: 100,
        };
        let histogram = FixedHistogram::from_samples(config, &[5, 150, 170, 900]);

        let mut out = Vec::new();
        histogram.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0, 1\n100, 2\n200, 1\n");
    }

    #[test]
    fn test_write_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("hist.txt");

        let histogram = FixedHistogram::from_samples(HistogramConfig::default(), &[1, 2, 3]);
        histogram.write_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 50);
        assert_eq!(lines[0], "0, 3");
        assert_eq!(lines[49], "4900000, 0");
    }
}
