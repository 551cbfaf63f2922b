//! JSON report output

use crate::config::BenchConfig;
use crate::runner::RunOutcome;
use crate::stats::histogram::{FixedHistogram, HistogramBucket};
use crate::stats::{LatencySamples, LatencySummary};
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Complete run report
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub timestamp: String,
    pub version: &'static str,
    pub config: &'a BenchConfig,
    pub unit: &'static str,
    pub rounds_requested: u64,
    pub rounds_completed: u64,
    pub completion_errors: u64,
    pub submit_error: Option<String>,
    pub reap_error: Option<String>,
    pub summary: LatencySummary,
    pub histogram: Vec<HistogramBucket>,
    pub samples: &'a LatencySamples,
}

impl<'a> JsonReport<'a> {
    pub fn new(config: &'a BenchConfig, outcome: &'a RunOutcome) -> Self {
        let histogram = FixedHistogram::from_samples(config.histogram, outcome.samples.as_slice());

        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION"),
            config,
            unit: outcome.clock.unit(),
            rounds_requested: outcome.rounds_requested,
            rounds_completed: outcome.rounds_completed,
            completion_errors: outcome.completion_errors,
            submit_error: outcome.submit_error.as_ref().map(|e| e.to_string()),
            reap_error: outcome.reap_error.as_ref().map(|e| format!("{:#}", e)),
            summary: outcome.samples.summary(),
            histogram: histogram.buckets(),
            samples: &outcome.samples,
        }
    }
}

/// Write the JSON report to `path`
pub fn write_json_output(path: &Path, config: &BenchConfig, outcome: &RunOutcome) -> Result<()> {
    let report = JsonReport::new(config, outcome);

    let file = File::create(path)
        .with_context(|| format!("Failed to create JSON output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report)
        .with_context(|| format!("Failed to write JSON output: {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write JSON output: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::cycles::ClockSource;
    use tempfile::TempDir;

    #[test]
    fn test_write_json_output() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.json");

        let config = BenchConfig {
            block_size: 4096,
            vector_count: 1,
            descriptor_count: 4,
            total_size: 16384,
            rounds: 3,
            ..Default::default()
        };
        let mut samples = LatencySamples::new();
        samples.push(1000);
        samples.push(250_000);
        samples.push(9_000_000);
        let outcome = RunOutcome {
            samples,
            rounds_requested: 3,
            rounds_completed: 3,
            waits: 12,
            completion_errors: 0,
            submit_error: None,
            reap_error: None,
            clock: ClockSource::Tsc,
        };

        write_json_output(&path, &config, &outcome).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["unit"], "cycles");
        assert_eq!(value["rounds_completed"], 3);
        assert_eq!(value["samples"], serde_json::json!([1000, 250000, 9000000]));
        assert_eq!(value["config"]["total_size"], 16384);
        assert_eq!(value["summary"]["count"], 3);
        assert!(value["submit_error"].is_null());
        assert!(value["reap_error"].is_null());

        let histogram = value["histogram"].as_array().unwrap();
        assert_eq!(histogram.len(), 50);
        assert_eq!(histogram[0]["count"], 1);
        assert_eq!(histogram[2]["count"], 1);
        assert_eq!(histogram[49]["count"], 1);
    }
}
