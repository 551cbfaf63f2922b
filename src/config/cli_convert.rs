//! CLI to configuration conversion and size-string parsing

use super::cli::{ClockArg, Cli, FillArg};
use super::{BenchConfig, FillMode};
use crate::error::SizeParseError;
use crate::util::cycles::ClockSource;
use tracing::warn;

/// Multiplier for a size unit character
fn unit_multiplier(unit: Option<char>) -> u64 {
    match unit {
        Some('k' | 'K') => 1024,
        Some('m' | 'M') => 1024 * 1024,
        Some('g' | 'G') => 1024 * 1024 * 1024,
        _ => 1,
    }
}

/// Parse a size string (e.g., "4k", "2M", "100") strictly
///
/// Format: optional leading whitespace and `+`, decimal digits, then an
/// optional unit. Only the first character after the digits is looked at, so
/// "10kb" is 10 KiB and "10x" is 10.
pub fn parse_size_checked(s: &str) -> Result<u64, SizeParseError> {
    let trimmed = s.trim_start();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, rest) = trimmed.split_at(digits_end);

    if digits.is_empty() {
        return Err(SizeParseError::NoDigits(s.to_string()));
    }

    let num: u64 = digits
        .parse()
        .map_err(|_| SizeParseError::Overflow(s.to_string()))?;

    num.checked_mul(unit_multiplier(rest.chars().next()))
        .ok_or_else(|| SizeParseError::Overflow(s.to_string()))
}

/// Parse a size string, yielding 0 when it is malformed
pub fn parse_size(s: &str) -> u64 {
    parse_size_checked(s).unwrap_or(0)
}

/// Lenient parse of a size flag; malformed input becomes 0 with a warning
fn size_arg(flag: &str, value: &str) -> u64 {
    match parse_size_checked(value) {
        Ok(size) => size,
        Err(e) => {
            warn!(flag, error = %e, "treating malformed size as 0");
            0
        }
    }
}

/// Convert CLI ClockArg to ClockSource
pub fn convert_clock(arg: ClockArg) -> ClockSource {
    match arg {
        ClockArg::Tsc => ClockSource::Tsc,
        ClockArg::Monotonic => ClockSource::Monotonic,
    }
}

/// Convert CLI FillArg to FillMode
pub fn convert_fill(arg: FillArg) -> FillMode {
    match arg {
        FillArg::Filler => FillMode::Filler,
        FillArg::Random => FillMode::Random,
    }
}

/// Apply the flags given on the command line on top of `base`
pub fn apply_cli(cli: &Cli, mut config: BenchConfig) -> BenchConfig {
    if let Some(ref value) = cli.block_size {
        config.block_size = size_arg("blocksize", value);
    }
    if let Some(ref value) = cli.total_size {
        config.total_size = size_arg("totalsize", value);
    }
    if let Some(ref value) = cli.rounds {
        config.rounds = size_arg("number", value);
    }
    if let Some(ref value) = cli.descriptor_count {
        config.descriptor_count = size_arg("iocbsnum", value);
    }
    if let Some(ref value) = cli.vector_count {
        config.vector_count = size_arg("vectornum", value);
    }
    if let Some(ref value) = cli.queue_capacity {
        config.queue_capacity = size_arg("queue-capacity", value) as usize;
    }
    if let Some(ref path) = cli.test_file {
        config.test_file = path.clone();
    }
    if let Some(ref path) = cli.histogram {
        config.histogram_path = Some(path.clone());
    }
    if let Some(ref path) = cli.output {
        config.output_path = Some(path.clone());
    }
    if let Some(ref fill) = cli.fill {
        config.filler = fill.bytes().next().unwrap_or(0);
    }
    if let Some(pattern) = cli.fill_pattern {
        config.fill_pattern = convert_fill(pattern);
    }
    if let Some(clock) = cli.clock {
        config.clock = convert_clock(clock);
    }
    if cli.rewrite {
        config.rewrite = true;
    }
    if cli.verbose {
        config.verbose = true;
    }
    if cli.buffered {
        config.direct = false;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("100"), 100);
        assert_eq!(parse_size("1k"), 1024);
        assert_eq!(parse_size("1K"), 1024);
        assert_eq!(parse_size("2M"), 2 * 1024 * 1024);
        assert_eq!(parse_size("2m"), 2_097_152);
        assert_eq!(parse_size("3g"), 3 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("3G"), 3_221_225_472);
    }

    #[test]
    fn test_parse_size_malformed_is_zero() {
        assert_eq!(parse_size("abc"), 0);
        assert_eq!(parse_size(""), 0);
        assert_eq!(parse_size("k"), 0);
        assert_eq!(parse_size("-5"), 0);
        assert_eq!(parse_size("99999999999999999999999"), 0);
    }

    #[test]
    fn test_parse_size_only_first_suffix_char() {
        assert_eq!(parse_size("10kb"), 10240);
        assert_eq!(parse_size("10x"), 10);
        assert_eq!(parse_size("  +8k"), 8192);
    }

    #[test]
    fn test_parse_size_checked_errors() {
        assert_eq!(
            parse_size_checked("abc"),
            Err(SizeParseError::NoDigits("abc".to_string()))
        );
        assert_eq!(
            parse_size_checked("17179869184g"),
            Err(SizeParseError::Overflow("17179869184g".to_string()))
        );
        assert_eq!(parse_size_checked("4k"), Ok(4096));
    }

    #[test]
    fn test_apply_cli_overrides() {
        let cli = Cli {
            block_size: Some("4k".to_string()),
            total_size: Some("16k".to_string()),
            rounds: Some("10".to_string()),
            descriptor_count: Some("4".to_string()),
            vector_count: Some("1".to_string()),
            test_file: Some(PathBuf::from("/dev/null")),
            fill: Some("xyz".to_string()),
            clock: Some(ClockArg::Monotonic),
            rewrite: true,
            buffered: true,
            ..Default::default()
        };

        let config = apply_cli(&cli, BenchConfig::default());
        assert_eq!(config.block_size, 4096);
        assert_eq!(config.total_size, 16384);
        assert_eq!(config.rounds, 10);
        assert_eq!(config.descriptor_count, 4);
        assert_eq!(config.vector_count, 1);
        assert_eq!(config.test_file, PathBuf::from("/dev/null"));
        assert_eq!(config.filler, b'x');
        assert_eq!(config.clock, ClockSource::Monotonic);
        assert!(config.rewrite);
        assert!(!config.direct);
        assert!(!config.verbose);
    }

    #[test]
    fn test_apply_cli_keeps_base_values() {
        let base = BenchConfig {
            block_size: 512,
            rounds: 3,
            queue_capacity: 64,
            ..Default::default()
        };
        let cli = Cli {
            rounds: Some("5".to_string()),
            ..Default::default()
        };

        let config = apply_cli(&cli, base);
        assert_eq!(config.block_size, 512);
        assert_eq!(config.rounds, 5);
        assert_eq!(config.queue_capacity, 64);
        assert!(config.direct);
    }

    #[test]
    fn test_apply_cli_malformed_size() {
        let cli = Cli {
            total_size: Some("lots".to_string()),
            ..Default::default()
        };
        let config = apply_cli(&cli, BenchConfig::default());
        assert_eq!(config.total_size, 0);
    }
}
