//! iosubmit CLI entry point

use anyhow::{Context, Result};
use iosubmit::config::{cli::Cli, cli_convert, toml, validator, BenchConfig};
use iosubmit::output::{json, text};
use iosubmit::runner::RunOutcome;
use iosubmit::stats::histogram::FixedHistogram;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let base = match cli.config {
        Some(ref path) => toml::parse_toml_file(path)?,
        None => BenchConfig::default(),
    };

    init_logging(cli.verbose || base.verbose);

    let config = cli_convert::apply_cli(&cli, base);

    // Reject bad layouts before touching the file system or allocating buffers
    validator::validate_config(&config).context("Configuration validation failed")?;

    println!("iosubmit v{}", env!("CARGO_PKG_VERSION"));
    println!("{}", config);

    if cli.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    println!();
    let outcome = run_benchmark(&config)?;

    if let Some(ref path) = config.histogram_path {
        FixedHistogram::from_samples(config.histogram, outcome.samples.as_slice())
            .write_file(path)?;
        info!(path = %path.display(), "histogram written");
    }

    if let Some(ref path) = config.output_path {
        json::write_json_output(path, &config, &outcome)?;
        info!(path = %path.display(), "JSON report written");
    }

    text::print_results(&outcome);

    Ok(())
}

#[cfg(target_os = "linux")]
fn run_benchmark(config: &BenchConfig) -> Result<RunOutcome> {
    iosubmit::runner::run(config)
}

#[cfg(not(target_os = "linux"))]
fn run_benchmark(_config: &BenchConfig) -> Result<RunOutcome> {
    anyhow::bail!("the libaio engine is only available on Linux")
}

/// Install the stderr diagnostic subscriber
///
/// Verbose runs log per-round progress at debug level; otherwise `RUST_LOG`
/// decides, defaulting to warnings and errors only.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
