//! Benchmark loop
//!
//! One [`Benchmark`] drives an engine through every round:
//!
//! ```text
//! Idle -> ContextReady -> { Submitting(r) -> Reaping(r) } x rounds -> Drained -> Destroyed
//! ```
//!
//! Only the `submit_batch()` call is timed. After a round's batch is accepted
//! the loop blocks for exactly one completion per descriptor, then (unless
//! rewriting) moves every descriptor to the next `total_size` window. A failed
//! submission or a failed completion wait ends the loop early; samples
//! collected so far are kept, requests still in flight are drained and the
//! context is still destroyed.

pub mod pool;

use crate::config::BenchConfig;
use crate::engine::{BatchEngine, EngineConfig};
use crate::error::SubmitError;
use crate::stats::LatencySamples;
use crate::util::cycles::ClockSource;
use crate::Result;
use anyhow::Context;
use pool::RequestPool;
use std::fmt;
use tracing::{debug, error, trace, warn};

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchState {
    Idle,
    ContextReady,
    Submitting(u64),
    Reaping(u64),
    Drained,
    Destroyed,
}

impl fmt::Display for BenchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchState::Idle => write!(f, "idle"),
            BenchState::ContextReady => write!(f, "context-ready"),
            BenchState::Submitting(round) => write!(f, "submitting[{}]", round),
            BenchState::Reaping(round) => write!(f, "reaping[{}]", round),
            BenchState::Drained => write!(f, "drained"),
            BenchState::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Result of a benchmark run
#[derive(Debug)]
pub struct RunOutcome {
    /// One sample per accepted submission, in round order
    pub samples: LatencySamples,
    pub rounds_requested: u64,
    /// Rounds whose batch was accepted and fully reaped
    pub rounds_completed: u64,
    /// Completion waits performed
    pub waits: u64,
    /// Requests that completed with an error
    pub completion_errors: u64,
    /// Why the loop stopped early at submission, if it did
    pub submit_error: Option<SubmitError>,
    /// Why the loop stopped early while waiting for completions, if it did
    pub reap_error: Option<anyhow::Error>,
    pub clock: ClockSource,
}

impl RunOutcome {
    fn new(rounds: u64, clock: ClockSource) -> Self {
        Self {
            samples: LatencySamples::with_capacity(rounds.min(1 << 20) as usize),
            rounds_requested: rounds,
            rounds_completed: 0,
            waits: 0,
            completion_errors: 0,
            submit_error: None,
            reap_error: None,
            clock,
        }
    }

    /// Whether every requested round ran
    pub fn is_complete(&self) -> bool {
        self.submit_error.is_none()
            && self.reap_error.is_none()
            && self.rounds_completed == self.rounds_requested
    }
}

/// Submission latency benchmark over one engine
pub struct Benchmark<E: BatchEngine> {
    engine: E,
    engine_config: EngineConfig,
    rounds: u64,
    rewrite: bool,
    clock: ClockSource,
    state: BenchState,
}

impl<E: BatchEngine> Benchmark<E> {
    pub fn new(engine: E, config: &BenchConfig) -> Self {
        Self {
            engine,
            engine_config: EngineConfig {
                queue_capacity: config.queue_capacity,
            },
            rounds: config.rounds,
            rewrite: config.rewrite,
            clock: config.clock,
            state: BenchState::Idle,
        }
    }

    pub fn state(&self) -> BenchState {
        self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn transition(&mut self, next: BenchState) {
        trace!(from = %self.state, to = %next, "state");
        self.state = next;
    }

    /// Run every round against `pool`
    ///
    /// The engine context is created here and destroyed before returning, on
    /// success and on every error path.
    pub fn run(&mut self, pool: &mut RequestPool) -> Result<RunOutcome> {
        if self.state != BenchState::Idle {
            anyhow::bail!("benchmark already ran (state: {})", self.state);
        }

        self.engine
            .init(&self.engine_config)
            .context("Failed to create aio context")?;
        self.transition(BenchState::ContextReady);

        let mut outcome = RunOutcome::new(self.rounds, self.clock);
        let result = self.run_rounds(pool, &mut outcome);
        if result.is_ok() {
            self.transition(BenchState::Drained);
        }

        let cleanup = self.engine.cleanup();
        self.transition(BenchState::Destroyed);

        result?;
        cleanup.context("Failed to destroy aio context")?;
        Ok(outcome)
    }

    fn run_rounds(&mut self, pool: &mut RequestPool, outcome: &mut RunOutcome) -> Result<()> {
        let unit = self.clock.unit();

        for round in 0..self.rounds {
            self.transition(BenchState::Submitting(round));
            self.engine.prepare(pool)?;

            debug!(round, "Submit starts");

            let start = self.clock.now();
            let submitted = self.engine.submit_batch();
            let end = self.clock.now();

            if let Err(e) = submitted {
                error!(round, in_flight = e.in_flight(), error = %e, "submit error!");
                outcome.submit_error = Some(e);
                break;
            }

            let latency = end.saturating_sub(start);
            outcome.samples.push(latency);
            debug!(round, latency, unit, "Submit time = {}", latency);

            self.transition(BenchState::Reaping(round));
            if let Err(e) = self.reap_round(pool.len(), outcome) {
                let e = e.context(format!("Failed to reap completion in round {}", round));
                error!(round, error = %format!("{:#}", e), "reap error!");
                outcome.reap_error = Some(e);
                break;
            }
            debug!(round, "Submit reaped");

            outcome.rounds_completed += 1;

            if !self.rewrite {
                pool.advance();
            }
        }

        Ok(())
    }

    /// Wait for one completion per request of the round just submitted
    fn reap_round(&mut self, requests: usize, outcome: &mut RunOutcome) -> Result<()> {
        for _ in 0..requests {
            let completion = self.engine.wait_completion()?;
            outcome.waits += 1;

            if let Err(e) = completion.result {
                outcome.completion_errors += 1;
                warn!(request = completion.user_data, error = %e, "write failed");
            }
        }
        Ok(())
    }
}

/// Run the whole benchmark described by a validated configuration
///
/// Opens the test file, builds the request pool and drives a libaio engine.
/// Resources are released in reverse order of acquisition: engine context,
/// then buffers, then the file.
#[cfg(target_os = "linux")]
pub fn run(config: &BenchConfig) -> Result<RunOutcome> {
    use crate::engine::libaio::LibaioEngine;
    use crate::target::TestFile;

    let file = TestFile::open(&config.test_file, config.direct, config.preallocation_size())?;
    if !file.created() {
        debug!(path = %file.path().display(), "test file exists, not pre-extending");
    }

    let mut pool = RequestPool::build(config, file.fd())?;
    let mut benchmark = Benchmark::new(LibaioEngine::new(), config);

    benchmark.run(&mut pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockEngine;

    fn config(rounds: u64, rewrite: bool) -> BenchConfig {
        BenchConfig {
            block_size: 4096,
            vector_count: 1,
            descriptor_count: 4,
            total_size: 16384,
            rounds,
            rewrite,
            clock: ClockSource::Monotonic,
            ..Default::default()
        }
    }

    fn run_mock(config: &BenchConfig, engine: MockEngine) -> (Result<RunOutcome>, BenchState) {
        let mut pool = RequestPool::build(config, 3).unwrap();
        let mut benchmark = Benchmark::new(engine, config);
        let result = benchmark.run(&mut pool);
        (result, benchmark.state())
    }

    #[test]
    fn test_offsets_advance_each_round() {
        let config = config(10, false);
        let engine = MockEngine::new();
        let probe = engine.clone();

        let (result, state) = run_mock(&config, engine);
        let outcome = result.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.samples.len(), 10);
        assert_eq!(state, BenchState::Destroyed);

        let submissions = probe.submissions();
        assert_eq!(submissions.len(), 10);
        for (round, offsets) in submissions.iter().enumerate() {
            let base = round as u64 * 16384;
            assert_eq!(offsets, &vec![base, base + 4096, base + 8192, base + 12288]);
        }
    }

    #[test]
    fn test_rewrite_keeps_offsets() {
        let config = config(5, true);
        let engine = MockEngine::new();
        let probe = engine.clone();

        let outcome = run_mock(&config, engine).0.unwrap();
        assert_eq!(outcome.rounds_completed, 5);

        for offsets in probe.submissions() {
            assert_eq!(offsets, vec![0, 4096, 8192, 12288]);
        }
    }

    #[test]
    fn test_one_wait_per_descriptor_per_round() {
        let config = config(7, false);
        let engine = MockEngine::new();
        let probe = engine.clone();

        let outcome = run_mock(&config, engine).0.unwrap();
        assert_eq!(outcome.waits, 28);
        assert_eq!(probe.waits(), 28);
        assert_eq!(probe.in_flight(), 0);
    }

    #[test]
    fn test_submit_error_truncates_rounds() {
        let config = config(10, false);
        let engine = MockEngine::new();
        let probe = engine.clone();
        engine.fail_submission(3);

        let (result, state) = run_mock(&config, engine);
        let outcome = result.unwrap();

        assert!(!outcome.is_complete());
        assert!(matches!(outcome.submit_error, Some(SubmitError::Rejected(_))));
        assert_eq!(outcome.samples.len(), 3);
        assert_eq!(outcome.rounds_completed, 3);
        assert_eq!(outcome.waits, 12);
        assert_eq!(probe.submit_calls(), 4);
        assert_eq!(probe.cleanups(), 1);
        assert_eq!(state, BenchState::Destroyed);
    }

    #[test]
    fn test_over_capacity_fails_first_round() {
        let mut config = config(10, false);
        config.queue_capacity = 2;
        let engine = MockEngine::new();
        let probe = engine.clone();

        let outcome = run_mock(&config, engine).0.unwrap();
        assert!(matches!(
            outcome.submit_error,
            Some(SubmitError::OverCapacity { requested: 4, capacity: 2 })
        ));
        assert!(outcome.samples.is_empty());
        assert_eq!(probe.waits(), 0);
        assert_eq!(probe.cleanups(), 1);
    }

    #[test]
    fn test_partial_submit_is_drained() {
        let config = config(10, false);
        let engine = MockEngine::new();
        let probe = engine.clone();
        engine.accept_partial(2, 3);

        let (result, state) = run_mock(&config, engine);
        let outcome = result.unwrap();

        assert!(!outcome.is_complete());
        assert!(matches!(
            outcome.submit_error,
            Some(SubmitError::Partial { accepted: 3, requested: 4 })
        ));
        // Only fully accepted rounds produce a sample
        assert_eq!(outcome.samples.len(), 2);
        assert_eq!(outcome.rounds_completed, 2);
        assert_eq!(outcome.waits, 8);

        assert_eq!(probe.cleanups(), 1);
        assert_eq!(probe.drained(), 3);
        assert_eq!(probe.in_flight(), 0);
        assert_eq!(state, BenchState::Destroyed);
    }

    #[test]
    fn test_failed_wait_keeps_samples() {
        let config = config(10, false);
        let engine = MockEngine::new();
        let probe = engine.clone();
        // First wait of round 3
        engine.fail_wait(12);

        let (result, state) = run_mock(&config, engine);
        let outcome = result.unwrap();

        assert!(!outcome.is_complete());
        assert!(outcome.submit_error.is_none());
        let err = outcome.reap_error.as_ref().unwrap();
        assert!(format!("{:#}", err).contains("Failed to reap completion in round 3"));

        // Round 3 was accepted, so its submission was timed
        assert_eq!(outcome.samples.len(), 4);
        assert_eq!(outcome.rounds_completed, 3);
        assert_eq!(outcome.waits, 12);

        assert_eq!(probe.drained(), 4);
        assert_eq!(probe.in_flight(), 0);
        assert_eq!(probe.cleanups(), 1);
        assert_eq!(state, BenchState::Destroyed);
    }

    #[test]
    fn test_zero_rounds() {
        let config = config(0, false);
        let engine = MockEngine::new();
        let probe = engine.clone();

        let (result, state) = run_mock(&config, engine);
        let outcome = result.unwrap();

        assert!(outcome.is_complete());
        assert!(outcome.samples.is_empty());
        assert_eq!(probe.submit_calls(), 0);
        assert_eq!(probe.cleanups(), 1);
        assert_eq!(state, BenchState::Destroyed);
    }

    #[test]
    fn test_completion_errors_are_counted() {
        let config = config(2, false);
        let engine = MockEngine::new();
        engine.fail_completion(5);

        let outcome = run_mock(&config, engine).0.unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.completion_errors, 1);
        assert_eq!(outcome.samples.len(), 2);
    }

    #[test]
    fn test_run_twice_rejected() {
        let config = config(1, false);
        let mut pool = RequestPool::build(&config, 3).unwrap();
        let mut benchmark = Benchmark::new(MockEngine::new(), &config);

        benchmark.run(&mut pool).unwrap();
        assert!(benchmark.run(&mut pool).is_err());
        assert_eq!(benchmark.engine().cleanups(), 1);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(BenchState::Submitting(3).to_string(), "submitting[3]");
        assert_eq!(BenchState::Destroyed.to_string(), "destroyed");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_end_to_end_fresh_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = config(10, false);
        config.test_file = temp_dir.path().join("e2e.dat");
        // tmpfs has no O_DIRECT
        config.direct = false;

        let outcome = run(&config).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.samples.len(), 10);
        assert_eq!(outcome.waits, 40);
        assert_eq!(outcome.completion_errors, 0);

        let len = std::fs::metadata(&config.test_file).unwrap().len();
        assert!(len >= 163840);
    }
}
