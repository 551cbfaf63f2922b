//! Mock batch engine for testing
//!
//! Simulates the submit/reap cycle without any system calls so the round loop
//! can be tested deterministically.
//!
//! # Features
//!
//! - Records the offsets of every submitted batch
//! - Counts completion waits
//! - Enforces the configured in-flight capacity like the real engine
//! - Injects a submission failure, a partial acceptance, a failed wait or a
//!   failed completion on demand
//! - Drains accepted requests on `cleanup()` and counts them
//! - Shares its state between clones, so a test can keep a handle after
//!   moving the engine into the benchmark
//!
//! # Example
//!
//! ```
//! use iosubmit::engine::mock::MockEngine;
//!
//! let engine = MockEngine::new();
//! let probe = engine.clone();
//! engine.fail_submission(2);
//! assert_eq!(probe.submissions().len(), 0);
//! ```

use super::{BatchEngine, Completion, EngineConfig};
use crate::error::SubmitError;
use crate::runner::pool::RequestPool;
use crate::Result;
use anyhow::Context;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockState {
    initialized: bool,
    capacity: usize,
    /// Batch loaded by the last `prepare()`: (user_data, offset, length)
    staged: Vec<(u64, u64, usize)>,
    /// Offsets of every batch accepted so far
    submissions: Vec<Vec<u64>>,
    /// Completed requests waiting to be reaped
    ready: VecDeque<(u64, usize)>,
    submit_calls: usize,
    waits: usize,
    fail_submission_at: Option<usize>,
    /// (call, accepted)
    partial_at: Option<(usize, usize)>,
    fail_wait_at: Option<usize>,
    wait_calls: usize,
    fail_completion_at: Option<usize>,
    drained: usize,
    cleanups: usize,
}

/// Mock batch engine
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Make the `call`-th `submit_batch()` (0-based) fail with EIO
    pub fn fail_submission(&self, call: usize) {
        self.state().fail_submission_at = Some(call);
    }

    /// Make the `call`-th `submit_batch()` accept only `accepted` requests
    pub fn accept_partial(&self, call: usize, accepted: usize) {
        self.state().partial_at = Some((call, accepted));
    }

    /// Make the `call`-th `wait_completion()` (0-based) fail with EINTR
    ///
    /// Nothing is reaped by the failing call; the request stays in flight.
    pub fn fail_wait(&self, call: usize) {
        self.state().fail_wait_at = Some(call);
    }

    /// Make the `wait`-th reaped completion (0-based, across rounds) report EIO
    pub fn fail_completion(&self, wait: usize) {
        self.state().fail_completion_at = Some(wait);
    }

    /// Offsets of each accepted batch, in submission order
    pub fn submissions(&self) -> Vec<Vec<u64>> {
        self.state().submissions.clone()
    }

    /// Number of `submit_batch()` calls, successful or not
    pub fn submit_calls(&self) -> usize {
        self.state().submit_calls
    }

    /// Number of `wait_completion()` calls that returned a completion
    pub fn waits(&self) -> usize {
        self.state().waits
    }

    /// Requests accepted but not yet reaped
    pub fn in_flight(&self) -> usize {
        self.state().ready.len()
    }

    /// Requests reaped by `cleanup()` rather than by the round loop
    pub fn drained(&self) -> usize {
        self.state().drained
    }

    /// Number of `cleanup()` calls that tore down an initialized context
    pub fn cleanups(&self) -> usize {
        self.state().cleanups
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }
}

impl BatchEngine for MockEngine {
    fn init(&mut self, config: &EngineConfig) -> Result<()> {
        let mut state = self.state();
        if state.initialized {
            anyhow::bail!("mock engine already initialized");
        }
        state.initialized = true;
        state.capacity = config.queue_capacity;
        Ok(())
    }

    fn prepare(&mut self, pool: &RequestPool) -> Result<()> {
        let mut state = self.state();
        if !state.ready.is_empty() {
            anyhow::bail!(
                "cannot prepare a new batch with {} requests still in flight",
                state.ready.len()
            );
        }
        state.staged = pool
            .descriptors()
            .iter()
            .enumerate()
            .map(|(i, d)| (i as u64, d.offset(), d.len() as usize))
            .collect();
        Ok(())
    }

    fn submit_batch(&mut self) -> std::result::Result<usize, SubmitError> {
        let mut state = self.state();
        let call = state.submit_calls;
        state.submit_calls += 1;

        if !state.initialized {
            return Err(SubmitError::Rejected(io::Error::from_raw_os_error(libc::EINVAL)));
        }
        if state.fail_submission_at == Some(call) {
            return Err(SubmitError::Rejected(io::Error::from_raw_os_error(libc::EIO)));
        }

        let requested = state.staged.len();
        if requested > state.capacity {
            return Err(SubmitError::OverCapacity {
                requested,
                capacity: state.capacity,
            });
        }

        let accepted = match state.partial_at {
            Some((at, accepted)) if at == call => accepted.min(requested),
            _ => requested,
        };

        let offsets = state.staged[..accepted].iter().map(|&(_, offset, _)| offset).collect();
        state.submissions.push(offsets);
        let staged: Vec<_> = state.staged[..accepted].to_vec();
        state
            .ready
            .extend(staged.into_iter().map(|(data, _, len)| (data, len)));

        if accepted < requested {
            return Err(SubmitError::Partial {
                accepted,
                requested,
            });
        }

        Ok(requested)
    }

    fn wait_completion(&mut self) -> Result<Completion> {
        let mut state = self.state();
        let call = state.wait_calls;
        state.wait_calls += 1;
        if state.fail_wait_at == Some(call) {
            return Err(io::Error::from_raw_os_error(libc::EINTR)).context("io_getevents failed");
        }

        let (user_data, len) = state
            .ready
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no requests in flight to wait for"))?;

        let wait = state.waits;
        state.waits += 1;

        let result = if state.fail_completion_at == Some(wait) {
            Err(anyhow::anyhow!("mock pwritev request {} failed: errno={}", user_data, libc::EIO))
        } else {
            Ok(len)
        };

        Ok(Completion { user_data, result })
    }

    fn cleanup(&mut self) -> Result<()> {
        let mut state = self.state();
        if state.initialized {
            // Accepted requests are reaped, never abandoned
            while state.ready.pop_front().is_some() {
                state.drained += 1;
            }
            state.initialized = false;
            state.cleanups += 1;
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.state().capacity
    }
}
