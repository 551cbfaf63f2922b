//! Batch submission engine abstraction
//!
//! An engine owns the kernel's asynchronous IO context. The benchmark loop
//! drives it through a fixed cycle per round:
//!
//! 1. `prepare()` copies the pool's descriptors into the engine's control
//!    blocks (untimed)
//! 2. `submit_batch()` hands every prepared request to the kernel in one call
//!    (the only timed operation)
//! 3. `wait_completion()` is called once per accepted request
//!
//! # Engine Types
//!
//! - **libaio**: Linux native async IO via raw `io_submit`/`io_getevents`
//!   syscalls (the only real backend)
//! - **mock**: in-memory engine for deterministic tests of the round loop
//!
//! # Example
//!
//! ```
//! use iosubmit::engine::{BatchEngine, EngineConfig};
//! use iosubmit::engine::mock::MockEngine;
//!
//! let mut engine = MockEngine::new();
//! engine.init(&EngineConfig::default()).unwrap();
//! assert_eq!(engine.capacity(), 256);
//! engine.cleanup().unwrap();
//! ```

use crate::error::SubmitError;
use crate::runner::pool::RequestPool;
use crate::Result;

/// Asynchronous batch-write engine
///
/// # Lifecycle
///
/// 1. Create engine instance (via `new()` on concrete type)
/// 2. Call `init()` once
/// 3. Per round: `prepare()`, `submit_batch()`, `wait_completion()` per request
/// 4. Call `cleanup()` once, on every exit path
///
/// # Safety contract
///
/// The pool passed to `prepare()` must stay alive and unmodified until every
/// request submitted from it has been reaped or `cleanup()` has returned.
pub trait BatchEngine {
    /// Create the kernel context with room for `config.queue_capacity` requests
    fn init(&mut self, config: &EngineConfig) -> Result<()>;

    /// Load the pool's current descriptors as the next batch
    fn prepare(&mut self, pool: &RequestPool) -> Result<()>;

    /// Submit the prepared batch in a single call
    ///
    /// Returns the number of requests accepted, which is always the full batch
    /// on success. A partially accepted batch is reported as
    /// [`SubmitError::Partial`]; the accepted part is still in flight.
    fn submit_batch(&mut self) -> std::result::Result<usize, SubmitError>;

    /// Block until one request completes
    fn wait_completion(&mut self) -> Result<Completion>;

    /// Drain anything still in flight and destroy the context
    ///
    /// Calling this more than once, or before `init()`, is a no-op.
    fn cleanup(&mut self) -> Result<()>;

    /// In-flight capacity of the context
    fn capacity(&self) -> usize;
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of requests in flight at once
    ///
    /// Independent of the pool size. A batch larger than this is refused.
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: crate::config::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// One reaped request
#[derive(Debug)]
pub struct Completion {
    /// Index of the descriptor in the pool
    pub user_data: u64,

    /// Bytes written, or the error the request finished with
    pub result: Result<usize>,
}

pub mod mock;

#[cfg(target_os = "linux")]
pub mod libaio;
