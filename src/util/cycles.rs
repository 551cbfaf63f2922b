//! Submission timestamps
//!
//! Latency samples are raw counter deltas. On x86_64 the default source is the
//! CPU timestamp counter, read with `rdtsc` around the submit call; elsewhere
//! (or on request) it is `CLOCK_MONOTONIC` in nanoseconds via a direct
//! `clock_gettime` call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where timestamps come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    /// CPU timestamp counter (cycles)
    Tsc,
    /// CLOCK_MONOTONIC (nanoseconds)
    Monotonic,
}

impl Default for ClockSource {
    fn default() -> Self {
        if cfg!(target_arch = "x86_64") {
            ClockSource::Tsc
        } else {
            ClockSource::Monotonic
        }
    }
}

impl ClockSource {
    /// Read the current counter value
    #[inline(always)]
    pub fn now(self) -> u64 {
        match self {
            ClockSource::Tsc => read_tsc(),
            ClockSource::Monotonic => monotonic_nanos(),
        }
    }

    /// Unit of the values returned by [`ClockSource::now`]
    pub fn unit(self) -> &'static str {
        match self {
            ClockSource::Tsc => "cycles",
            ClockSource::Monotonic => "ns",
        }
    }
}

impl fmt::Display for ClockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockSource::Tsc => write!(f, "tsc"),
            ClockSource::Monotonic => write!(f, "monotonic"),
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn read_tsc() -> u64 {
    // SAFETY: RDTSC is available on every x86_64 CPU and only reads a counter.
    unsafe { core::arch::x86_64::_rdtsc() }
}

// No portable cycle counter; fall back to the monotonic clock.
#[cfg(not(target_arch = "x86_64"))]
#[inline(always)]
fn read_tsc() -> u64 {
    monotonic_nanos()
}

#[inline(always)]
fn monotonic_nanos() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };

    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }

    (ts.tv_sec as u64) * 1_000_000_000 + (ts.tv_nsec as u64)
}
