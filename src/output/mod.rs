//! Result reporting
//!
//! - `text`: human-readable summary on stdout
//! - `json`: machine-readable report file
//!
//! The histogram file itself is written by [`crate::stats::histogram`].

pub mod json;
pub mod text;
