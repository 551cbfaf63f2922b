//! Utility modules

pub mod buffer;
pub mod cycles;
