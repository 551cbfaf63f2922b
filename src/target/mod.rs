//! Benchmark target
//!
//! The target is the single file or block device every write in the run lands
//! on. Opening it is the only place the benchmark touches file-system metadata:
//! a fresh file is created and pre-extended, an existing one (including a block
//! device) is reused as-is.

pub mod file;

pub use file::TestFile;

/// Flags used when opening the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    /// Bypass the page cache (O_DIRECT)
    pub direct: bool,
    /// Complete writes only once data is stable (O_DSYNC)
    pub dsync: bool,
    /// Fail if the path already exists (O_CREAT | O_EXCL)
    pub create_new: bool,
}

impl OpenFlags {
    /// Raw flags passed to `open(2)` on top of O_RDWR and the create bits
    pub fn custom_flags(&self) -> libc::c_int {
        let mut flags = 0;
        if self.direct {
            flags |= libc::O_DIRECT;
        }
        if self.dsync {
            flags |= libc::O_DSYNC;
        }
        flags
    }
}
