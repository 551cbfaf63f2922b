//! Test file open policy
//!
//! - A path that does not exist yet is created (mode 0700) with O_DIRECT and
//!   pre-extended with `posix_fallocate` to hold every round, so no timed write
//!   ever extends the file.
//! - A path that already exists is assumed to be pre-sized. It is reopened with
//!   O_DIRECT | O_DSYNC and never extended.

use super::OpenFlags;
use crate::Result;
use anyhow::Context;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::{OpenOptionsExt, FileTypeExt};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Open handle on the benchmark target
#[derive(Debug)]
pub struct TestFile {
    file: File,
    path: PathBuf,
    created: bool,
    flags: OpenFlags,
}

impl TestFile {
    /// Open `path`, creating and pre-extending it to `prealloc_bytes` if it is new
    ///
    /// `direct` controls O_DIRECT; it is only turned off for filesystems that
    /// reject direct IO.
    pub fn open(path: &Path, direct: bool, prealloc_bytes: u64) -> Result<Self> {
        let create_flags = OpenFlags {
            direct,
            dsync: false,
            create_new: true,
        };

        match open_with(path, create_flags) {
            Ok(file) => {
                let test_file = Self {
                    file,
                    path: path.to_path_buf(),
                    created: true,
                    flags: create_flags,
                };
                test_file.preallocate(prealloc_bytes)?;
                debug!(
                    path = %path.display(),
                    bytes = prealloc_bytes,
                    "created test file"
                );
                Ok(test_file)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let reopen_flags = OpenFlags {
                    direct,
                    dsync: true,
                    create_new: false,
                };
                let file = open_with(path, reopen_flags).with_context(|| {
                    format!("Failed to reopen existing test file: {}", path.display())
                })?;
                debug!(path = %path.display(), "reusing existing test file");
                Ok(Self {
                    file,
                    path: path.to_path_buf(),
                    created: false,
                    flags: reopen_flags,
                })
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to create test file: {}", path.display())),
        }
    }

    /// Reserve `[0, len)` on disk
    fn preallocate(&self, len: u64) -> Result<()> {
        if len == 0 {
            return Ok(());
        }

        let fd = self.file.as_raw_fd();
        // posix_fallocate returns the error number instead of setting errno
        let result = unsafe { libc::posix_fallocate(fd, 0, len as libc::off_t) };
        if result != 0 {
            let err = io::Error::from_raw_os_error(result);
            return Err(err).with_context(|| {
                format!(
                    "posix_fallocate failed: path={}, size={}",
                    self.path.display(),
                    len
                )
            });
        }

        Ok(())
    }

    pub fn fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this run created the file
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// Whether the target is a block device
    pub fn is_block_device(&self) -> Result<bool> {
        let metadata = self
            .file
            .metadata()
            .with_context(|| format!("Failed to stat test file: {}", self.path.display()))?;
        Ok(metadata.file_type().is_block_device())
    }

    /// Current length in bytes (0 for block devices)
    pub fn len(&self) -> Result<u64> {
        let metadata = self
            .file
            .metadata()
            .with_context(|| format!("Failed to stat test file: {}", self.path.display()))?;
        Ok(metadata.len())
    }
}

fn open_with(path: &Path, flags: OpenFlags) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true);

    if flags.create_new {
        options.create_new(true).mode(0o700);
    }

    let custom_flags = flags.custom_flags();
    if custom_flags != 0 {
        options.custom_flags(custom_flags);
    }

    options.open(path)
}
