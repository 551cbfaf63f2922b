//! Request pool
//!
//! The pool is the fixed set of vectored writes submitted as one batch every
//! round. Descriptor `i` starts at `i * (total_size / descriptor_count)` and
//! carries `vector_count` page-aligned buffers of `block_size` bytes, so one
//! round covers `[base, base + total_size)` contiguously.
//!
//! Descriptors are built once. Between rounds only their offset changes, and
//! only after every completion of the previous round has been reaped.

use crate::config::{BenchConfig, FillMode, BUFFER_ALIGNMENT};
use crate::util::buffer::{AlignedBuffer, FillPattern};
use crate::Result;
use anyhow::Context;
use std::os::unix::io::RawFd;

/// One asynchronous vectored write
pub struct WriteDescriptor {
    fd: RawFd,
    offset: u64,
    buffers: Vec<AlignedBuffer>,
    /// Points into `buffers`; the heap allocations never move
    iovecs: Vec<libc::iovec>,
}

impl WriteDescriptor {
    fn new(fd: RawFd, offset: u64, mut buffers: Vec<AlignedBuffer>) -> Self {
        let iovecs = buffers
            .iter_mut()
            .map(|buffer| libc::iovec {
                iov_base: buffer.as_mut_ptr() as *mut libc::c_void,
                iov_len: buffer.size(),
            })
            .collect();

        Self {
            fd,
            offset,
            buffers,
            iovecs,
        }
    }

    #[inline]
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn buffers(&self) -> &[AlignedBuffer] {
        &self.buffers
    }

    /// iovec array handed to the kernel
    #[inline]
    pub fn iovecs(&self) -> &[libc::iovec] {
        &self.iovecs
    }

    /// Bytes written by this descriptor
    pub fn len(&self) -> u64 {
        self.iovecs.iter().map(|v| v.iov_len as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered set of write descriptors covering one round
pub struct RequestPool {
    descriptors: Vec<WriteDescriptor>,
    bytes_per_round: u64,
}

impl RequestPool {
    /// Allocate and fill every buffer for a validated configuration
    pub fn build(config: &BenchConfig, fd: RawFd) -> Result<Self> {
        let block_size = usize::try_from(config.block_size)
            .context("block size does not fit in memory")?;
        let stride = config.descriptor_stride();
        let pattern = match config.fill_pattern {
            FillMode::Filler => FillPattern::Byte(config.filler),
            FillMode::Random => FillPattern::Random,
        };

        let mut descriptors = Vec::with_capacity(config.descriptor_count as usize);
        for i in 0..config.descriptor_count {
            let mut buffers = Vec::with_capacity(config.vector_count as usize);
            for j in 0..config.vector_count {
                let mut buffer = AlignedBuffer::new(block_size, BUFFER_ALIGNMENT)
                    .with_context(|| format!("Failed to allocate buffer {} of descriptor {}", j, i))?;
                buffer.fill(pattern);
                buffers.push(buffer);
            }
            descriptors.push(WriteDescriptor::new(fd, i * stride, buffers));
        }

        Ok(Self {
            descriptors,
            bytes_per_round: config.total_size,
        })
    }

    pub fn descriptors(&self) -> &[WriteDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Bytes covered by one submission of the whole pool
    pub fn bytes_per_round(&self) -> u64 {
        self.bytes_per_round
    }

    /// Current descriptor offsets in pool order
    pub fn offsets(&self) -> Vec<u64> {
        self.descriptors.iter().map(|d| d.offset).collect()
    }

    /// Move every descriptor to the region right after the current round
    ///
    /// Must only be called when none of the descriptors is in flight.
    pub fn advance(&mut self) {
        let delta = self.bytes_per_round;
        for descriptor in &mut self.descriptors {
            descriptor.offset += delta;
        }
    }
}
