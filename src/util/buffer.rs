//! Page-aligned write buffers
//!
//! Every (descriptor, vector slot) pair owns exactly one [`AlignedBuffer`].
//! Buffers are allocated and filled once before the round loop and never
//! resized or shared; they are freed when the request pool is dropped.

use crate::Result;
use rand::RngCore;
use std::alloc::{alloc, dealloc, Layout};
use std::ptr;

/// Buffer content written to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPattern {
    /// Every byte set to the given value
    Byte(u8),
    /// Bytes from the thread-local RNG
    Random,
}

/// Memory-aligned buffer suitable for O_DIRECT operations
pub struct AlignedBuffer {
    ptr: *mut u8,
    size: usize,
    alignment: usize,
    layout: Layout,
}

impl AlignedBuffer {
    /// Allocate `size` bytes aligned to `alignment` (a power of two)
    pub fn new(size: usize, alignment: usize) -> Result<Self> {
        if !alignment.is_power_of_two() {
            anyhow::bail!("buffer alignment {} is not a power of 2", alignment);
        }
        if size == 0 {
            anyhow::bail!("buffer size must be greater than 0");
        }

        let layout = Layout::from_size_align(size, alignment).map_err(|e| {
            anyhow::anyhow!("invalid buffer layout size={} align={}: {}", size, alignment, e)
        })?;

        let ptr = unsafe { alloc(layout) };
        if ptr.is_null() {
            anyhow::bail!("failed to allocate {} byte buffer aligned to {}", size, alignment);
        }

        // Contents are irrelevant to the benchmark, but never hand the kernel
        // uninitialized memory.
        unsafe { ptr::write_bytes(ptr, 0, size) };

        Ok(AlignedBuffer {
            ptr,
            size,
            alignment,
            layout,
        })
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.size) }
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.size) }
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline(always)]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    #[inline(always)]
    pub fn is_aligned(&self) -> bool {
        (self.ptr as usize) % self.alignment == 0
    }

    /// Overwrite the whole buffer with `pattern`
    pub fn fill(&mut self, pattern: FillPattern) {
        match pattern {
            FillPattern::Byte(value) => {
                unsafe { ptr::write_bytes(self.ptr, value, self.size) };
            }
            FillPattern::Random => {
                rand::thread_rng().fill_bytes(self.as_mut_slice());
            }
        }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        unsafe {
            dealloc(self.ptr, self.layout);
        }
    }
}

// AlignedBuffer is Send because it owns its memory
unsafe impl Send for AlignedBuffer {}
