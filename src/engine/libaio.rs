//! libaio batch engine
//!
//! Drives Linux native asynchronous IO through raw syscalls (`io_setup`,
//! `io_submit`, `io_getevents`, `io_destroy`) via libc, without linking the
//! LGPL libaio library.
//!
//! Each pool descriptor maps to one `IOCB_CMD_PWRITEV` control block whose
//! buffer field points at the descriptor's iovec array. The control blocks and
//! the pointer array handed to `io_submit` are allocated once and rewritten in
//! place by `prepare()`, so a round allocates nothing.
//!
//! # Requirements
//!
//! - Linux kernel with AIO support (`fs.aio-max-nr` large enough for the
//!   requested capacity)
//! - O_DIRECT on the target, otherwise the kernel completes writes
//!   synchronously inside `io_submit`

use super::{BatchEngine, Completion, EngineConfig};
use crate::error::SubmitError;
use crate::runner::pool::RequestPool;
use crate::Result;
use anyhow::Context;
use std::io;
use std::ptr;
use tracing::{debug, trace};

type AioContext = libc::c_ulong;

const IOCB_CMD_PWRITEV: u16 = 8;

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct IoControlBlock {
    data: u64,           // User data (aio_data)
    key: u32,            // Key (aio_key), filled by the kernel
    aio_rw_flags: u32,   // RWF_* flags
    lio_opcode: u16,     // Operation code
    aio_reqprio: i16,    // Request priority
    aio_fildes: u32,     // File descriptor
    buf: u64,            // iovec array for vectored ops
    nbytes: u64,         // iovec count for vectored ops
    offset: i64,         // File offset
    aio_reserved2: u64,  // Reserved
    flags: u32,          // IOCB_FLAG_* flags
    aio_resfd: u32,      // Eventfd for notification
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct IoEvent {
    data: u64,   // User data from iocb
    obj: u64,    // Pointer to iocb
    res: i64,    // Result (bytes transferred or -errno)
    res2: i64,   // Secondary result
}

unsafe fn io_setup(maxevents: libc::c_long, ctxp: *mut AioContext) -> libc::c_long {
    libc::syscall(libc::SYS_io_setup, maxevents, ctxp)
}

unsafe fn io_destroy(ctx: AioContext) -> libc::c_long {
    libc::syscall(libc::SYS_io_destroy, ctx)
}

unsafe fn io_submit(ctx: AioContext, nr: libc::c_long, iocbpp: *mut *mut IoControlBlock) -> libc::c_long {
    libc::syscall(libc::SYS_io_submit, ctx, nr, iocbpp)
}

unsafe fn io_getevents(
    ctx: AioContext,
    min_nr: libc::c_long,
    nr: libc::c_long,
    events: *mut IoEvent,
    timeout: *mut libc::timespec,
) -> libc::c_long {
    libc::syscall(libc::SYS_io_getevents, ctx, min_nr, nr, events, timeout)
}

/// Repeat a blocking syscall until it is not interrupted by a signal
fn retry_interrupted<F>(mut call: F) -> io::Result<libc::c_long>
where
    F: FnMut() -> io::Result<libc::c_long>,
{
    loop {
        match call() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                trace!("syscall interrupted, retrying");
            }
            other => return other,
        }
    }
}

/// libaio batch engine
pub struct LibaioEngine {
    ctx: Option<AioContext>,
    capacity: usize,

    /// One control block per pool descriptor
    iocbs: Vec<IoControlBlock>,

    /// Pointers into `iocbs`, the array `io_submit` consumes
    iocb_ptrs: Vec<*mut IoControlBlock>,

    /// Requests submitted and not yet reaped
    in_flight: usize,
}

impl LibaioEngine {
    pub fn new() -> Self {
        Self {
            ctx: None,
            capacity: 0,
            iocbs: Vec::new(),
            iocb_ptrs: Vec::new(),
            in_flight: 0,
        }
    }

    /// Requests submitted and not yet reaped
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn context(&self) -> Result<AioContext> {
        self.ctx.context("libaio engine not initialized")
    }
}

impl Default for LibaioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchEngine for LibaioEngine {
    fn init(&mut self, config: &EngineConfig) -> Result<()> {
        if self.ctx.is_some() {
            anyhow::bail!("libaio engine already initialized");
        }

        // The context handle must be zero on entry
        let mut ctx: AioContext = 0;
        let result = unsafe { io_setup(config.queue_capacity as libc::c_long, &mut ctx) };

        if result < 0 {
            let err = io::Error::last_os_error();
            return Err(err).context(format!(
                "io_setup failed with queue_capacity={}",
                config.queue_capacity
            ));
        }

        debug!(capacity = config.queue_capacity, "aio context ready");
        self.ctx = Some(ctx);
        self.capacity = config.queue_capacity;
        self.in_flight = 0;

        Ok(())
    }

    fn prepare(&mut self, pool: &RequestPool) -> Result<()> {
        if self.in_flight != 0 {
            anyhow::bail!(
                "cannot prepare a new batch with {} requests still in flight",
                self.in_flight
            );
        }

        let descriptors = pool.descriptors();
        if self.iocbs.len() != descriptors.len() {
            self.iocbs = vec![IoControlBlock::default(); descriptors.len()];
            self.iocb_ptrs = self
                .iocbs
                .iter_mut()
                .map(|iocb| iocb as *mut IoControlBlock)
                .collect();
        }

        for (i, (iocb, descriptor)) in self.iocbs.iter_mut().zip(descriptors).enumerate() {
            let iovecs = descriptor.iovecs();
            *iocb = IoControlBlock {
                data: i as u64,
                lio_opcode: IOCB_CMD_PWRITEV,
                aio_fildes: descriptor.fd() as u32,
                buf: iovecs.as_ptr() as u64,
                nbytes: iovecs.len() as u64,
                offset: descriptor.offset() as i64,
                ..IoControlBlock::default()
            };
        }

        Ok(())
    }

    #[inline]
    fn submit_batch(&mut self) -> std::result::Result<usize, SubmitError> {
        let requested = self.iocb_ptrs.len();
        let ctx = match self.ctx {
            Some(ctx) => ctx,
            None => {
                return Err(SubmitError::Rejected(io::Error::from_raw_os_error(libc::EINVAL)))
            }
        };

        // The kernel silently truncates batches to the context size; refuse
        // them up front so an undersized context always shows up as an error.
        if requested > self.capacity {
            return Err(SubmitError::OverCapacity {
                requested,
                capacity: self.capacity,
            });
        }

        let result = unsafe {
            io_submit(ctx, requested as libc::c_long, self.iocb_ptrs.as_mut_ptr())
        };

        if result < 0 {
            return Err(SubmitError::Rejected(io::Error::last_os_error()));
        }

        let accepted = result as usize;
        self.in_flight += accepted;

        if accepted < requested {
            return Err(SubmitError::Partial {
                accepted,
                requested,
            });
        }

        Ok(accepted)
    }

    fn wait_completion(&mut self) -> Result<Completion> {
        let ctx = self.context()?;
        if self.in_flight == 0 {
            anyhow::bail!("no requests in flight to wait for");
        }

        let mut event = IoEvent::default();
        let result = retry_interrupted(|| {
            let ret = unsafe { io_getevents(ctx, 1, 1, &mut event, ptr::null_mut()) };
            if ret < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(ret)
            }
        })
        .context("io_getevents failed")?;

        if result == 0 {
            anyhow::bail!("io_getevents returned no event without a timeout");
        }

        self.in_flight -= 1;

        let result = if event.res >= 0 {
            Ok(event.res as usize)
        } else {
            // Negative result is -errno
            let errno = (-event.res) as i32;
            Err(io::Error::from_raw_os_error(errno))
                .context(format!("pwritev request {} failed: errno={}", event.data, errno))
        };

        Ok(Completion {
            user_data: event.data,
            result,
        })
    }

    fn cleanup(&mut self) -> Result<()> {
        if let Some(ctx) = self.ctx {
            // Buffers must outlive every accepted request
            while self.in_flight > 0 {
                if self.wait_completion().is_err() {
                    break;
                }
            }

            let result = unsafe { io_destroy(ctx) };
            self.ctx = None;
            self.in_flight = 0;

            if result < 0 {
                let err = io::Error::last_os_error();
                return Err(err).context("io_destroy failed");
            }
            debug!("aio context destroyed");
        }

        Ok(())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for LibaioEngine {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
