//! Async disk gateway (C3): one `io_uring` instance per scheduler worker,
//! realizing the source's `struct iocb` + Linux AIO callback model.
//!
//! `commit_*` issues a blocking vectored syscall inline — the direct
//! (`O_DIRECT`, sector-aligned) fast path, safe because each worker owns
//! its OS thread. `submit_*` queues a request on the ring and parks the
//! calling task at a named yield point; `this_worker_gateway` registers
//! `reap_completions` as that worker's idle-pass hook on first use, so
//! the worker loop drains completions and resumes tagged tasks exactly
//! once per completion, preserving I4.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::os::unix::io::RawFd;

use io_uring::{opcode, types, IoUring};
use sdfs_buf::{IoSlice, IoSliceMut};
use sdfs_dtyp::{Result, SdfsError};
use sdfs_scheduler::{yield_point, ResumeHandle};

/// Not `Send`/`Sync`: a gateway is created and used entirely on the
/// scheduler worker thread that owns it.
pub struct Gateway {
    ring: RefCell<IoUring>,
    pending: RefCell<HashMap<u64, ResumeHandle>>,
    next_tag: Cell<u64>,
}

impl Gateway {
    pub fn new(queue_depth: u32) -> Result<Self> {
        let ring = IoUring::new(queue_depth)
            .map_err(|e| SdfsError::io(e.raw_os_error().unwrap_or(libc::EIO), "io_uring setup"))?;
        Ok(Self {
            ring: RefCell::new(ring),
            pending: RefCell::new(HashMap::new()),
            next_tag: Cell::new(0),
        })
    }

    fn alloc_tag(&self) -> u64 {
        let tag = self.next_tag.get();
        self.next_tag.set(tag.wrapping_add(1));
        tag
    }

    fn to_raw_iovecs(iov: &[IoSlice<'_>]) -> Vec<libc::iovec> {
        iov.iter()
            .map(|s| libc::iovec {
                iov_base: s.base.as_ptr() as *mut libc::c_void,
                iov_len: s.len(),
            })
            .collect()
    }

    /// Inline, synchronous `pwritev` for the direct (`O_DIRECT`) fast path.
    pub fn commit_pwritev(&self, fd: RawFd, iov: &[IoSlice<'_>], offset: u64) -> Result<u32> {
        let raw = Self::to_raw_iovecs(iov);
        let ret = unsafe { libc::pwritev(fd, raw.as_ptr(), raw.len() as i32, offset as i64) };
        if ret < 0 {
            let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(libc::EIO);
            return Err(SdfsError::io(errno, "pwritev failed"));
        }
        Ok(ret as u32)
    }

    fn to_raw_iovecs_mut(iov: &mut [IoSliceMut<'_>]) -> Vec<libc::iovec> {
        iov.iter_mut()
            .map(|s| libc::iovec {
                iov_base: s.base.as_mut_ptr() as *mut libc::c_void,
                iov_len: s.len(),
            })
            .collect()
    }

    /// Inline, synchronous `preadv` for the direct fast path.
    pub fn commit_preadv(&self, fd: RawFd, iov: &mut [IoSliceMut<'_>], offset: u64) -> Result<u32> {
        let mut raw = Self::to_raw_iovecs_mut(iov);
        let ret = unsafe { libc::preadv(fd, raw.as_mut_ptr(), raw.len() as i32, offset as i64) };
        if ret < 0 {
            let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(libc::EIO);
            return Err(SdfsError::io(errno, "preadv failed"));
        }
        Ok(ret as u32)
    }

    /// Queues a vectored write on the ring and parks the caller until the
    /// completion is reaped. `iov` must stay alive for the whole call,
    /// which it does by virtue of being a local held across the `.await`.
    pub async fn submit_pwritev(&self, fd: RawFd, iov: &[IoSlice<'_>], offset: u64) -> Result<u32> {
        let raw = Self::to_raw_iovecs(iov);
        let tag = self.alloc_tag();
        let (handle, park) = yield_point("gateway_pwritev");
        self.pending.borrow_mut().insert(tag, handle);

        let entry = opcode::Writev::new(types::Fd(fd), raw.as_ptr(), raw.len() as u32)
            .offset(offset)
            .build()
            .user_data(tag);
        self.push_and_submit(entry, tag)?;

        let value = park.with_timeout(None).await?;
        Ok(value as u32)
    }

    /// Queues a vectored read on the ring and parks the caller.
    pub async fn submit_preadv(
        &self,
        fd: RawFd,
        iov: &mut [IoSliceMut<'_>],
        offset: u64,
    ) -> Result<u32> {
        let mut raw = Self::to_raw_iovecs_mut(iov);
        let tag = self.alloc_tag();
        let (handle, park) = yield_point("gateway_preadv");
        self.pending.borrow_mut().insert(tag, handle);

        let entry = opcode::Readv::new(types::Fd(fd), raw.as_mut_ptr(), raw.len() as u32)
            .offset(offset)
            .build()
            .user_data(tag);
        self.push_and_submit(entry, tag)?;

        let value = park.with_timeout(None).await?;
        Ok(value as u32)
    }

    fn push_and_submit(&self, entry: io_uring::squeue::Entry, tag: u64) -> Result<()> {
        let mut ring = self.ring.borrow_mut();
        unsafe {
            ring.submission().push(&entry).map_err(|_| {
                self.pending.borrow_mut().remove(&tag);
                SdfsError::Busy("io_uring submission queue full".into())
            })?;
        }
        ring.submit()
            .map_err(|e| SdfsError::io(e.raw_os_error().unwrap_or(libc::EIO), "io_uring submit"))?;
        Ok(())
    }

    /// Drains completed entries and resumes their tagged tasks. Called
    /// from the worker's idle pass (design §4.4 worker loop).
    pub fn reap_completions(&self) {
        let completed: Vec<(u64, i32)> = {
            let mut ring = self.ring.borrow_mut();
            ring.completion().map(|cqe| (cqe.user_data(), cqe.result())).collect()
        };
        for (tag, result) in completed {
            if let Some(handle) = self.pending.borrow_mut().remove(&tag) {
                if let Err(e) = handle.resume(result as i64) {
                    log::error!("gateway completion resume failed for tag {tag}: {e}");
                }
            }
        }
    }
}

thread_local! {
    static GATEWAY: RefCell<Option<std::rc::Rc<Gateway>>> = const { RefCell::new(None) };
}

/// Returns this worker thread's [`Gateway`], creating it with
/// `queue_depth` on first use. Each worker thread owns exactly one ring;
/// the returned `Rc` lets callers `.await` gateway methods without holding
/// the thread-local's `RefCell` borrow across the await point.
pub fn this_worker_gateway(queue_depth: u32) -> Result<std::rc::Rc<Gateway>> {
    GATEWAY.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            let gw = std::rc::Rc::new(Gateway::new(queue_depth)?);
            let reaper = std::rc::Rc::clone(&gw);
            sdfs_scheduler::register_idle_hook(move || reaper.reap_completions());
            *slot = Some(gw);
        }
        Ok(std::rc::Rc::clone(slot.as_ref().expect("just initialized")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_pwritev_then_preadv_roundtrips() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let fd = {
            use std::os::unix::io::AsRawFd;
            tmp.as_file().as_raw_fd()
        };
        let gw = Gateway::new(8).unwrap();
        let payload = b"hello gateway".to_vec();
        let slice = IoSlice { base: &payload };
        let written = gw.commit_pwritev(fd, &[slice], 0).unwrap();
        assert_eq!(written as usize, payload.len());

        let mut buf = vec![0u8; payload.len()];
        let mut read_slice = IoSliceMut { base: &mut buf };
        let n = gw
            .commit_preadv(fd, std::slice::from_mut(&mut read_slice), 0)
            .unwrap();
        assert_eq!(n as usize, payload.len());
        assert_eq!(buf, payload);
    }
}
