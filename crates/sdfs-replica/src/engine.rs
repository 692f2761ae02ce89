//! `write`/`read` orchestration, ported step for step from
//! `__replica_write__`/`__replica_read__` (direct vs. buffered fast path)
//! and `replica_write`/`replica_read` (worker-affinity dispatch).

use std::sync::Arc;

use sdfs_buf::SegBuffer;
use sdfs_dtyp::{CoreConfig, IoDescriptor, Result, SdfsError};
use sdfs_disk::gateway::this_worker_gateway;
use sdfs_disk::{getfd, OpenFlags};
use sdfs_scheduler::{OpClass, Scheduler};

pub struct ReplicaEngine {
    scheduler: Arc<Scheduler>,
    config: Arc<CoreConfig>,
}

impl ReplicaEngine {
    pub fn new(scheduler: Arc<Scheduler>, config: Arc<CoreConfig>) -> Self {
        Self { scheduler, config }
    }

    /// `write(io, buf)`. Must be called from within a task; dispatches
    /// across workers transparently via `chk-id.id mod N` affinity.
    pub async fn write(&self, io: IoDescriptor, buf: SegBuffer) -> Result<u32> {
        let target = io.chk.worker_index(self.scheduler.worker_count());
        if sdfs_scheduler::self_worker() == Some(target) {
            self.write_inline(io, buf).await
        } else {
            let scheduler = Arc::clone(&self.scheduler);
            let config = Arc::clone(&self.config);
            self.scheduler
                .request(io.chk.id, Some(target), move || async move {
                    ReplicaEngine::new(scheduler, config)
                        .write_inline(io, buf)
                        .await
                })
                .await
        }
    }

    /// `read(io, buf)`. `buf` is allocated here and handed back filled
    /// with exactly `io.size` bytes on success.
    pub async fn read(&self, io: IoDescriptor) -> Result<SegBuffer> {
        let target = io.chk.worker_index(self.scheduler.worker_count());
        if sdfs_scheduler::self_worker() == Some(target) {
            self.read_inline(io).await
        } else {
            let scheduler = Arc::clone(&self.scheduler);
            let config = Arc::clone(&self.config);
            self.scheduler
                .request(io.chk.id, Some(target), move || async move {
                    ReplicaEngine::new(scheduler, config).read_inline(io).await
                })
                .await
        }
    }

    async fn write_inline(&self, io: IoDescriptor, buf: SegBuffer) -> Result<u32> {
        debug_assert!(sdfs_scheduler::running(), "write must run inside a task");
        // mbuffer_clone1: the caller may drop their own reference immediately.
        let tmp = buf.clone();

        let use_direct = self.config.io_sync && io.is_sector_aligned();
        let threshold = self.config.io_warn_threshold;
        let written = crate::analysis::timed("write", threshold, async {
            if use_direct {
                self.write_direct(io, tmp).await
            } else {
                self.write_buffered(io, tmp).await
            }
        })
        .await?;

        if written != io.size {
            return Err(SdfsError::io(
                libc::EIO,
                format!("write {io}: short write {written}/{}", io.size),
            ));
        }
        Ok(written)
    }

    async fn write_direct(&self, io: IoDescriptor, buf: SegBuffer) -> Result<u32> {
        let (fd, _path) = self.open_for(io, OpenFlags { direct: true, sync: false }).await?;
        let projected = buf.project();
        assert_projected_len(&projected, io.size);

        let gw = this_worker_gateway(self.config.queue_depth)?;
        let result = gw.commit_pwritev(fd, &projected, io.offset);
        close_fd(fd);
        result
    }

    async fn write_buffered(&self, io: IoDescriptor, buf: SegBuffer) -> Result<u32> {
        let flags = OpenFlags {
            direct: false,
            sync: self.config.io_sync,
        };
        let (fd, _path) = self.open_for(io, flags).await?;
        let projected = buf.project();
        assert_projected_len(&projected, io.size);

        let gw = this_worker_gateway(self.config.queue_depth)?;
        let result = gw.submit_pwritev(fd, &projected, io.offset).await;
        close_fd(fd);
        result
    }

    async fn read_inline(&self, io: IoDescriptor) -> Result<SegBuffer> {
        debug_assert!(sdfs_scheduler::running(), "read must run inside a task");

        let use_direct = self.config.io_sync && io.is_sector_aligned();
        let threshold = self.config.io_warn_threshold;
        let (mut buf, read) = crate::analysis::timed("read", threshold, async {
            if use_direct {
                self.read_direct(io).await
            } else {
                self.read_buffered(io).await
            }
        })
        .await?;

        if read != io.size {
            return Err(SdfsError::io(
                libc::EIO,
                format!("read {io}: short read {read}/{}", io.size),
            ));
        }
        let _ = &mut buf;
        Ok(buf)
    }

    async fn read_direct(&self, io: IoDescriptor) -> Result<(SegBuffer, u32)> {
        let (fd, _path) = self
            .open_for(io, OpenFlags { direct: true, sync: false })
            .await?;
        let mut buf = SegBuffer::with_len(io.size as usize);
        let mut projected = buf.project_mut();
        assert_projected_len_mut(&projected, io.size);

        let gw = this_worker_gateway(self.config.queue_depth)?;
        let result = gw.commit_preadv(fd, &mut projected, io.offset);
        drop(projected);
        close_fd(fd);
        result.map(|n| (buf, n))
    }

    async fn read_buffered(&self, io: IoDescriptor) -> Result<(SegBuffer, u32)> {
        let (fd, _path) = self
            .open_for(io, OpenFlags { direct: false, sync: false })
            .await?;
        let mut buf = SegBuffer::with_len(io.size as usize);
        let mut projected = buf.project_mut();
        assert_projected_len_mut(&projected, io.size);

        let gw = this_worker_gateway(self.config.queue_depth)?;
        let result = gw.submit_preadv(fd, &mut projected, io.offset).await;
        drop(projected);
        close_fd(fd);
        result.map(|n| (buf, n))
    }

    async fn open_for(
        &self,
        io: IoDescriptor,
        flags: OpenFlags,
    ) -> Result<(std::os::unix::io::RawFd, std::path::PathBuf)> {
        let workdir = self.config.workdir.clone();
        self.scheduler
            .newthread(OpClass::Replica, move || {
                getfd(&workdir, 0, &io.chk, io.snapvers, flags)
            })
            .await
    }
}

fn assert_projected_len(projected: &[sdfs_buf::IoSlice<'_>], expected: u32) {
    let total: usize = projected.iter().map(|s| s.len()).sum();
    assert_eq!(total, expected as usize, "projection length mismatch");
}

fn assert_projected_len_mut(projected: &[sdfs_buf::IoSliceMut<'_>], expected: u32) {
    let total: usize = projected.iter().map(|s| s.len()).sum();
    assert_eq!(total, expected as usize, "projection length mismatch");
}

fn close_fd(fd: std::os::unix::io::RawFd) {
    unsafe {
        libc::close(fd);
    }
}
