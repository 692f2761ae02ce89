//! Cooperative per-worker task scheduler (design §4.4).
//!
//! N pinned OS threads, each running a single-threaded `tokio` runtime and
//! a `LocalSet`. Tasks are `!Send` futures; cross-worker communication goes
//! through a bounded mailbox plus a `oneshot` reply, never shared memory.

mod idle;
mod ops;
mod park;
mod worker;

pub use idle::register_idle_hook;
pub use ops::{OpClass, OpsRegistry};
pub use park::{yield_point, ParkError, ParkFuture, ResumeHandle};

use std::future::Future;
use std::sync::Arc;

use sdfs_dtyp::{Result, SdfsError};
use tokio::sync::{mpsc, oneshot};
use worker::{Job, Worker};

/// A running scheduler: `N` workers plus the blocking-operation semaphores
/// registered against it.
pub struct Scheduler {
    workers: Vec<mpsc::Sender<Job>>,
    handles: Vec<std::thread::JoinHandle<()>>,
    ops: Arc<OpsRegistry>,
}

impl Scheduler {
    /// Starts `n` workers, pinning worker `i` to core `core_ids[i]` when
    /// `core_ids` is provided (design §6 `maxcore`).
    pub fn start(n: usize, core_ids: Option<Vec<core_affinity::CoreId>>) -> Self {
        assert!(n > 0, "scheduler requires at least one worker");
        let ops = Arc::new(OpsRegistry::new());
        let mut workers = Vec::with_capacity(n);
        let mut handles = Vec::with_capacity(n);
        for id in 0..n {
            let core = core_ids.as_ref().and_then(|v| v.get(id).copied());
            let (tx, rx) = mpsc::channel(1024);
            let ops = Arc::clone(&ops);
            let handle = std::thread::Builder::new()
                .name(format!("sdfs-worker-{id}"))
                .spawn(move || Worker::new(id, n, core, ops).run(rx))
                .expect("failed to spawn scheduler worker thread");
            workers.push(tx);
            handles.push(handle);
        }
        Self {
            workers,
            handles,
            ops,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Registers a blocking-operation class reserving `n` concurrent slots,
    /// the Rust analogue of `sche_thread_ops_register(ops, type, n)`.
    pub fn register_ops(&self, class: OpClass, n: usize) {
        self.ops.register(class, n);
    }

    /// Runs `fn` on a scheduler thread reserved for blocking work, gated by
    /// the semaphore registered for `class`. The caller must be a task
    /// running on some worker; it yields until `fn` completes.
    pub async fn newthread<F, T>(&self, class: OpClass, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.ops.acquire(class).await?;
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(|e| SdfsError::internal(format!("newthread task panicked: {e}")))?;
        result
    }

    /// Forwards `f` to the worker owning `key` (or `worker_hint` when
    /// `Some`), runs it there as a new task, and returns its result to the
    /// caller. Matches the source's mailbox-enqueue-then-park description.
    pub async fn request<F, Fut, T>(&self, key: u64, worker_hint: Option<usize>, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + 'static,
        T: Send + 'static,
    {
        let target = worker_hint.unwrap_or_else(|| (key % self.workers.len() as u64) as usize);
        let mailbox = self
            .workers
            .get(target)
            .ok_or_else(|| SdfsError::internal(format!("no worker at index {target}")))?;
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let result = f().await;
                let _ = reply_tx.send(result);
            })
        });
        mailbox
            .send(job)
            .await
            .map_err(|_| SdfsError::BrokenPipe(format!("worker {target} mailbox closed")))?;
        reply_rx
            .await
            .map_err(|_| SdfsError::BrokenPipe(format!("worker {target} dropped request reply")))?
    }

    /// Blocks until every worker thread exits. Workers only exit once their
    /// mailbox sender side is dropped (i.e. the `Scheduler` itself is
    /// dropped), so callers typically don't await this directly.
    pub fn join(self) {
        drop(self.workers);
        for h in self.handles {
            let _ = h.join();
        }
    }
}

/// True iff called from within a task running on a scheduler worker.
pub fn running() -> bool {
    worker::current_worker().is_some()
}

/// The current worker's index, or `None` off-worker.
pub fn self_worker() -> Option<usize> {
    worker::current_worker()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_runs_on_target_worker_and_returns_result() {
        let sched = Scheduler::start(2, None);
        let got = sched
            .request(0, Some(1), || async move { Ok(self_worker()) })
            .await
            .unwrap();
        assert_eq!(got, Some(1));
        sched.join();
    }

    #[tokio::test]
    async fn newthread_runs_registered_class() {
        let sched = Scheduler::start(1, None);
        sched.register_ops(OpClass::Replica, 4);
        let got = sched
            .newthread(OpClass::Replica, || Ok(2 + 2))
            .await
            .unwrap();
        assert_eq!(got, 4);
        sched.join();
    }

    #[tokio::test]
    async fn newthread_without_registration_errors() {
        let sched = Scheduler::start(1, None);
        let got = sched.newthread(OpClass::Replica, || Ok(1)).await;
        assert!(got.is_err());
        sched.join();
    }
}
