//! The worker loop: drain mailbox, run the local task set, sleep on idle.

use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::LocalSet;

use crate::idle;
use crate::OpsRegistry;

/// How often a worker's idle pass runs when the mailbox is quiet, standing
/// in for "sleep on an eventfd" (design §4.4) until a parked completion
/// wakes the thread on its own. Short enough that `io_uring` completions
/// (the gateway's `reap_completions` hook) are drained promptly.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub type LocalFuture = Pin<Box<dyn Future<Output = ()> + 'static>>;
pub type Job = Box<dyn FnOnce() -> LocalFuture + Send>;

thread_local! {
    static CURRENT_WORKER: Cell<Option<usize>> = const { Cell::new(None) };
}

/// The worker index this thread is running as, if any.
pub fn current_worker() -> Option<usize> {
    CURRENT_WORKER.with(|c| c.get())
}

pub struct Worker {
    id: usize,
    #[allow(dead_code)]
    worker_count: usize,
    core: Option<core_affinity::CoreId>,
    #[allow(dead_code)]
    ops: Arc<OpsRegistry>,
}

impl Worker {
    pub fn new(
        id: usize,
        worker_count: usize,
        core: Option<core_affinity::CoreId>,
        ops: Arc<OpsRegistry>,
    ) -> Self {
        Self {
            id,
            worker_count,
            core,
            ops,
        }
    }

    /// Runs this worker's loop to completion. Returns once `mailbox`'s
    /// sender side is dropped (the scheduler shut down) and every
    /// outstanding local task has finished.
    pub fn run(self, mut mailbox: mpsc::Receiver<Job>) {
        if let Some(core) = self.core {
            if !core_affinity::set_for_current(core) {
                log::warn!("worker {} failed to pin to core {:?}", self.id, core);
            }
        }
        CURRENT_WORKER.with(|c| c.set(Some(self.id)));

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed to build worker current-thread runtime");
        let local = LocalSet::new();

        local.block_on(&rt, async move {
            log::debug!("worker {} entering run loop", self.id);
            let mut idle_tick = tokio::time::interval(IDLE_POLL_INTERVAL);
            idle_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    job = mailbox.recv() => {
                        match job {
                            Some(job) => {
                                let fut = job();
                                tokio::task::spawn_local(fut);
                                idle::run_idle_hooks();
                            }
                            None => break,
                        }
                    }
                    _ = idle_tick.tick() => {
                        idle::run_idle_hooks();
                    }
                }
            }
            log::debug!("worker {} mailbox closed, draining local tasks", self.id);
        });
    }
}
