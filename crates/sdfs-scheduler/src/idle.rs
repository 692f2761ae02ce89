//! Per-worker idle-pass hooks: the "then sleep on an eventfd" half of the
//! worker loop (design §4.4). A hook runs on every idle pass of the
//! worker thread it was registered on; the disk gateway uses this to
//! drain `io_uring` completions and resume parked tasks without
//! `sdfs-scheduler` depending on `sdfs-disk`.

use std::cell::RefCell;

thread_local! {
    static IDLE_HOOKS: RefCell<Vec<Box<dyn Fn()>>> = const { RefCell::new(Vec::new()) };
}

/// Registers `hook` to run on every idle pass of the calling thread's
/// worker loop. Must be called from within a task running on a scheduler
/// worker; hooks registered off-worker never run.
pub fn register_idle_hook(hook: impl Fn() + 'static) {
    IDLE_HOOKS.with(|hooks| hooks.borrow_mut().push(Box::new(hook)));
}

/// Runs every hook registered on the calling thread. Called from
/// [`crate::worker::Worker::run`]'s idle tick.
pub(crate) fn run_idle_hooks() {
    IDLE_HOOKS.with(|hooks| {
        for hook in hooks.borrow().iter() {
            hook();
        }
    });
}
