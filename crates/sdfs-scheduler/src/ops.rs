//! Blocking-operation classes (`sche_thread_ops_register`, design §4.4).
//!
//! Each class reserves a fixed number of concurrent `spawn_blocking` slots.
//! `newthread` acquires a permit from the caller's class before running the
//! blocking closure, so a burst of file opens can't starve the tokio
//! blocking pool out from under other classes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sdfs_dtyp::{Result, SdfsError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A blocking-operation class. `Replica` is the one the source registers
/// by name (`SCHE_THREAD_REPLICA`, 32 threads for file-open work); `Other`
/// covers anything a caller registers ad hoc (etcd calls, etc).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpClass {
    Replica,
    Registry,
    Other(u32),
}

#[derive(Default)]
pub struct OpsRegistry {
    classes: Mutex<HashMap<OpClass, Arc<Semaphore>>>,
}

impl OpsRegistry {
    pub fn new() -> Self {
        Self {
            classes: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `class` with `n` concurrent slots. Re-registering replaces
    /// the semaphore (any outstanding permits from the old one remain
    /// valid until released, since they hold their own `Arc`).
    pub fn register(&self, class: OpClass, n: usize) {
        let mut classes = self.classes.lock().expect("ops registry mutex poisoned");
        classes.insert(class, Arc::new(Semaphore::new(n)));
    }

    pub async fn acquire(&self, class: OpClass) -> Result<OwnedSemaphorePermit> {
        let sem = {
            let classes = self.classes.lock().expect("ops registry mutex poisoned");
            classes.get(&class).cloned()
        }
        .ok_or_else(|| SdfsError::internal(format!("operation class {class:?} not registered")))?;
        sem.acquire_owned()
            .await
            .map_err(|_| SdfsError::internal("operation class semaphore closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_without_register_is_internal_error() {
        let registry = OpsRegistry::new();
        assert!(registry.acquire(OpClass::Replica).await.is_err());
    }

    #[tokio::test]
    async fn acquire_after_register_succeeds() {
        let registry = OpsRegistry::new();
        registry.register(OpClass::Replica, 32);
        let _permit = registry.acquire(OpClass::Replica).await.unwrap();
    }
}
