//! Named yield points: `yield(name, timeout)` / `resume(task, value)`.
//!
//! A yield is a `oneshot` channel split in two: the awaiting half (returned
//! to the caller as a future) and the resuming half (a [`ResumeHandle`]
//! the caller tags onto whatever will eventually complete the operation —
//! an `io-uring` completion entry, a cross-worker reply, a timer). Resume
//! is enforced exactly-once at runtime: the second call observes an
//! already-taken sender and reports [`ParkError::AlreadyResumed`].

use std::sync::Mutex;
use std::time::Duration;

use sdfs_dtyp::{Result, SdfsError};
use tokio::sync::oneshot;

#[derive(Debug, thiserror::Error)]
pub enum ParkError {
    #[error("resume called twice on the same yield point")]
    AlreadyResumed,
}

/// The resuming half of a yield point. `resume` consumes nothing by value
/// (so it can be stored in a completion map keyed by task id) but enforces
/// exactly-once delivery via an internal `Option` take.
pub struct ResumeHandle {
    name: &'static str,
    tx: Mutex<Option<oneshot::Sender<i64>>>,
}

impl ResumeHandle {
    /// Resumes the parked task with `value` (a byte count, or a negative
    /// errno to signal cancellation — design §4.4 "Cancellation").
    pub fn resume(&self, value: i64) -> Result<()> {
        let mut guard = self.tx.lock().expect("resume handle mutex poisoned");
        match guard.take() {
            Some(tx) => {
                // The receiver may already be gone if the park future was
                // dropped (task canceled upstream); that's not our error.
                let _ = tx.send(value);
                Ok(())
            }
            None => Err(SdfsError::internal(format!(
                "resume called twice on yield point {:?}",
                self.name
            ))),
        }
    }
}

/// The awaiting half of a yield point.
pub struct ParkFuture {
    name: &'static str,
    rx: oneshot::Receiver<i64>,
}

impl ParkFuture {
    /// Awaits the resume value, applying `timeout` if given. A timeout
    /// resolves to `SdfsError::Timeout`, matching the source surfacing
    /// `ETIMEDOUT` from an expired `yield`.
    pub async fn with_timeout(self, timeout: Option<Duration>) -> Result<i64> {
        let recv = self.rx;
        let value = match timeout {
            Some(d) => tokio::time::timeout(d, recv)
                .await
                .map_err(|_| SdfsError::Timeout(format!("yield point {:?} timed out", self.name)))?
                .map_err(|_| {
                    SdfsError::Canceled(format!(
                        "yield point {:?} resume handle dropped without resuming",
                        self.name
                    ))
                })?,
            None => recv.await.map_err(|_| {
                SdfsError::Canceled(format!(
                    "yield point {:?} resume handle dropped without resuming",
                    self.name
                ))
            })?,
        };
        if value < 0 {
            return Err(SdfsError::Canceled(format!(
                "yield point {:?} resumed with errno {value}",
                self.name
            )));
        }
        Ok(value)
    }
}

/// Creates a new named yield point: a `(resume handle, park future)` pair.
/// The caller tags the resume handle onto whatever will complete the
/// operation, then awaits the future (optionally with a timeout).
pub fn yield_point(name: &'static str) -> (ResumeHandle, ParkFuture) {
    let (tx, rx) = oneshot::channel();
    (
        ResumeHandle {
            name,
            tx: Mutex::new(Some(tx)),
        },
        ParkFuture { name, rx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resume_delivers_value() {
        let (handle, fut) = yield_point("test");
        handle.resume(42).unwrap();
        assert_eq!(fut.with_timeout(None).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn double_resume_errors() {
        let (handle, _fut) = yield_point("test");
        handle.resume(1).unwrap();
        assert!(handle.resume(2).is_err());
    }

    #[tokio::test]
    async fn negative_resume_is_canceled() {
        let (handle, fut) = yield_point("test");
        handle.resume(-(libc::ECANCELED as i64)).unwrap();
        assert!(fut.with_timeout(None).await.is_err());
    }

    #[tokio::test]
    async fn timeout_without_resume() {
        let (_handle, fut) = yield_point("test");
        let res = fut.with_timeout(Some(Duration::from_millis(10))).await;
        assert!(matches!(res, Err(SdfsError::Timeout(_))));
    }
}
