//! The error kind table from the design (§7): one variant per policy, with
//! enough context attached to log usefully at the point of conversion.

/// Errors surfaced across the chunk I/O core and placement routine.
///
/// `Internal` indicates an invariant violation (a resume without a matching
/// yield, a byte-count mismatch the kernel itself didn't report) and is
/// never meant to be handled by a caller — see [`SdfsError::internal`].
#[derive(Debug, thiserror::Error)]
pub enum SdfsError {
    /// Throttle / retry-with-backoff. Caller retries with jitter.
    #[error("busy: {0}")]
    Busy(String),

    /// No online disk satisfies the requested placement. Fatal for that request.
    #[error("no space: {0}")]
    NoSpace(String),

    /// No such volume or chunk.
    #[error("not found: {0}")]
    NotFound(String),

    /// Idempotent-create conflict. Silently ignored by placement; surfaced
    /// by `mkvol` of an already-existing volume.
    #[error("already exists: {0}")]
    Exists(String),

    /// Byte-count mismatch or kernel I/O error. `errno` is the positive,
    /// normalized error code (never the raw negative kernel return value).
    #[error("io error (errno {errno}): {context}")]
    Io { errno: i32, context: String },

    /// Peer closed mid-handshake. Fatal for that socket only.
    #[error("broken pipe: {0}")]
    BrokenPipe(String),

    /// Explicit timeout at a yield point.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Explicit cancellation at a yield point.
    #[error("canceled: {0}")]
    Canceled(String),

    /// Invariant violated. Logic bug; never converted into a user-facing
    /// retry. Callers that see this should abort rather than recover.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl SdfsError {
    pub fn io(errno: i32, context: impl Into<String>) -> Self {
        SdfsError::Io {
            errno,
            context: context.into(),
        }
    }

    /// Normalizes a raw kernel submission result (negative `-errno` on
    /// failure, non-negative byte count on success) into `Result<u32>`.
    ///
    /// Per §7, "negative values returned from kernel submissions are
    /// normalized to positive form at the first core-internal boundary."
    pub fn from_kernel_result(ret: i64, context: impl Into<String>) -> Result<u32, Self> {
        if ret < 0 {
            Err(SdfsError::io(-ret as i32, context))
        } else {
            Ok(ret as u32)
        }
    }

    /// Raises an internal invariant violation. The source aborts the
    /// process with a dump; we panic, which is the idiomatic equivalent for
    /// a logic bug that must not be laundered into a retryable error.
    #[track_caller]
    pub fn internal(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        log::error!("internal invariant violated: {msg}");
        SdfsError::Internal(msg)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SdfsError::Busy(_) | SdfsError::Timeout(_))
    }
}

impl From<std::io::Error> for SdfsError {
    fn from(e: std::io::Error) -> Self {
        let errno = e.raw_os_error().unwrap_or(libc::EIO);
        SdfsError::io(errno, e.to_string())
    }
}
