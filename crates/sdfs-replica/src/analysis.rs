//! Per-I/O latency instrumentation (`ANALYSIS_QUEUE`/`CORE_ANALYSIS_UPDATE`
//! in the source's `io_analysis.h`). Not a metrics pipeline — just a
//! `warn!` when an operation runs past its configured threshold.

use std::time::{Duration, Instant};

use sdfs_dtyp::Result;

pub(crate) async fn timed<F, T>(op: &str, threshold: Duration, fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = fut.await;
    let elapsed = start.elapsed();
    if elapsed > threshold {
        log::warn!("{op} took {elapsed:?}, exceeds io_warn_threshold {threshold:?}");
    }
    result
}
