//! `CoreConfig`: every option in design §6's configuration table, with the
//! same defaults the source ships (`cdsconf`/`mdconf` in the original).

use std::time::Duration;

/// Runtime configuration shared by the scheduler, disk gateway, replica
/// engine, and placement routine.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Number of shared memory-cache segments kept warm (`memcache_count`).
    pub memcache_count: u32,
    /// Size in bytes of one memcache segment (`memcache_seg`).
    pub memcache_seg: u32,
    /// Number of scheduler worker threads pinned to distinct cores.
    pub maxcore: usize,
    /// Core index reserved for polling-only work, if any.
    pub polling_core: Option<usize>,
    /// How long a polling worker sleeps between idle passes.
    pub polling_timeout: Duration,
    /// Core index reserved for the `io-uring` gateway's completion thread.
    pub aio_core: Option<usize>,
    /// Submission queue depth for each worker's `io-uring` ring.
    pub queue_depth: u32,
    /// When true, writes whose offset and size are sector-aligned use the
    /// direct (`O_DIRECT`) fast path instead of the buffered path.
    pub io_sync: bool,
    /// Bytes to preallocate (`fallocate`) ahead of a chunk's current length.
    pub prealloc_max: u64,
    /// Number of shards a volume's keyspace is split across.
    pub redis_sharding: u32,
    /// Number of replicas maintained per shard.
    pub redis_replica: u32,
    /// Timeout applied to cross-worker `request()` round trips.
    pub rpc_timeout: Duration,
    /// Single-host placement mode: shards and replicas all land on one host.
    pub solomode: bool,
    /// Root directory chunks are hashed under (design §4.1's cascade root).
    pub workdir: std::path::PathBuf,
    /// An I/O path logs a `warn!` when it runs longer than this
    /// (`IO_WARN` in the source's `ANALYSIS_QUEUE`/`CORE_ANALYSIS_UPDATE`
    /// instrumentation).
    pub io_warn_threshold: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            memcache_count: 1024,
            memcache_seg: 1 << 20,
            maxcore: 4,
            polling_core: None,
            polling_timeout: Duration::from_millis(100),
            aio_core: None,
            queue_depth: 128,
            io_sync: true,
            prealloc_max: 64 << 20,
            redis_sharding: 1,
            redis_replica: 1,
            rpc_timeout: Duration::from_secs(30),
            solomode: false,
            workdir: std::path::PathBuf::from("/data/sdfs"),
            io_warn_threshold: Duration::from_millis(500),
        }
    }
}

/// Builder for [`CoreConfig`], mirroring the teacher's `make_*_config`
/// pattern: each setter takes `self` by value and returns `Self`, with a
/// terminal `build()`.
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    inner: CoreConfig,
}

impl CoreConfigBuilder {
    pub fn new() -> Self {
        Self {
            inner: CoreConfig::default(),
        }
    }

    pub fn maxcore(mut self, n: usize) -> Self {
        self.inner.maxcore = n;
        self
    }

    pub fn queue_depth(mut self, n: u32) -> Self {
        self.inner.queue_depth = n;
        self
    }

    pub fn io_sync(mut self, v: bool) -> Self {
        self.inner.io_sync = v;
        self
    }

    pub fn redis_sharding(mut self, n: u32) -> Self {
        self.inner.redis_sharding = n;
        self
    }

    pub fn redis_replica(mut self, n: u32) -> Self {
        self.inner.redis_replica = n;
        self
    }

    pub fn solomode(mut self, v: bool) -> Self {
        self.inner.solomode = v;
        self
    }

    pub fn rpc_timeout(mut self, d: Duration) -> Self {
        self.inner.rpc_timeout = d;
        self
    }

    pub fn workdir(mut self, p: impl Into<std::path::PathBuf>) -> Self {
        self.inner.workdir = p.into();
        self
    }

    pub fn io_warn_threshold(mut self, d: Duration) -> Self {
        self.inner.io_warn_threshold = d;
        self
    }

    pub fn build(self) -> CoreConfig {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = CoreConfigBuilder::new()
            .maxcore(8)
            .solomode(true)
            .redis_replica(3)
            .build();
        assert_eq!(cfg.maxcore, 8);
        assert!(cfg.solomode);
        assert_eq!(cfg.redis_replica, 3);
        assert_eq!(cfg.memcache_count, CoreConfig::default().memcache_count);
    }
}
