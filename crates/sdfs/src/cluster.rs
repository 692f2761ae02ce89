//! The top-level handle a chunk-data-server daemon constructs once at
//! startup (mirrors `smb::Client`/`Connection`'s role: own the shared
//! state, hand out narrow operations over it).

use std::sync::Arc;

use sdfs_dtyp::{CoreConfig, FileId, RedisAddr, Result};
use sdfs_registry::Registry;
use sdfs_replica::ReplicaEngine;
use sdfs_scheduler::{OpClass, Scheduler};

/// Construction knobs for a [`Cluster`]: the core config (`maxcore` sets the
/// worker count), optional explicit pinning, and the registry endpoints to
/// connect to.
pub struct ClusterConfig {
    pub core: CoreConfig,
    pub core_ids: Option<Vec<core_affinity::CoreId>>,
    pub etcd_endpoints: Vec<String>,
}

impl ClusterConfig {
    pub fn new(core: CoreConfig, etcd_endpoints: Vec<String>) -> Self {
        Self {
            core,
            core_ids: None,
            etcd_endpoints,
        }
    }
}

/// Wires the scheduler, registry client, and replica engine into one
/// handle. `mkvol`/`rmvol`/`snapshot` are exposed through the
/// [`crate::placement`] module directly against `cluster.registry()`,
/// mirroring how `sdfs-placement`'s free functions are generic over any
/// `RegistryStore` rather than tied to this struct.
pub struct Cluster {
    scheduler: Arc<Scheduler>,
    registry: Registry,
    replica: ReplicaEngine,
    config: Arc<CoreConfig>,
}

impl Cluster {
    /// Starts the scheduler (reserving the `Replica` blocking-ops class at
    /// 32 permits, matching `sche_thread_ops_register(ops, REPLICA, 32)`),
    /// connects the registry client, and builds the replica engine on top.
    pub async fn start(config: ClusterConfig) -> Result<Self> {
        let scheduler = Arc::new(Scheduler::start(config.core.maxcore, config.core_ids));
        scheduler.register_ops(OpClass::Replica, 32);

        let registry = Registry::connect(&config.etcd_endpoints).await?;
        let core = Arc::new(config.core);
        let replica = ReplicaEngine::new(Arc::clone(&scheduler), Arc::clone(&core));

        Ok(Self {
            scheduler,
            registry,
            replica,
            config: core,
        })
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn replica(&self) -> &ReplicaEngine {
        &self.replica
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Creates a volume's placement record and redis-shard assignment,
    /// matching `md_mkvol`'s live branch. Inode creation and connection
    /// warm-up (`inodeop->mkvol`/`redis_conn_vol` in the source) stay
    /// outside this crate's narrow scope.
    pub async fn mkvol(&self, name: &str) -> Result<(FileId, Vec<RedisAddr>)> {
        sdfs_placement::mkvol(
            &self.registry,
            name,
            self.config.redis_sharding,
            self.config.redis_replica,
            self.config.solomode,
        )
        .await
    }

    pub async fn rmvol(&self, name: &str) -> Result<()> {
        sdfs_placement::rmvol(&self.registry, name).await
    }

    /// Blocks until every scheduler worker thread has exited. Drops the
    /// replica engine's own `Scheduler` handle first so the refcount check
    /// below actually has a chance to succeed.
    pub fn shutdown(self) {
        drop(self.replica);
        drop(self.registry);
        if let Ok(scheduler) = Arc::try_unwrap(self.scheduler) {
            scheduler.join();
        }
    }
}
