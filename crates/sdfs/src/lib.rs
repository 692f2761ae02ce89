//! Workspace facade: a single `Cluster` handle wiring the scheduler, disk
//! gateway, replica engine, registry client, and placement routine behind
//! one constructible entry point (the role `smb`'s `Client`/`Connection`
//! play for its own sub-crates).

mod cluster;

pub use cluster::{Cluster, ClusterConfig};

pub use sdfs_dtyp::{
    ChkId, ChunkType, CoreConfig, CoreConfigBuilder, FileId, IoDescriptor, RedisAddr, Result,
    SdfsError, VolId, VolumeName,
};
pub use sdfs_buf::{IoSlice, IoSliceMut, SegBuffer, Segment};
pub use sdfs_disk::{cascade, getfd, Gateway, OpenFlags};
pub use sdfs_registry::{HSetFlags, Kv, Registry, RegistryStore, ReplicationInfo};
pub use sdfs_replica::ReplicaEngine;
pub use sdfs_scheduler::{
    self_worker, running, yield_point, OpClass, OpsRegistry, ParkError, ParkFuture, ResumeHandle,
    Scheduler,
};
pub use sdfs_placement as placement;
