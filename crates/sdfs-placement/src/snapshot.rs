//! Snapshot creation and the replica-sync waiter
//! (`__redis_replica_synced`, `__md_snapshot_wait_sync`, `md_snapshot`).

use std::time::Duration;

use sdfs_dtyp::{FileId, RedisAddr, Result, SdfsError, VolumeName};
use sdfs_registry::{Kv, RegistryStore};

const SYNC_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// `__redis_replica_synced`: connects to `addr`, confirms it reports role
/// `slave`, then connects to the master it names and compares its own
/// `master_repl_offset` against the replica's `slave_repl_offset`.
async fn replica_synced(addr: &RedisAddr) -> Result<bool> {
    let mut replica = Kv::connect(&format!("{}:{}", addr.host, addr.port)).await?;
    let replica_info = replica.info_replication().await?;

    if replica_info.role != "slave" {
        return Err(SdfsError::internal(format!(
            "{addr} reports role {:?}, expected slave",
            replica_info.role
        )));
    }

    let master_host = replica_info
        .master_host
        .ok_or_else(|| SdfsError::internal(format!("{addr} missing master_host")))?;
    let master_port = replica_info
        .master_port
        .ok_or_else(|| SdfsError::internal(format!("{addr} missing master_port")))?;
    let slave_offset = replica_info
        .slave_repl_offset
        .ok_or_else(|| SdfsError::internal(format!("{addr} missing slave_repl_offset")))?;

    let mut master = Kv::connect(&format!("{master_host}:{master_port}")).await?;
    let master_info = master.info_replication().await?;
    let master_offset = master_info
        .master_repl_offset
        .ok_or_else(|| SdfsError::internal(format!("{master_host}:{master_port} missing master_repl_offset")))?;

    Ok(master_offset == slave_offset)
}

/// `__md_snapshot_wait_sync__`: polls a single replica address until
/// synced, sleeping a second between attempts.
async fn wait_one_synced(addr: &RedisAddr) -> Result<()> {
    loop {
        if replica_synced(addr).await? {
            return Ok(());
        }
        tokio::time::sleep(SYNC_POLL_INTERVAL).await;
    }
}

/// `__md_snapshot_wait_sync`: waits for every shard*replica address.
pub async fn wait_synced(addrs: &[RedisAddr]) -> Result<()> {
    for addr in addrs {
        wait_one_synced(addr).await?;
    }
    Ok(())
}

/// Creates a snapshot of `name` as `snap`: copies the placement record
/// under the live volume's fileid with `snapvers = 1`, records the
/// snapshot's source volume at `<snap>/src`, re-derives and waits on the
/// redis placement for the *source* volume (matching `md_snapshot`'s own
/// choice to pass `name`, not `snap`, into `__md_vol_set_redis__`), then
/// removes the transient `src` marker once synced.
pub async fn snapshot(
    registry: &impl RegistryStore,
    name: &str,
    snap: &str,
    lookup: impl Fn(&str) -> Option<FileId>,
    sharding: u32,
    replica: u32,
    solomode: bool,
) -> Result<FileId> {
    let fileid = lookup(name).ok_or_else(|| SdfsError::NotFound(name.to_string()))?;

    let snap_name = VolumeName::new(snap);
    let snap_fileid = FileId::new(fileid.volid, 1, fileid.ctime);
    crate::mkvol::set_etcd(registry, &snap_name, &snap_fileid, sharding, replica).await?;

    let src_key = snap_name.src_key();
    registry.create(&src_key, name.as_bytes()).await?;

    let source_name = VolumeName::new(name);
    let addrs = crate::mkvol::set_redis(registry, &source_name, sharding, replica, solomode).await?;

    wait_synced(&addrs).await?;

    registry.delete(&src_key).await?;

    Ok(snap_fileid)
}
