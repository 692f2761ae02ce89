//! Volume creation (`md_mkvol`'s live branch, `__md_vol_set_etcd`,
//! `__md_vol_set_redis__`, `__md_mkvol_slot`, `__md_mkvol_trigger`).

use std::collections::VecDeque;

use sdfs_dtyp::{FileId, RedisAddr, Result, SdfsError, VolumeName};
use sdfs_registry::RegistryStore;

use crate::discovery::{self, HostDisks};
use crate::id::{new_volid, now_secs};

/// Writes the sharding/replica/volid/snapvers placement keys idempotently,
/// then the `id` key create-only last — the id key's presence is the
/// "volume exists" visibility boundary (`__md_vol_set_etcd`).
pub(crate) async fn set_etcd(
    registry: &impl RegistryStore,
    name: &VolumeName,
    fileid: &FileId,
    sharding: u32,
    replica: u32,
) -> Result<()> {
    if registry.get(&name.id_key()).await?.is_some() {
        return Err(SdfsError::Exists(name.id_key()));
    }

    registry
        .create_idempotent(&name.sharding_key(), sharding.to_string().as_bytes())
        .await?;
    registry
        .create_idempotent(&name.replica_key(), replica.to_string().as_bytes())
        .await?;

    match registry
        .create(&name.volid_key(), fileid.volid.to_string().as_bytes())
        .await
    {
        Ok(()) => {}
        Err(SdfsError::Exists(_)) => {
            let existing = registry
                .get(&name.volid_key())
                .await?
                .ok_or_else(|| SdfsError::internal("volid key vanished after Exists"))?;
            let existing: u64 = String::from_utf8_lossy(&existing)
                .trim()
                .parse()
                .map_err(|_| SdfsError::internal("volid key is not a u64"))?;
            if existing != fileid.volid {
                return Err(SdfsError::Exists(format!(
                    "{} already bound to volid {existing}",
                    name.volid_key()
                )));
            }
        }
        Err(e) => return Err(e),
    }

    registry
        .create_idempotent(&name.snapvers_key(), fileid.snapvers.to_string().as_bytes())
        .await?;

    registry.create(&name.id_key(), &fileid.to_bytes()).await
}

/// `__md_mkvol_slot`: writes every shard/replica `.wait` key idempotently,
/// skipping (not erroring on) keys another racer already wrote.
async fn write_wait_keys(
    registry: &impl RegistryStore,
    name: &VolumeName,
    replica: u32,
    addrs: &[RedisAddr],
) -> Result<()> {
    for (shard, chunk) in addrs.chunks(replica as usize).enumerate() {
        for (i, addr) in chunk.iter().enumerate() {
            let key = name.wait_key(shard as u32, i as u32);
            registry
                .create_idempotent(&key, addr.to_string().as_bytes())
                .await?;
        }
    }
    Ok(())
}

/// `__md_mkvol_trigger`: re-fires the liveness trigger on every disk that
/// was chosen so the redis-side watcher provisions an instance there.
async fn trigger_selected(registry: &impl RegistryStore, hosts: &[HostDisks]) -> Result<()> {
    for ent in hosts {
        for disk in &ent.disks {
            let key = format!("redis/{}/disk/{disk}/trigger", ent.host);
            registry.put(&key, b"1").await?;
        }
    }
    Ok(())
}

/// `__md_vol_set_redis__` + `__md_vol_set_redis`: picks `sharding * replica`
/// addresses, writes the wait keys, then re-triggers every host that
/// contributed a disk.
pub(crate) async fn set_redis(
    registry: &impl RegistryStore,
    name: &VolumeName,
    sharding: u32,
    replica: u32,
    solomode: bool,
) -> Result<Vec<RedisAddr>> {
    let hosts = discovery::list_redis_hosts(registry).await?;
    if hosts.is_empty() {
        return Err(SdfsError::NoSpace("no redis hosts with online disks".into()));
    }
    let mut rotation: VecDeque<HostDisks> = hosts.iter().cloned().collect();

    let mut addrs = Vec::with_capacity((sharding * replica) as usize);
    for _shard in 0..sharding {
        let picked = discovery::select_for_shard(&mut rotation, replica as usize, solomode)?;
        addrs.extend(picked);
    }

    write_wait_keys(registry, name, replica, &addrs).await?;
    trigger_selected(registry, &hosts).await?;

    Ok(addrs)
}

/// Creates a new volume: allocates a volid, writes the placement record,
/// selects and records shard/replica redis placement, matching `md_mkvol`'s
/// live (`#else`) branch. Callers own inode creation and `redis_conn_vol`
/// connection warm-up; those are metadata/connection-pool concerns outside
/// this crate.
pub async fn mkvol(
    registry: &impl RegistryStore,
    name: &str,
    sharding: u32,
    replica: u32,
    solomode: bool,
) -> Result<(FileId, Vec<RedisAddr>)> {
    let volname = VolumeName::new(name);
    let volid = new_volid();
    let fileid = FileId::new(volid, 0, now_secs());

    set_etcd(registry, &volname, &fileid, sharding, replica).await?;
    let addrs = set_redis(registry, &volname, sharding, replica, solomode).await?;

    Ok((fileid, addrs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_wait_keys_chunking_matches_sharding_layout() {
        // Sanity check on the chunks() math: 2 shards x 2 replicas.
        let addrs = vec![
            RedisAddr { host: "a".into(), port: 1 },
            RedisAddr { host: "a".into(), port: 2 },
            RedisAddr { host: "b".into(), port: 1 },
            RedisAddr { host: "b".into(), port: 2 },
        ];
        let chunks: Vec<_> = addrs.chunks(2).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1][0].host, "b");
    }
}
