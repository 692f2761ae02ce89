//! Volume teardown (`__md_rmvol_config`, `__md_rmvol_sharding`,
//! `__md_rmvol_cleanup`). The inode/childcount step (`__md_rmvol_inode`) is
//! a metadata-tree policy concern that lives outside this crate.

use std::time::Duration;

use sdfs_dtyp::{Result, VolumeName};
use sdfs_registry::RegistryStore;

const SLOT_POLL_RETRIES: u32 = 10;
const SLOT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// `__md_rmvol_config`: snapshots `sharding`/`replica` into their `.bak`
/// keys (idempotent — a retry after a partial failure reuses the existing
/// backup instead of re-reading the live value), then deletes the live
/// sharding/replica/volid/id keys. Returns `(sharding, replica)`.
async fn backup_and_clear_config(registry: &impl RegistryStore, name: &VolumeName) -> Result<(u32, u32)> {
    let sharding = backup_or_read(registry, &name.sharding_bak_key(), &name.sharding_key()).await?;
    let replica = backup_or_read(registry, &name.replica_bak_key(), &name.replica_key()).await?;

    registry.delete(&name.sharding_key()).await?;
    registry.delete(&name.replica_key()).await?;
    registry.delete(&name.volid_key()).await?;
    registry.delete(&name.id_key()).await?;

    Ok((sharding, replica))
}

async fn backup_or_read(registry: &impl RegistryStore, bak_key: &str, live_key: &str) -> Result<u32> {
    if let Some(v) = registry.get(bak_key).await? {
        return parse_u32(&v);
    }
    let v = registry.get(live_key).await?.ok_or_else(|| {
        sdfs_dtyp::SdfsError::NotFound(format!("{live_key} missing during rmvol"))
    })?;
    registry.create_idempotent(bak_key, &v).await?;
    parse_u32(&v)
}

fn parse_u32(v: &[u8]) -> Result<u32> {
    String::from_utf8_lossy(v)
        .trim()
        .parse()
        .map_err(|_| sdfs_dtyp::SdfsError::internal("placement record is not a u32"))
}

/// `__md_rmvol_sharding`: polls each replica's slot key up to
/// `SLOT_POLL_RETRIES` times for the redis side to remove it itself, then
/// force-deletes the whole shard directory regardless of outcome.
async fn teardown_shard(registry: &impl RegistryStore, name: &VolumeName, shard: u32, replica: u32) -> Result<()> {
    for r in 0..replica {
        let key = name.slot_key(shard, r);
        let mut retry = 0;
        loop {
            match registry.get(&key).await? {
                None => break, // redis side already exited
                Some(_) if retry >= SLOT_POLL_RETRIES => {
                    log::warn!("wait redis {key} exit fail, force remove it");
                    break;
                }
                Some(_) => {
                    retry += 1;
                    tokio::time::sleep(SLOT_POLL_INTERVAL).await;
                }
            }
        }
    }

    registry.delete_dir(&name.slot_dir(shard)).await
}

/// `__md_rmvol_cleanup`: removes the whole slot tree and the `.bak` keys,
/// then the volume's subtree itself.
async fn cleanup(registry: &impl RegistryStore, name: &VolumeName) -> Result<()> {
    registry.delete_dir(&name.slot_root()).await?;
    registry.delete(&name.sharding_bak_key()).await?;
    registry.delete(&name.replica_bak_key()).await?;
    registry.delete_dir(&name.subtree()).await
}

/// Tears down a volume's placement records in the source's strict order:
/// backup-then-clear config, per-shard sharding teardown, final cleanup.
pub async fn rmvol(registry: &impl RegistryStore, name: &str) -> Result<()> {
    let volname = VolumeName::new(name);

    let (sharding, replica) = backup_and_clear_config(registry, &volname).await?;

    for shard in 0..sharding {
        if let Err(e) = teardown_shard(registry, &volname, shard, replica).await {
            log::warn!("teardown of shard {shard} for {name} failed: {e}");
        }
    }

    cleanup(registry, &volname).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_u32_rejects_garbage() {
        assert!(parse_u32(b"not-a-number").is_err());
        assert_eq!(parse_u32(b"3\n").unwrap(), 3);
    }
}
