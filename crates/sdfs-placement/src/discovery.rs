//! Disk liveness checking and host/disk enumeration
//! (`__md_mkvol_online`, `__md_mkvol_getredis*`).

use std::collections::VecDeque;
use std::time::Duration;

use rand::Rng;
use sdfs_dtyp::{RedisAddr, Result, SdfsError};
use sdfs_registry::RegistryStore;

const REDIS_ROOT: &str = "redis";
/// A disk with `instence >= MAX_INSTANCES` is considered saturated and
/// skipped, matching the source's hardcoded `64`.
const MAX_INSTANCES: u32 = 64;
const ONLINE_POLL_RETRIES: u32 = 100;
const ONLINE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One redis host and the disk indices it currently exposes as online.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDisks {
    pub host: String,
    pub disks: Vec<u32>,
}

fn child_segment(key: &str, prefix: &str) -> Option<String> {
    let rest = key.strip_prefix(prefix)?.trim_start_matches('/');
    rest.split('/').next().map(str::to_string)
}

/// `__md_mkvol_online`: writes the disk's trigger, polls until it settles
/// back to `"0"` (up to `retries * interval`), treating a disk over the
/// instance cap or a timed-out trigger as offline.
pub async fn disk_online(
    registry: &impl RegistryStore,
    host: &str,
    disk: u32,
    retries: u32,
    interval: Duration,
) -> Result<bool> {
    let instance_key = format!("{REDIS_ROOT}/{host}/disk/{disk}/instence");
    let instances = match registry.get(&instance_key).await? {
        Some(v) => String::from_utf8_lossy(&v).trim().parse::<u32>().unwrap_or(0),
        None => return Ok(false),
    };
    if instances >= MAX_INSTANCES {
        log::info!("skip disk {host}:{disk}, {instances} instances");
        return Ok(false);
    }

    let trigger_key = format!("{REDIS_ROOT}/{host}/disk/{disk}/trigger");
    registry.put(&trigger_key, b"1").await?;

    for attempt in 0..=retries {
        let value = registry.get(&trigger_key).await?;
        let settled = value
            .map(|v| String::from_utf8_lossy(&v).trim() == "0")
            .unwrap_or(false);
        if settled {
            return Ok(true);
        }
        if attempt == retries {
            log::warn!("disk {host}:{disk} trigger not online after {retries} retries");
            return Ok(false);
        }
        tokio::time::sleep(interval).await;
    }
    Ok(false)
}

/// `__md_mkvol_getredis_disk`: the online disk indices for `host`.
pub async fn list_disks_for_host(registry: &impl RegistryStore, host: &str) -> Result<Vec<u32>> {
    let prefix = format!("{REDIS_ROOT}/{host}/disk");
    let keys = registry.list(&prefix).await?;
    let mut seen = std::collections::BTreeSet::new();
    for key in &keys {
        if let Some(seg) = child_segment(key, &prefix) {
            if let Ok(disk) = seg.parse::<u32>() {
                seen.insert(disk);
            }
        }
    }
    let mut online = Vec::new();
    for disk in seen {
        if disk_online(registry, host, disk, ONLINE_POLL_RETRIES, ONLINE_POLL_INTERVAL).await? {
            online.push(disk);
        }
    }
    Ok(online)
}

/// `__md_mkvol_getredis`: every registered redis host with at least one
/// online disk. Hosts with zero online disks are skipped (the source's
/// `ENONET` continue), not treated as an error.
pub async fn list_redis_hosts(registry: &impl RegistryStore) -> Result<Vec<HostDisks>> {
    let keys = registry.list(REDIS_ROOT).await?;
    let mut hostnames = std::collections::BTreeSet::new();
    for key in &keys {
        if let Some(seg) = child_segment(key, REDIS_ROOT) {
            hostnames.insert(seg);
        }
    }
    let mut hosts = Vec::new();
    for host in hostnames {
        let disks = list_disks_for_host(registry, &host).await?;
        if disks.is_empty() {
            continue;
        }
        hosts.push(HostDisks { host, disks });
    }
    Ok(hosts)
}

/// `__md_mkvol_getredis_solo`: single host, `replica` disks chosen at a
/// random rotating offset into that host's disk list.
pub fn select_solo(hosts: &[HostDisks], replica: usize) -> Result<Vec<RedisAddr>> {
    debug_assert_eq!(hosts.len(), 1);
    let ent = &hosts[0];
    if ent.disks.len() < replica {
        return Err(SdfsError::NoSpace(format!(
            "solo host {} has {} disks, need {replica}",
            ent.host,
            ent.disks.len()
        )));
    }
    let idx = rand::thread_rng().gen_range(0..ent.disks.len());
    Ok((0..replica)
        .map(|i| RedisAddr {
            host: ent.host.clone(),
            port: ent.disks[(i + idx) % ent.disks.len()] as u16,
        })
        .collect())
}

/// `__md_mkvol_getredis_replica`: one disk from `replica` distinct hosts,
/// round-robin rotated to the back of the list so the next shard starts
/// from a different host.
pub fn select_replica(hosts: &mut VecDeque<HostDisks>, replica: usize) -> Result<Vec<RedisAddr>> {
    if replica > hosts.len() {
        return Err(SdfsError::NoSpace(format!(
            "need {replica} replicas, only {} hosts available",
            hosts.len()
        )));
    }
    let mut out = Vec::with_capacity(replica);
    for _ in 0..replica {
        let ent = hosts.pop_front().expect("checked length above");
        let port = ent.disks[rand::thread_rng().gen_range(0..ent.disks.len())];
        out.push(RedisAddr {
            host: ent.host.clone(),
            port: port as u16,
        });
        hosts.push_back(ent);
    }
    Ok(out)
}

/// Picks `replica` addresses for one shard, dispatching to solo or
/// multi-host selection per `__md_mkvol_getredis_replica`'s own branch.
pub fn select_for_shard(
    hosts: &mut VecDeque<HostDisks>,
    replica: usize,
    solomode: bool,
) -> Result<Vec<RedisAddr>> {
    if solomode && hosts.len() == 1 {
        let contiguous: Vec<HostDisks> = hosts.iter().cloned().collect();
        select_solo(&contiguous, replica)
    } else {
        select_replica(hosts, replica)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str, disks: &[u32]) -> HostDisks {
        HostDisks {
            host: name.to_string(),
            disks: disks.to_vec(),
        }
    }

    #[test]
    fn select_solo_rejects_too_few_disks() {
        let hosts = [host("h1", &[0, 1])];
        assert!(select_solo(&hosts, 3).is_err());
    }

    #[test]
    fn select_solo_returns_exactly_replica_addrs() {
        let hosts = [host("h1", &[0, 1, 2, 3])];
        let addrs = select_solo(&hosts, 2).unwrap();
        assert_eq!(addrs.len(), 2);
        assert!(addrs.iter().all(|a| a.host == "h1"));
    }

    #[test]
    fn select_replica_rejects_when_not_enough_hosts() {
        let mut hosts: VecDeque<HostDisks> = VecDeque::from([host("h1", &[0])]);
        assert!(select_replica(&mut hosts, 2).is_err());
    }

    #[test]
    fn select_replica_rotates_hosts_to_back() {
        let mut hosts: VecDeque<HostDisks> =
            VecDeque::from([host("h1", &[0]), host("h2", &[0]), host("h3", &[0])]);
        let addrs = select_replica(&mut hosts, 2).unwrap();
        assert_eq!(addrs.len(), 2);
        // h1 and h2 were consumed and rotated to the back, h3 is now front.
        assert_eq!(hosts.front().unwrap().host, "h3");
    }
}
