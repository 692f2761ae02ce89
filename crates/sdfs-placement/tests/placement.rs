use std::sync::Arc;
use std::time::Duration;

use sdfs_placement::{mkvol, rmvol};
use sdfs_registry::{MemRegistry, RegistryStore};

async fn seed_disk(reg: &MemRegistry, host: &str, disk: u32) {
    reg.put(&format!("redis/{host}/disk/{disk}/instence"), b"0")
        .await
        .unwrap();
}

/// Stands in for the redis-side watcher that flips a disk's `trigger` key
/// back to `"0"` once it has provisioned an instance (`__md_mkvol_online`'s
/// counterpart).
async fn fake_redis_watcher(reg: Arc<MemRegistry>) {
    loop {
        let keys = reg.list("redis/").await.unwrap();
        for key in keys {
            if key.ends_with("/trigger") {
                if let Some(v) = reg.get(&key).await.unwrap() {
                    if v == b"1" {
                        reg.put(&key, b"0").await.unwrap();
                    }
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn mkvol_with_no_online_disks_errors() {
    let reg = MemRegistry::new();
    let err = mkvol(&reg, "vol-empty", 1, 2, false).await.unwrap_err();
    assert!(matches!(err, sdfs_dtyp::SdfsError::NoSpace(_)));
}

#[tokio::test]
async fn mkvol_solo_mode_writes_id_and_wait_keys() {
    let reg = Arc::new(MemRegistry::new());
    seed_disk(&reg, "host-a", 0).await;
    seed_disk(&reg, "host-a", 1).await;

    let watcher = tokio::spawn(fake_redis_watcher(Arc::clone(&reg)));

    let (fileid, addrs) = mkvol(&*reg, "vol1", 1, 2, true).await.unwrap();
    watcher.abort();

    assert_eq!(addrs.len(), 2);
    assert!(reg.get("vol1/id").await.unwrap().is_some());
    assert!(reg.get("vol1/wait/0/redis/0.wait").await.unwrap().is_some());
    assert!(reg.get("vol1/wait/0/redis/1.wait").await.unwrap().is_some());
    assert_eq!(
        reg.get("vol1/volid").await.unwrap().unwrap(),
        fileid.volid.to_string().into_bytes()
    );
}

#[tokio::test]
async fn mkvol_is_idempotent_on_retry() {
    let reg = Arc::new(MemRegistry::new());
    seed_disk(&reg, "host-a", 0).await;
    seed_disk(&reg, "host-a", 1).await;
    let watcher = tokio::spawn(fake_redis_watcher(Arc::clone(&reg)));

    let (fileid1, _) = mkvol(&*reg, "vol2", 1, 2, true).await.unwrap();

    // A second mkvol of the same name must fail on the id-key guard rather
    // than silently overwriting the volume's identity.
    let err = mkvol(&*reg, "vol2", 1, 2, true).await.unwrap_err();
    watcher.abort();

    assert!(matches!(err, sdfs_dtyp::SdfsError::Exists(_)));
    assert!(fileid1.volid > 0);
}

#[tokio::test]
async fn rmvol_removes_placement_records() {
    let reg = Arc::new(MemRegistry::new());
    seed_disk(&reg, "host-a", 0).await;
    seed_disk(&reg, "host-a", 1).await;
    let watcher = tokio::spawn(fake_redis_watcher(Arc::clone(&reg)));

    mkvol(&*reg, "vol3", 1, 2, true).await.unwrap();
    rmvol(&*reg, "vol3").await.unwrap();
    watcher.abort();

    assert!(reg.get("vol3/id").await.unwrap().is_none());
    assert!(reg.get("vol3/sharding").await.unwrap().is_none());
    assert!(reg.get("vol3/replica").await.unwrap().is_none());
    assert!(reg.list("vol3/").await.unwrap().is_empty());
}
