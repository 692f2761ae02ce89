//! An in-process [`RegistryStore`] backed by a `Mutex<BTreeMap>`, for
//! exercising `sdfs-placement` without a live etcd cluster (design §8).

use std::collections::BTreeMap;
use std::sync::Mutex;

use sdfs_dtyp::Result;

use crate::store::RegistryStore;

#[derive(Default)]
pub struct MemRegistry {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for MemRegistry {
    async fn create_if_absent(&self, key: &str, value: &[u8]) -> Result<bool> {
        let mut data = self.data.lock().expect("mem registry lock poisoned");
        if data.contains_key(key) {
            Ok(false)
        } else {
            data.insert(key.to_string(), value.to_vec());
            Ok(true)
        }
    }

    async fn create_idempotent(&self, key: &str, value: &[u8]) -> Result<()> {
        self.create_if_absent(key, value).await?;
        Ok(())
    }

    async fn create(&self, key: &str, value: &[u8]) -> Result<()> {
        if self.create_if_absent(key, value).await? {
            Ok(())
        } else {
            Err(sdfs_dtyp::SdfsError::Exists(key.to_string()))
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.data
            .lock()
            .expect("mem registry lock poisoned")
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().expect("mem registry lock poisoned").get(key).cloned())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .data
            .lock()
            .expect("mem registry lock poisoned")
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.lock().expect("mem registry lock poisoned").remove(key);
        Ok(())
    }

    async fn delete_dir(&self, prefix: &str) -> Result<()> {
        self.data
            .lock()
            .expect("mem registry lock poisoned")
            .retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_if_absent_is_create_only() {
        let reg = MemRegistry::new();
        assert!(reg.create_if_absent("a", b"1").await.unwrap());
        assert!(!reg.create_if_absent("a", b"2").await.unwrap());
        assert_eq!(reg.get("a").await.unwrap().unwrap(), b"1");
    }

    #[tokio::test]
    async fn list_matches_prefix_only() {
        let reg = MemRegistry::new();
        reg.put("a/1", b"x").await.unwrap();
        reg.put("a/2", b"x").await.unwrap();
        reg.put("b/1", b"x").await.unwrap();
        let mut keys = reg.list("a/").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a/1".to_string(), "a/2".to_string()]);
    }

    #[tokio::test]
    async fn delete_dir_removes_only_matching_prefix() {
        let reg = MemRegistry::new();
        reg.put("a/1", b"x").await.unwrap();
        reg.put("b/1", b"x").await.unwrap();
        reg.delete_dir("a/").await.unwrap();
        assert!(reg.get("a/1").await.unwrap().is_none());
        assert!(reg.get("b/1").await.unwrap().is_some());
    }
}
