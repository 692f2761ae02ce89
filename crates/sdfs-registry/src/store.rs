//! The narrow surface `sdfs-placement` needs from the discovery registry,
//! factored out as a trait so its tests can swap in an in-memory fake
//! instead of a live etcd cluster (design §8).

use std::future::Future;

use sdfs_dtyp::Result;

use crate::Registry;

pub trait RegistryStore: Send + Sync {
    fn create_if_absent(&self, key: &str, value: &[u8]) -> impl Future<Output = Result<bool>> + Send;
    fn create_idempotent(&self, key: &str, value: &[u8]) -> impl Future<Output = Result<()>> + Send;
    fn create(&self, key: &str, value: &[u8]) -> impl Future<Output = Result<()>> + Send;
    fn put(&self, key: &str, value: &[u8]) -> impl Future<Output = Result<()>> + Send;
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;
    fn list(&self, prefix: &str) -> impl Future<Output = Result<Vec<String>>> + Send;
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
    fn delete_dir(&self, prefix: &str) -> impl Future<Output = Result<()>> + Send;
}

impl RegistryStore for Registry {
    async fn create_if_absent(&self, key: &str, value: &[u8]) -> Result<bool> {
        Registry::create_if_absent(self, key, value).await
    }

    async fn create_idempotent(&self, key: &str, value: &[u8]) -> Result<()> {
        Registry::create_idempotent(self, key, value).await
    }

    async fn create(&self, key: &str, value: &[u8]) -> Result<()> {
        Registry::create(self, key, value).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        Registry::put(self, key, value).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Registry::get(self, key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Registry::list(self, prefix).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        Registry::delete(self, key).await
    }

    async fn delete_dir(&self, prefix: &str) -> Result<()> {
        Registry::delete_dir(self, prefix).await
    }
}
