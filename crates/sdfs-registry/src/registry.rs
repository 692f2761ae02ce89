//! Discovery registry client (etcd v3 semantics).
//!
//! Every write is create-only: `etcd_create_text` in the source is a
//! linearizable "create if absent" — modeled here as a transaction whose
//! guard is `create_revision(key) == 0`. Directory delete removes a whole
//! key prefix, matching `etcd_del_dir`.

use etcd_client::{Client, Compare, CompareOp, DeleteOptions, GetOptions, Txn, TxnOp};
use sdfs_dtyp::{Result, SdfsError};

/// `Client` is a thin, cheaply-cloneable handle over a shared tonic
/// channel; every call here clones it so `Registry`'s own methods can take
/// `&self` the way the rest of the workspace's client wrappers do.
pub struct Registry {
    client: Client,
}

impl Registry {
    pub async fn connect(endpoints: &[String]) -> Result<Self> {
        let client = Client::connect(endpoints, None)
            .await
            .map_err(|e| SdfsError::io(libc::EIO, format!("etcd connect failed: {e}")))?;
        Ok(Self { client })
    }

    /// Creates `key = value` iff `key` does not already exist.
    pub async fn create_if_absent(&self, key: &str, value: &[u8]) -> Result<bool> {
        let cmp = Compare::create_revision(key, CompareOp::Equal, 0);
        let put = TxnOp::put(key, value, None);
        let txn = Txn::new().when([cmp]).and_then([put]);
        let resp = self
            .client
            .clone()
            .txn(txn)
            .await
            .map_err(|e| SdfsError::io(libc::EIO, format!("etcd txn failed: {e}")))?;
        Ok(resp.succeeded())
    }

    /// Idempotent create: succeeds whether or not the key already existed
    /// (the source treats `EEXIST` from `etcd_create_text` as success for
    /// `.wait` keys — design §5 `mkvol`).
    pub async fn create_idempotent(&self, key: &str, value: &[u8]) -> Result<()> {
        self.create_if_absent(key, value).await?;
        Ok(())
    }

    /// Create that surfaces `SdfsError::Exists` when the key is already
    /// present, used for the volume `id` key (the visibility boundary).
    pub async fn create(&self, key: &str, value: &[u8]) -> Result<()> {
        if self.create_if_absent(key, value).await? {
            Ok(())
        } else {
            Err(SdfsError::Exists(key.to_string()))
        }
    }

    /// Unconditional upsert, the analogue of `etcd_update_text` (unlike
    /// `create`, this always overwrites). Used for liveness triggers, not
    /// placement records — those are always create-only.
    pub async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.client
            .clone()
            .put(key, value, None)
            .await
            .map_err(|e| SdfsError::io(libc::EIO, format!("etcd put failed: {e}")))?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let resp = self
            .client
            .clone()
            .get(key, None)
            .await
            .map_err(|e| SdfsError::io(libc::EIO, format!("etcd get failed: {e}")))?;
        Ok(resp.kvs().first().map(|kv| kv.value().to_vec()))
    }

    /// Lists the direct children of `prefix`, returning each child's full
    /// key. Matches `etcd_list`'s enumeration of a directory.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let opts = GetOptions::new().with_prefix();
        let resp = self
            .client
            .clone()
            .get(prefix, Some(opts))
            .await
            .map_err(|e| SdfsError::io(libc::EIO, format!("etcd list failed: {e}")))?;
        Ok(resp
            .kvs()
            .iter()
            .filter_map(|kv| kv.key_str().ok().map(|s| s.to_string()))
            .collect())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .clone()
            .delete(key, None)
            .await
            .map_err(|e| SdfsError::io(libc::EIO, format!("etcd delete failed: {e}")))?;
        Ok(())
    }

    /// Deletes every key under `prefix`, the directory-delete `etcd_del_dir`.
    pub async fn delete_dir(&self, prefix: &str) -> Result<()> {
        let opts = DeleteOptions::new().with_prefix();
        self.client
            .clone()
            .delete(prefix, Some(opts))
            .await
            .map_err(|e| SdfsError::io(libc::EIO, format!("etcd delete_dir failed: {e}")))?;
        Ok(())
    }
}
