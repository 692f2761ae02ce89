//! Sharded per-volume KV backend (spec's own vocabulary, which is Redis's:
//! `hset/hget/hdel/hlen/hscan/kdel/klock/kunlock`, plus `INFO replication`
//! for the snapshot sync waiter, C8).

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use sdfs_dtyp::{Result, SdfsError};

/// Flags recognized by `hset` (spec §6): `O_CREAT`, `O_EXCL`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HSetFlags {
    pub creat: bool,
    pub excl: bool,
}

impl HSetFlags {
    pub const CREAT: HSetFlags = HSetFlags {
        creat: true,
        excl: false,
    };
    pub const EXCL: HSetFlags = HSetFlags {
        creat: false,
        excl: true,
    };
    pub const CREAT_EXCL: HSetFlags = HSetFlags {
        creat: true,
        excl: true,
    };
}

/// A replication snapshot parsed from `INFO replication` (C8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationInfo {
    pub role: String,
    pub master_host: Option<String>,
    pub master_port: Option<u16>,
    pub master_repl_offset: Option<u64>,
    pub slave_repl_offset: Option<u64>,
}

impl ReplicationInfo {
    /// True once the replica has caught up to the master's offset,
    /// matching `__redis_replica_synced`'s string comparison.
    pub fn is_synced(&self) -> bool {
        match (self.master_repl_offset, self.slave_repl_offset) {
            (Some(m), Some(s)) => m == s,
            _ => false,
        }
    }

    fn parse(text: &str) -> Self {
        let mut role = String::from("unknown");
        let mut master_host = None;
        let mut master_port = None;
        let mut master_repl_offset = None;
        let mut slave_repl_offset = None;
        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            match key {
                "role" => role = value.to_string(),
                "master_host" => master_host = Some(value.trim().to_string()),
                "master_port" => master_port = value.trim().parse().ok(),
                "master_repl_offset" => master_repl_offset = value.trim().parse().ok(),
                "slave_repl_offset" => slave_repl_offset = value.trim().parse().ok(),
                _ => {}
            }
        }
        Self {
            role,
            master_host,
            master_port,
            master_repl_offset,
            slave_repl_offset,
        }
    }
}

pub struct Kv {
    conn: MultiplexedConnection,
}

impl Kv {
    pub async fn connect(addr: &str) -> Result<Self> {
        let client = redis::Client::open(format!("redis://{addr}"))
            .map_err(|e| SdfsError::io(libc::EIO, format!("bad redis addr {addr}: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| SdfsError::io(libc::EIO, format!("redis connect to {addr} failed: {e}")))?;
        Ok(Self { conn })
    }

    /// `hset(k, field, val, flag)`. `O_EXCL` without `O_CREAT` is a no-op
    /// guard; with `O_CREAT|O_EXCL` the write only happens if the field is
    /// absent, surfacing `SdfsError::Exists` otherwise.
    pub async fn hset(&mut self, key: &str, field: &str, val: &[u8], flags: HSetFlags) -> Result<()> {
        if flags.excl {
            let existed: bool = self
                .conn
                .hexists(key, field)
                .await
                .map_err(redis_err("hexists"))?;
            if existed {
                return Err(SdfsError::Exists(format!("{key}/{field}")));
            }
        }
        self.conn
            .hset(key, field, val)
            .await
            .map_err(redis_err("hset"))
    }

    pub async fn hget(&mut self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        self.conn.hget(key, field).await.map_err(redis_err("hget"))
    }

    pub async fn hdel(&mut self, key: &str, field: &str) -> Result<()> {
        self.conn.hdel(key, field).await.map_err(redis_err("hdel"))
    }

    pub async fn hlen(&mut self, key: &str) -> Result<u64> {
        self.conn.hlen(key).await.map_err(redis_err("hlen"))
    }

    /// `hscan(k, cursor, match) -> [field, value ...]`. Returns the raw
    /// pairs for one scan cursor step; callers drive the cursor loop.
    pub async fn hscan(&mut self, key: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let mut iter = self
            .conn
            .hscan::<_, (String, Vec<u8>)>(key)
            .await
            .map_err(redis_err("hscan"))?;
        let mut out = Vec::new();
        while let Some(pair) = futures_util::StreamExt::next(&mut iter).await {
            out.push(pair);
        }
        Ok(out)
    }

    pub async fn kdel(&mut self, key: &str) -> Result<()> {
        self.conn.del(key).await.map_err(redis_err("kdel"))
    }

    /// Advisory lock via `SET key NX EX seconds`, forcing past an existing
    /// lock when `force` is set (matching `klock(k, seconds, force)`).
    pub async fn klock(&mut self, key: &str, seconds: u64, force: bool) -> Result<bool> {
        let lock_key = format!("{key}.lock");
        if force {
            let _: () = self.conn.set_ex(&lock_key, 1, seconds).await.map_err(redis_err("klock"))?;
            return Ok(true);
        }
        let acquired: bool = redis::cmd("SET")
            .arg(&lock_key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(seconds)
            .query_async::<Option<String>>(&mut self.conn)
            .await
            .map_err(redis_err("klock"))?
            .is_some();
        Ok(acquired)
    }

    pub async fn kunlock(&mut self, key: &str) -> Result<()> {
        self.conn
            .del(format!("{key}.lock"))
            .await
            .map_err(redis_err("kunlock"))
    }

    /// Parses `INFO replication` for the snapshot sync waiter (C8).
    pub async fn info_replication(&mut self) -> Result<ReplicationInfo> {
        let text: String = redis::cmd("INFO")
            .arg("replication")
            .query_async(&mut self.conn)
            .await
            .map_err(redis_err("info replication"))?;
        Ok(ReplicationInfo::parse(&text))
    }
}

fn redis_err(op: &'static str) -> impl FnOnce(redis::RedisError) -> SdfsError {
    move |e| SdfsError::io(libc::EIO, format!("redis {op} failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_replication_info_synced() {
        let text = "role:slave\r\nmaster_repl_offset:100\r\nslave_repl_offset:100\r\n";
        let info = ReplicationInfo::parse(text);
        assert!(info.is_synced());
    }

    #[test]
    fn parses_replication_info_behind() {
        let text = "role:slave\r\nmaster_repl_offset:150\r\nslave_repl_offset:100\r\n";
        let info = ReplicationInfo::parse(text);
        assert!(!info.is_synced());
    }

    #[test]
    fn missing_offsets_are_not_synced() {
        let text = "role:master\r\n";
        let info = ReplicationInfo::parse(text);
        assert!(!info.is_synced());
    }
}
