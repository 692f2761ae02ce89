//! Volume identifier and the registry key-building helpers for placement
//! records (design §3's placement record table).

/// `(volid, snapvers)`. `snapvers == 0` means the live volume; non-zero
/// identifies a snapshot derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolId {
    pub volid: u64,
    pub snapvers: u64,
}

impl VolId {
    pub fn live(volid: u64) -> Self {
        Self { volid, snapvers: 0 }
    }

    pub fn is_live(&self) -> bool {
        self.snapvers == 0
    }
}

/// A volume's name in the registry, with the key-builders for every
/// placement-record path named in design §3.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VolumeName(pub String);

impl VolumeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn sharding_key(&self) -> String {
        format!("{}/sharding", self.0)
    }

    pub fn sharding_bak_key(&self) -> String {
        format!("{}/sharding.bak", self.0)
    }

    pub fn replica_key(&self) -> String {
        format!("{}/replica", self.0)
    }

    pub fn replica_bak_key(&self) -> String {
        format!("{}/replica.bak", self.0)
    }

    pub fn volid_key(&self) -> String {
        format!("{}/volid", self.0)
    }

    pub fn snapvers_key(&self) -> String {
        format!("{}/snapvers", self.0)
    }

    pub fn id_key(&self) -> String {
        format!("{}/id", self.0)
    }

    pub fn src_key(&self) -> String {
        format!("{}/src", self.0)
    }

    pub fn wait_key(&self, shard: u32, replica: u32) -> String {
        format!("{}/wait/{shard}/redis/{replica}.wait", self.0)
    }

    pub fn slot_key(&self, shard: u32, replica: u32) -> String {
        format!("{}/slot/{shard}/redis/{replica}", self.0)
    }

    pub fn slot_dir(&self, shard: u32) -> String {
        format!("{}/slot/{shard}", self.0)
    }

    pub fn slot_root(&self) -> String {
        format!("{}/slot", self.0)
    }

    pub fn subtree(&self) -> String {
        self.0.clone()
    }
}

/// A parsed `host,port` placement address, as stored at a `.wait`/`slot` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RedisAddr {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for RedisAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.host, self.port)
    }
}

impl std::str::FromStr for RedisAddr {
    type Err = crate::SdfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .split_once(',')
            .ok_or_else(|| crate::SdfsError::Internal(format!("malformed redis addr {s:?}")))?;
        let port = port
            .parse()
            .map_err(|_| crate::SdfsError::Internal(format!("malformed redis port {s:?}")))?;
        Ok(RedisAddr {
            host: host.to_string(),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addr_roundtrips() {
        let addr = RedisAddr {
            host: "10.0.0.1".into(),
            port: 7001,
        };
        let s = addr.to_string();
        let parsed: RedisAddr = s.parse().unwrap();
        assert_eq!(addr, parsed);
    }

    #[test]
    fn keys_match_design_layout() {
        let name = VolumeName::new("v1");
        assert_eq!(name.wait_key(0, 1), "v1/wait/0/redis/1.wait");
        assert_eq!(name.slot_key(2, 0), "v1/slot/2/redis/0");
        assert_eq!(name.id_key(), "v1/id");
    }
}
