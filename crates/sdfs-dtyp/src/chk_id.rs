//! Chunk identifier (`chk-id`). See design §3.

/// The type tag carried by a [`ChkId`].
///
/// The retrieved original source never enumerates the tag's full domain; it
/// only ever compares against a volume-root marker. We keep the set open
/// rather than guess the rest (see `DESIGN.md`, Open Question log).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ChunkType {
    /// An ordinary chunk of object data.
    Data,
    /// The root chunk of a volume.
    VolumeRoot,
    /// Any tag not covered above, carried through unchanged.
    Other(u8),
}

impl From<u8> for ChunkType {
    fn from(v: u8) -> Self {
        match v {
            0 => ChunkType::Data,
            1 => ChunkType::VolumeRoot,
            other => ChunkType::Other(other),
        }
    }
}

impl From<ChunkType> for u8 {
    fn from(t: ChunkType) -> Self {
        match t {
            ChunkType::Data => 0,
            ChunkType::VolumeRoot => 1,
            ChunkType::Other(v) => v,
        }
    }
}

/// Chunk identifier. Uniqueness is per `(volid, id, idx, snapshot)`.
/// Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChkId {
    pub id: u64,
    pub volid: u64,
    pub idx: u32,
    pub ty: ChunkType,
    pub snapshot: u64,
}

impl ChkId {
    pub fn new(id: u64, volid: u64, idx: u32, ty: ChunkType, snapshot: u64) -> Self {
        Self {
            id,
            volid,
            idx,
            ty,
            snapshot,
        }
    }

    /// The worker a chunk is pinned to, by `id mod n`. See design §4.6
    /// "worker affinity" — this is a load-balancer, not a correctness
    /// mechanism, but downstream code assumes chunks never move workers.
    pub fn worker_index(&self, worker_count: usize) -> usize {
        debug_assert!(worker_count > 0);
        (self.id % worker_count as u64) as usize
    }
}

impl std::fmt::Display for ChkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "chk({:#x},vol={:#x},idx={},snap={})",
            self.id, self.volid, self.idx, self.snapshot
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_index_is_stable() {
        let chk = ChkId::new(0x1234, 0xAA, 0, ChunkType::Data, 0);
        let a = chk.worker_index(8);
        let b = chk.worker_index(8);
        assert_eq!(a, b);
        assert!(a < 8);
    }

    #[test]
    fn chunk_type_roundtrips_through_u8() {
        for v in 0u8..=255 {
            let ty = ChunkType::from(v);
            assert_eq!(u8::from(ty), v);
        }
    }
}
