//! I/O descriptor (`io`). See design §3.

use crate::ChkId;

/// The configured ceiling on a single message's payload, `Y_MSG_MAX` in the
/// source. Bounds both `IoDescriptor::size` and the iovec projection count
/// in `sdfs-buf`.
pub const Y_MSG_MAX: u32 = 1 << 20; // 1 MiB

/// Sector size used to gate the direct-I/O fast path (design §4.6).
pub const SECTOR_SIZE: u64 = 512;

/// `(chk-id, snapvers, offset, size)`. Invariant: `size > 0 && size <= Y_MSG_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IoDescriptor {
    pub chk: ChkId,
    pub snapvers: u64,
    pub offset: u64,
    pub size: u32,
}

impl std::fmt::Display for IoDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "io({},snapvers={},offset={},size={})",
            self.chk, self.snapvers, self.offset, self.size
        )
    }
}

impl IoDescriptor {
    pub fn new(chk: ChkId, snapvers: u64, offset: u64, size: u32) -> Self {
        Self {
            chk,
            snapvers,
            offset,
            size,
        }
    }

    /// Returns true when `offset` and `size` are sector-aligned, the
    /// precondition `write`/`read` check (along with `io_sync`) before
    /// choosing the direct path.
    pub fn is_sector_aligned(&self) -> bool {
        self.offset % SECTOR_SIZE == 0 && u64::from(self.size) % SECTOR_SIZE == 0
    }

    pub fn validate(&self, chunk_size: u64) -> Result<(), crate::SdfsError> {
        if self.size == 0 {
            return Err(crate::SdfsError::Internal(
                "io descriptor has zero size".into(),
            ));
        }
        if self.size > Y_MSG_MAX {
            return Err(crate::SdfsError::Internal(format!(
                "io descriptor size {} exceeds Y_MSG_MAX {}",
                self.size, Y_MSG_MAX
            )));
        }
        if self.offset + u64::from(self.size) > chunk_size {
            return Err(crate::SdfsError::Internal(format!(
                "io descriptor [{}..{}) exceeds chunk size {}",
                self.offset,
                self.offset + u64::from(self.size),
                chunk_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChunkType;

    fn chk() -> ChkId {
        ChkId::new(1, 1, 0, ChunkType::Data, 0)
    }

    #[test]
    fn alignment_check() {
        let io = IoDescriptor::new(chk(), 0, 512, 1024);
        assert!(io.is_sector_aligned());
        let io = IoDescriptor::new(chk(), 0, 1, 100);
        assert!(!io.is_sector_aligned());
    }

    #[test]
    fn validate_rejects_overrun() {
        let io = IoDescriptor::new(chk(), 0, 4096, 4096);
        assert!(io.validate(8192).is_ok());
        assert!(io.validate(4096).is_err());
    }
}
