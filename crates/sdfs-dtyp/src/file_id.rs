//! `FileId`: the one wire-adjacent binary value, stored at a volume's `id`
//! key (design §3). Encoded with `binrw`, matching the teacher's own
//! choice of binary-encoding crate.

use binrw::{BinRead, BinWrite};

/// Fixed-layout identity record written to `<name>/id`.
///
/// The id key is always written last when creating a volume — its presence
/// is the visibility boundary a lookup waits on (design §5, `mkvol`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinRead, BinWrite)]
#[brw(little)]
pub struct FileId {
    pub volid: u64,
    pub snapvers: u64,
    pub ctime: u64,
}

impl FileId {
    pub fn new(volid: u64, snapvers: u64, ctime: u64) -> Self {
        Self {
            volid,
            snapvers,
            ctime,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        self.write(&mut buf).expect("FileId encoding is infallible");
        buf.into_inner()
    }

    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        let mut cursor = std::io::Cursor::new(bytes);
        FileId::read(&mut cursor)
            .map_err(|e| crate::SdfsError::Internal(format!("malformed FileId: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_bytes() {
        let id = FileId::new(0xdead_beef, 3, 1_700_000_000);
        let bytes = id.to_bytes();
        let back = FileId::from_bytes(&bytes).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn rejects_truncated_bytes() {
        assert!(FileId::from_bytes(&[0u8; 4]).is_err());
    }
}
