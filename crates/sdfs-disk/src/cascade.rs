//! Path hasher (C1): maps a chunk id to a two-level hex directory cascade,
//! avoiding a single directory with millions of entries.
//!
//! Fixed at build time: `L = 2` levels of `B = 8` bits each, i.e. the two
//! low bytes of the chunk id become two nested hex directory components.
//! Matches `cascade_id2path`'s two-level fan-out, followed by a separate
//! `{volid}_v{snapvers}` directory and the chunk index, per
//! `__disk_build_chkpath`'s `"%s/disk/%u/%s_v%llu/%u"` path shape.

use std::path::PathBuf;

use sdfs_dtyp::ChkId;

/// Number of cascade levels.
pub const L: u32 = 2;
/// Bits consumed per level (one hex byte).
pub const B: u32 = 8;

/// The two-level hex directory component derived from `id`'s low 16 bits,
/// e.g. id `0x1234` → `"34/12"` (least-significant byte first, matching
/// the innermost-first fan-out a cascading hash directory wants).
fn cascade_component(id: u64) -> String {
    let low = id & 0xffff;
    let b0 = low & 0xff;
    let b1 = (low >> 8) & 0xff;
    format!("{b0:02x}/{b1:02x}")
}

/// Builds the on-disk path for `chk` at snapshot version `snapvers` and
/// replication `level`, rooted at `workdir`:
/// `{workdir}/disk/{level}/{cascade(id)}/{volid}_v{snapvers}/{idx}`.
pub fn chunk_path(workdir: &std::path::Path, level: u32, chk: &ChkId, snapvers: u64) -> PathBuf {
    workdir
        .join("disk")
        .join(level.to_string())
        .join(cascade_component(chk.id))
        .join(format!("{}_v{snapvers}", chk.volid))
        .join(chk.idx.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdfs_dtyp::ChunkType;

    #[test]
    fn path_is_stable_and_deterministic() {
        let chk = ChkId::new(0x1234, 7, 3, ChunkType::Data, 0);
        let a = chunk_path(std::path::Path::new("/data"), 0, &chk, 0);
        let b = chunk_path(std::path::Path::new("/data"), 0, &chk, 0);
        assert_eq!(a, b);
        assert_eq!(
            a,
            std::path::PathBuf::from("/data/disk/0/34/12/7_v0/3")
        );
    }

    #[test]
    fn different_low_bytes_fan_out_to_different_dirs() {
        let a = chunk_path(
            std::path::Path::new("/data"),
            0,
            &ChkId::new(0x0001, 1, 0, ChunkType::Data, 0),
            0,
        );
        let b = chunk_path(
            std::path::Path::new("/data"),
            0,
            &ChkId::new(0x0002, 1, 0, ChunkType::Data, 0),
            0,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn snapshot_and_live_chunk_resolve_to_different_paths() {
        let chk = ChkId::new(0x1234, 7, 3, ChunkType::Data, 0);
        let live = chunk_path(std::path::Path::new("/data"), 0, &chk, 0);
        let snap = chunk_path(std::path::Path::new("/data"), 0, &chk, 1);
        assert_ne!(live, snap);
    }
}
