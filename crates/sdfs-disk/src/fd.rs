//! File handle acquirer (C5): build path, `mkdir -p` parents, `open`.
//!
//! Always executed as a `newthread` of operation class `Replica` — both
//! `mkdir` and `open` can block. Errors map the raw kernel errno unchanged,
//! via `SdfsError::Io`.

use std::fs::OpenOptions;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::os::unix::io::{IntoRawFd, RawFd};
use std::path::{Path, PathBuf};

use sdfs_dtyp::{ChkId, Result, SdfsError};

use crate::cascade;

/// Open flags requested by a caller. Mirrors the source's raw `flag` int,
/// minus the bits (`O_RDWR`/`O_CREAT`) every acquisition already implies.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    pub direct: bool,
    pub sync: bool,
}

impl OpenFlags {
    fn to_raw(self) -> i32 {
        let mut flags = libc::O_RDWR | libc::O_CREAT;
        if self.direct {
            flags |= libc::O_DIRECT;
        }
        if self.sync {
            flags |= libc::O_SYNC;
        }
        flags
    }
}

/// Creates every missing parent directory of `path` with mode `0700`,
/// tolerating a directory that already exists (idempotent, as
/// `path_validate(..., YLIB_DIRCREATE)` is in the source).
fn ensure_parents(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(parent)
            .map_err(SdfsError::from)?;
    }
    Ok(())
}

/// `getfd(chk-id, snapvers, flags) -> (fd, path)`. Builds the path via C1,
/// creates missing parents, opens with the requested flags and mode
/// `0600`. Blocking; run this inside `Scheduler::newthread`.
pub fn getfd(
    workdir: &Path,
    level: u32,
    chk: &ChkId,
    snapvers: u64,
    flags: OpenFlags,
) -> Result<(RawFd, PathBuf)> {
    let path = cascade::chunk_path(workdir, level, chk, snapvers);
    ensure_parents(&path)?;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .mode(0o600)
        .custom_flags(flags.to_raw() & !(libc::O_RDWR | libc::O_CREAT))
        .open(&path)
        .map_err(|e| {
            SdfsError::io(
                e.raw_os_error().unwrap_or(libc::EIO),
                format!("open {} failed", path.display()),
            )
        })?;

    Ok((file.into_raw_fd(), path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdfs_dtyp::ChunkType;

    #[test]
    fn getfd_creates_parents_and_opens() {
        let tmp = tempfile::tempdir().unwrap();
        let chk = ChkId::new(1, 1, 0, ChunkType::Data, 0);
        let (fd, path) = getfd(tmp.path(), 0, &chk, 0, OpenFlags::default()).unwrap();
        assert!(path.exists());
        unsafe {
            libc::close(fd);
        }
    }

    #[test]
    fn getfd_is_idempotent_across_calls() {
        let tmp = tempfile::tempdir().unwrap();
        let chk = ChkId::new(2, 1, 0, ChunkType::Data, 0);
        let (fd1, path1) = getfd(tmp.path(), 0, &chk, 0, OpenFlags::default()).unwrap();
        unsafe {
            libc::close(fd1);
        }
        let (fd2, path2) = getfd(tmp.path(), 0, &chk, 0, OpenFlags::default()).unwrap();
        unsafe {
            libc::close(fd2);
        }
        assert_eq!(path1, path2);
    }
}
