//! Segmented, reference-counted buffer and iovec projection (design §4.2).
//!
//! A [`SegBuffer`] is a flat logical byte range backed by one or more
//! [`Segment`]s. Cloning a `SegBuffer` shares the underlying segments via
//! `Arc` rather than copying bytes; `project` builds the `iovec`-equivalent
//! view handed to the disk gateway's vectored read/write calls.

use std::sync::Arc;

use sdfs_dtyp::io_descriptor::Y_MSG_MAX;
use smallvec::SmallVec;

/// Size of one buffer segment. Matches the page size the gateway aligns
/// `O_DIRECT` transfers to.
pub const BUFFER_SEG_SIZE: usize = 4096;

/// Upper bound on the number of segments a single `Y_MSG_MAX`-sized request
/// can project into, plus one for a partial leading/trailing segment.
pub const MAX_PROJECTED_SEGMENTS: usize = (Y_MSG_MAX as usize / BUFFER_SEG_SIZE) + 1;

#[derive(Debug, thiserror::Error)]
pub enum BufError {
    #[error("segment length {0} is not a multiple of the sector size")]
    Unaligned(usize),
    #[error("truncate_tail({0}) exceeds buffer length {1}")]
    TruncateOverrun(usize, usize),
}

/// A single page-aligned, reference-counted block of bytes.
#[derive(Debug)]
pub struct Segment {
    data: Box<[u8]>,
}

impl Segment {
    /// Allocates a zeroed segment of exactly `BUFFER_SEG_SIZE` bytes.
    fn new_zeroed() -> Self {
        Self {
            data: vec![0u8; BUFFER_SEG_SIZE].into_boxed_slice(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A borrowed, contiguous view into one segment, ready for handoff to a
/// vectored syscall. Stands in for the source's raw `iovec`.
#[derive(Debug, Clone, Copy)]
pub struct IoSlice<'a> {
    pub base: &'a [u8],
}

impl<'a> IoSlice<'a> {
    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }
}

/// The mutable counterpart of [`IoSlice`], used to project a buffer that's
/// about to be filled by a read.
#[derive(Debug)]
pub struct IoSliceMut<'a> {
    pub base: &'a mut [u8],
}

impl<'a> IoSliceMut<'a> {
    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }
}

/// A logical byte range backed by zero or more shared [`Segment`]s.
///
/// Cloning shares segments (`Arc::clone` per segment); it never copies
/// payload bytes. `len` is the logical length, which may be shorter than
/// `segments.len() * BUFFER_SEG_SIZE` when the tail segment is partial.
#[derive(Debug, Clone)]
pub struct SegBuffer {
    segments: Vec<Arc<Segment>>,
    len: usize,
}

impl SegBuffer {
    /// An empty buffer with no backing segments.
    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
            len: 0,
        }
    }

    /// A zero-filled buffer covering exactly `n` bytes, rounded up to whole
    /// segments internally but logically truncated to `n`.
    pub fn with_len(n: usize) -> Self {
        if n == 0 {
            return Self::empty();
        }
        let n_segments = n.div_ceil(BUFFER_SEG_SIZE);
        let segments = (0..n_segments)
            .map(|_| Arc::new(Segment::new_zeroed()))
            .collect();
        Self { segments, len: n }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Projects the logical range into a bounded list of [`IoSlice`]s
    /// suitable for a vectored `readv`/`writev`/`io_uring` submission.
    pub fn project(&self) -> SmallVec<[IoSlice<'_>; MAX_PROJECTED_SEGMENTS]> {
        let mut out = SmallVec::new();
        let mut remaining = self.len;
        for seg in &self.segments {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(seg.len());
            out.push(IoSlice {
                base: &seg.as_slice()[..take],
            });
            remaining -= take;
        }
        out
    }

    /// Projects the logical range as mutable slices, for a read to fill.
    /// Panics if any backing segment is shared (`Arc` strong count > 1) —
    /// callers must hold the only reference before reading into a buffer,
    /// same as the source requiring the caller to own an exclusive `tmp`.
    pub fn project_mut(&mut self) -> SmallVec<[IoSliceMut<'_>; MAX_PROJECTED_SEGMENTS]> {
        let mut out = SmallVec::new();
        let mut remaining = self.len;
        for seg in &mut self.segments {
            if remaining == 0 {
                break;
            }
            let seg_mut =
                Arc::get_mut(seg).expect("cannot project_mut a segment with shared ownership");
            let take = remaining.min(seg_mut.len());
            out.push(IoSliceMut {
                base: &mut seg_mut.as_mut_slice()[..take],
            });
            remaining -= take;
        }
        out
    }

    /// Drops the last `k` bytes from the logical range. Segments that fall
    /// fully outside the new length are released (their `Arc` refcount
    /// drops, but other clones sharing them are unaffected).
    pub fn truncate_tail(&mut self, k: usize) -> Result<(), BufError> {
        if k > self.len {
            return Err(BufError::TruncateOverrun(k, self.len));
        }
        self.len -= k;
        let keep_segments = self.len.div_ceil(BUFFER_SEG_SIZE).max(if self.len == 0 {
            0
        } else {
            1
        });
        self.segments.truncate(keep_segments);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_len_projects_to_exact_byte_count() {
        let buf = SegBuffer::with_len(BUFFER_SEG_SIZE + 10);
        let slices = buf.project();
        let total: usize = slices.iter().map(|s| s.len()).sum();
        assert_eq!(total, BUFFER_SEG_SIZE + 10);
        assert_eq!(slices.len(), 2);
    }

    #[test]
    fn clone_shares_segments_not_bytes() {
        let buf = SegBuffer::with_len(BUFFER_SEG_SIZE);
        let clone = buf.clone();
        assert_eq!(Arc::strong_count(&buf.segments[0]), 2);
        drop(clone);
        assert_eq!(Arc::strong_count(&buf.segments[0]), 1);
    }

    #[test]
    fn truncate_tail_shrinks_logical_length() {
        let mut buf = SegBuffer::with_len(BUFFER_SEG_SIZE * 2);
        buf.truncate_tail(BUFFER_SEG_SIZE + 1).unwrap();
        assert_eq!(buf.len(), BUFFER_SEG_SIZE - 1);
    }

    #[test]
    fn truncate_tail_rejects_overrun() {
        let mut buf = SegBuffer::with_len(10);
        assert!(buf.truncate_tail(11).is_err());
    }

    #[test]
    fn empty_buffer_projects_to_nothing() {
        assert!(SegBuffer::empty().project().is_empty());
    }

    #[test]
    fn project_mut_fills_exact_byte_count() {
        let mut buf = SegBuffer::with_len(BUFFER_SEG_SIZE + 10);
        for (i, mut slice) in buf.project_mut().into_iter().enumerate() {
            slice.base.fill(i as u8);
        }
        let total: usize = buf.project().iter().map(|s| s.len()).sum();
        assert_eq!(total, BUFFER_SEG_SIZE + 10);
    }
}
