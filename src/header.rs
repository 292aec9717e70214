//! Block header layout and the free/busy tag codec.
//!
//! This is the one module allowed to know what a block looks like in memory.
//! Every other module reaches a [`BlockHeader`] only through the pointers
//! handed back by [`crate::policy`], [`crate::split`] or [`crate::coalesce`]
//! and never re-derives header addresses itself.

use core::mem::{align_of, size_of};
use core::ptr::NonNull;

use static_assertions::const_assert;

/// Per-block metadata, placed immediately before the block's payload.
///
/// The blocks of a [`crate::Heap`] form a singly linked, address-ordered
/// list threaded through `next`; the list includes busy blocks as well as
/// free ones, so walking it from the head always visits the whole region.
///
/// `size_status` multiplexes two facts into one integer: the payload size
/// (always a multiple of 4) in the high bits, and free/busy in bit 0. A
/// free block stores its payload size verbatim; a busy block stores
/// `payload size + 1`. This is the only field any code should touch the
/// low bit of — see [`BlockHeader::is_free`], [`BlockHeader::mark_busy`]
/// and [`BlockHeader::mark_free`].
#[repr(C)]
pub(crate) struct BlockHeader {
    pub(crate) next: Option<NonNull<BlockHeader>>,
    pub(crate) size_status: usize,
}

// `next` is represented as a single pointer thanks to the null-pointer
// optimization on `Option<NonNull<_>>`, so this holds regardless of target
// pointer width; pinning it here means a future field addition that breaks
// the optimization fails the build instead of silently corrupting the
// encoding described in the module docs.
const_assert!(size_of::<BlockHeader>() == 2 * size_of::<usize>());
const_assert!(align_of::<BlockHeader>() >= 4);
const_assert!(size_of::<BlockHeader>() % 4 == 0);

impl BlockHeader {
    /// `H` in the design notes: the constant number of bytes a header
    /// occupies ahead of every block's payload.
    pub(crate) const HEADER_SIZE: usize = size_of::<BlockHeader>();

    /// The smallest payload a legal free block may hold.
    pub(crate) const MIN_PAYLOAD: usize = 4;

    /// One header plus the minimum payload: the smallest residual a split
    /// may leave behind without producing an unusable sliver.
    pub(crate) const SPLIT_THRESHOLD: usize = Self::HEADER_SIZE + Self::MIN_PAYLOAD;

    #[inline]
    pub(crate) fn is_free(&self) -> bool {
        self.size_status % 2 == 0
    }

    #[inline]
    pub(crate) fn mark_busy(&mut self) {
        if self.is_free() {
            self.size_status += 1;
        }
    }

    #[inline]
    pub(crate) fn mark_free(&mut self) {
        if !self.is_free() {
            self.size_status -= 1;
        }
    }

    /// The payload size in bytes, with the busy tag (if any) stripped off.
    #[inline]
    pub(crate) fn payload_len(&self) -> usize {
        self.size_status & !1
    }

    /// The address one past this header, i.e. the first payload byte.
    ///
    /// # Safety
    /// `header` must point at a live `BlockHeader`.
    #[inline]
    pub(crate) unsafe fn payload_ptr(header: NonNull<BlockHeader>) -> NonNull<u8> {
        unsafe { header.cast::<u8>().byte_add(Self::HEADER_SIZE) }
    }

    /// Recovers the header address from a payload pointer previously
    /// produced by [`BlockHeader::payload_ptr`].
    ///
    /// # Safety
    /// `payload` must be exactly `HEADER_SIZE` bytes past a live header;
    /// the caller must have already checked it lies inside the region.
    #[inline]
    pub(crate) unsafe fn header_of(payload: NonNull<u8>) -> NonNull<BlockHeader> {
        unsafe { payload.byte_sub(Self::HEADER_SIZE).cast() }
    }

    /// The address one past this header's payload, i.e. where the next
    /// contiguous block (if any) begins.
    ///
    /// # Safety
    /// `header` must point at a live `BlockHeader`.
    #[inline]
    pub(crate) unsafe fn block_end(header: NonNull<BlockHeader>) -> NonNull<u8> {
        let payload_len = unsafe { header.as_ref() }.payload_len();
        unsafe { BlockHeader::payload_ptr(header).byte_add(payload_len) }
    }
}

/// Rounds `n` up to the next multiple of 4, the payload granularity.
#[inline]
pub(crate) fn round_up_to_4(n: usize) -> usize {
    (n + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_up_to_4_covers_boundary_cases() {
        assert_eq!(round_up_to_4(1), 4);
        assert_eq!(round_up_to_4(2), 4);
        assert_eq!(round_up_to_4(3), 4);
        assert_eq!(round_up_to_4(4), 4);
        assert_eq!(round_up_to_4(5), 8);
    }

    #[test]
    fn tag_codec_round_trips() {
        let mut header = BlockHeader {
            next: None,
            size_status: 24,
        };
        assert!(header.is_free());
        assert_eq!(header.payload_len(), 24);

        header.mark_busy();
        assert!(!header.is_free());
        assert_eq!(header.size_status, 25);
        assert_eq!(header.payload_len(), 24);

        // marking an already-busy block busy again is a no-op
        header.mark_busy();
        assert_eq!(header.size_status, 25);

        header.mark_free();
        assert!(header.is_free());
        assert_eq!(header.size_status, 24);

        // marking an already-free block free again is a no-op
        header.mark_free();
        assert_eq!(header.size_status, 24);
    }
}
