//! The splitter: turns a selected free block into a busy block, carving
//! off a residual free block when there's enough left over to bother.

use core::ptr::NonNull;

use crate::header::BlockHeader;

/// Grants `required` payload bytes out of `selected`, splitting off a
/// residual free block when the leftover would be large enough to form
/// one, and returns the payload address the caller should receive.
///
/// # Safety
/// `selected` must be a live, free block with `payload_len() >= required`,
/// reachable from the owning [`crate::Heap`]'s block list.
pub(crate) unsafe fn split_or_grant(
    selected: NonNull<BlockHeader>,
    required: usize,
) -> NonNull<u8> {
    // SAFETY: caller guarantees `selected` is live.
    let available = unsafe { selected.as_ref() }.payload_len();
    debug_assert!(available >= required);

    if available - required < BlockHeader::SPLIT_THRESHOLD {
        // Not enough left over to form a legal free block: grant the
        // whole thing. The requester sees `required` bytes; the rest is
        // internal fragmentation recoverable only when this block is
        // released.
        unsafe { (*selected.as_ptr()).mark_busy() };
    } else {
        // SAFETY: caller guarantees `selected` is live; `next` is read
        // before `selected` is overwritten below.
        let tail_next = unsafe { selected.as_ref() }.next;
        let residual_payload = available - required - BlockHeader::HEADER_SIZE;

        // SAFETY: `required` bytes past `selected`'s payload start, plus
        // one header, is still within `selected`'s original block because
        // `available - required >= SPLIT_THRESHOLD > 0`.
        let residual: NonNull<BlockHeader> = unsafe {
            selected
                .cast::<u8>()
                .byte_add(BlockHeader::HEADER_SIZE + required)
                .cast()
        };
        // SAFETY: `residual` is freshly carved, unaliased memory.
        unsafe {
            residual.as_ptr().write(BlockHeader {
                next: tail_next,
                size_status: residual_payload,
            });
        }

        // SAFETY: `selected` is live and exclusively ours to mutate.
        unsafe {
            let block = &mut *selected.as_ptr();
            block.next = Some(residual);
            block.size_status = required;
            block.mark_busy();
        }
    }

    // SAFETY: `selected` is live.
    unsafe { BlockHeader::payload_ptr(selected) }
}
