//! The public surface: [`Heap`], the owned handle to one region.
//!
//! There is deliberately no process-global heap here. A `Heap` owns its
//! region for as long as it's alive and every operation takes `&mut self`,
//! so two heaps (or two threads without external synchronization) can never
//! touch the same block list at once. Wrapping one in a mutex to share it is
//! the caller's job — see the crate-level docs.

use core::ptr::NonNull;

use crate::coalesce;
use crate::dump::{self, HeapDump};
use crate::error::{AllocError, InitError, ReleaseError};
use crate::header::{self, BlockHeader};
use crate::policy::Policy;
use crate::provider::{MmapRegionProvider, RegionProvider};
use crate::split;

/// A single contiguous region of memory, carved up on demand.
///
/// Construct one with [`Heap::new`] (or [`Heap::with_provider`] to supply
/// your own [`RegionProvider`]), then [`Heap::allocate`] and
/// [`Heap::release`] payload pointers within it.
#[derive(Debug)]
pub struct Heap {
    base: NonNull<u8>,
    len: usize,
    head: NonNull<BlockHeader>,
    policy: Policy,
}

impl Heap {
    /// Maps a fresh region at least `requested_bytes` long from the host
    /// and returns a heap that places allocations according to `policy`.
    ///
    /// `requested_bytes` is rounded up to the host's page size; the heap's
    /// actual capacity (and hence the single free block it starts with)
    /// may be larger than requested.
    pub fn new(requested_bytes: usize, policy: Policy) -> Result<Self, InitError> {
        Self::with_provider(requested_bytes, policy, &MmapRegionProvider)
    }

    /// Like [`Heap::new`], but acquires the backing region from `provider`
    /// instead of the default `mmap`-backed one. Tests use this to run
    /// against [`crate::HeapBackedRegionProvider`] without depending on
    /// `libc`.
    pub fn with_provider(
        requested_bytes: usize,
        policy: Policy,
        provider: &dyn RegionProvider,
    ) -> Result<Self, InitError> {
        if requested_bytes == 0 {
            return Err(InitError::NonPositiveSize);
        }

        let page_size = provider.page_size();
        let len = header::round_up_to_4(requested_bytes).div_ceil(page_size) * page_size;
        let region = provider.acquire(len)?;

        let head: NonNull<BlockHeader> = region.base.cast();
        // SAFETY: `region` is a fresh, exclusively-owned, writable range of
        // at least `len >= HEADER_SIZE` bytes (a page is always larger than
        // one header), so writing the sole initial block header at its
        // start is in bounds and unaliased.
        unsafe {
            head.as_ptr().write(BlockHeader {
                next: None,
                size_status: len - BlockHeader::HEADER_SIZE,
            });
        }

        log::debug!(
            "heap initialized: {len} bytes at {:p}, policy {policy:?}",
            region.base
        );

        Ok(Heap {
            base: region.base,
            len,
            head,
            policy,
        })
    }

    /// The placement policy this heap was constructed with.
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Hands out a payload pointer with room for at least `size_bytes`,
    /// chosen by this heap's [`Policy`].
    pub fn allocate(&mut self, size_bytes: usize) -> Result<NonNull<u8>, AllocError> {
        if size_bytes == 0 {
            return Err(AllocError::NonPositiveSize);
        }
        let required = header::round_up_to_4(size_bytes);

        let selected = crate::policy::select(self.head, self.policy, required)
            .ok_or(AllocError::OutOfMemory { requested: required })?;

        // SAFETY: `selected` was just returned by `policy::select` scanning
        // this heap's own list, so it's live, free, reachable from `head`
        // and large enough for `required`.
        let payload = unsafe { split::split_or_grant(selected, required) };
        log::trace!("allocated {required} bytes at {payload:p}");
        Ok(payload)
    }

    /// Returns a previously allocated payload pointer, merging it with any
    /// free neighbors.
    ///
    /// `ptr` is `Option<NonNull<u8>>` rather than a possibly-null raw
    /// pointer so that "no pointer" is a distinct, typed case
    /// ([`ReleaseError::AbsentPointer`]) instead of a null check buried in
    /// the body.
    pub fn release(&mut self, ptr: Option<NonNull<u8>>) -> Result<(), ReleaseError> {
        let ptr = ptr.ok_or(ReleaseError::AbsentPointer)?;
        if !self.in_region(ptr) {
            return Err(ReleaseError::OutOfRegion);
        }
        // SAFETY: `in_region` confirmed `ptr` lies at least `HEADER_SIZE`
        // bytes past `self.base`, so stepping back one header stays inside
        // the mapped region.
        let header = unsafe { BlockHeader::header_of(ptr) };

        // A pointer can pass `in_region` while still landing a few bytes
        // off a real payload start; confirm `header` is an actual list
        // node before treating it as one.
        if !coalesce::contains(self.head, header) {
            return Err(ReleaseError::NotABlock);
        }

        // SAFETY: `contains` confirmed `header` is a live node of this
        // heap's own list.
        unsafe { coalesce::release(self.head, header) }?;
        log::trace!("released block at {ptr:p}");
        Ok(())
    }

    /// A read-only snapshot of every block in this heap, for diagnostics
    /// and tests.
    pub fn dump(&self) -> HeapDump {
        // SAFETY: `self.head` is this heap's own live list.
        unsafe { dump::dump(self.head) }
    }

    /// Whether `ptr` could possibly be a payload pointer this heap handed
    /// out: strictly past the first header and at or before the region's
    /// end.
    fn in_region(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        let region_start = self.base.as_ptr() as usize;
        let region_end = region_start + self.len;
        addr >= region_start + BlockHeader::HEADER_SIZE && addr <= region_end
    }
}

// SAFETY: `Heap` owns its region outright and every method takes `&mut
// self` (`dump` takes `&self` but only reads), so moving a `Heap` to
// another thread carries no aliasing the type itself can't already see.
// It is not `Sync`: concurrent `&Heap` access from multiple threads would
// let two `allocate`/`release` calls race on the same block list, which is
// exactly the external-mutex responsibility the crate docs place on the
// caller.
unsafe impl Send for Heap {}
