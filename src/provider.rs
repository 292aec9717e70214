//! The region provider: the external collaborator this crate assumes
//! someone else implements correctly (see the crate-level docs).
//!
//! The allocator core never calls into the operating system directly; it
//! only ever asks a [`RegionProvider`] for a byte range. This keeps the
//! unsafe, platform-specific half of "get memory from the host" out of the
//! module that has to reason about header invariants.

use core::ptr::NonNull;

use thiserror::Error;

/// A zeroed, writable, page-aligned byte range handed to a [`Heap`] at
/// construction time.
///
/// [`Heap`]: crate::Heap
pub struct Region {
    pub base: NonNull<u8>,
    pub len: usize,
}

/// Something a [`RegionProvider`] can fail with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("failed to map {requested} bytes from the host")]
    MapFailed { requested: usize },
    #[error("host allocator rejected a {requested}-byte layout aligned to {align}")]
    LayoutRejected { requested: usize, align: usize },
}

/// Obtains a contiguous, writable, zero-initialized region of memory.
///
/// Implementations are trusted to zero what they return; the allocator
/// core relies on this only insofar as it never *reads* a header before
/// writing one, so zeroing is a cheap safety net against a provider that
/// recycles memory rather than a load-bearing invariant.
pub trait RegionProvider {
    /// The host's page size, used to round a requested heap size up before
    /// calling [`RegionProvider::acquire`].
    fn page_size(&self) -> usize;

    /// Acquires exactly `len` bytes, which must already be a multiple of
    /// [`RegionProvider::page_size`].
    fn acquire(&self, len: usize) -> Result<Region, ProviderError>;
}

/// The default, hosted region provider: an anonymous, private `mmap`
/// mapping, with the page size read from `sysconf(_SC_PAGESIZE)`.
///
/// This mirrors the POSIX `mmap`/`getpagesize` pair the system this crate
/// is modeled on used, modernized to an anonymous mapping instead of one
/// backed by an open `/dev/zero` file descriptor — the two are equivalent
/// sources of zeroed pages on Linux, but anonymous mappings don't leak an
/// `fd` and don't require `/dev/zero` to exist in the process's chroot.
#[derive(Debug, Default, Clone, Copy)]
pub struct MmapRegionProvider;

impl RegionProvider for MmapRegionProvider {
    fn page_size(&self) -> usize {
        // SAFETY: `_SC_PAGESIZE` is a plain, side-effect-free sysconf query.
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if page_size > 0 {
            page_size as usize
        } else {
            4096
        }
    }

    fn acquire(&self, len: usize) -> Result<Region, ProviderError> {
        // SAFETY: a null hint address with MAP_PRIVATE | MAP_ANONYMOUS lets
        // the kernel choose the mapping; there is no file descriptor to
        // mismanage and no existing mapping being overwritten.
        let addr = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(ProviderError::MapFailed { requested: len });
        }
        // SAFETY: `mmap` succeeded, so `addr` is non-null and valid for
        // `len` bytes of read/write access for the life of the process
        // (this crate never unmaps it, per the design's non-goals).
        let base = unsafe { NonNull::new_unchecked(addr.cast::<u8>()) };
        Ok(Region { base, len })
    }
}

/// A region provider backed by the host's global allocator instead of
/// `mmap`, for tests and for hosts that would rather not depend on `libc`.
///
/// Memory handed out here is deliberately leaked: per the design's
/// non-goals, a [`Heap`](crate::Heap) never returns its region to the
/// provider that gave it out, so there is nothing to free it with later.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapBackedRegionProvider;

impl HeapBackedRegionProvider {
    /// Used when the host can't report a real page size; large enough to
    /// be a plausible page size on every platform this crate targets.
    const FALLBACK_PAGE_SIZE: usize = 4096;
}

impl RegionProvider for HeapBackedRegionProvider {
    fn page_size(&self) -> usize {
        Self::FALLBACK_PAGE_SIZE
    }

    fn acquire(&self, len: usize) -> Result<Region, ProviderError> {
        let align = self.page_size();
        let layout = std::alloc::Layout::from_size_align(len, align).map_err(|_| {
            ProviderError::LayoutRejected {
                requested: len,
                align,
            }
        })?;
        // SAFETY: `layout` has non-zero size, checked by `Layout::from_size_align`
        // failing on a zero-sized request would be the only other failure mode,
        // and `Heap::with_provider` never asks for zero bytes.
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        let base = NonNull::new(ptr).ok_or(ProviderError::MapFailed { requested: len })?;
        Ok(Region { base, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_backed_provider_returns_zeroed_memory_of_requested_length() {
        let provider = HeapBackedRegionProvider;
        let len = provider.page_size() * 2;
        let region = provider.acquire(len).unwrap();
        assert_eq!(region.len, len);
        let bytes = unsafe { core::slice::from_raw_parts(region.base.as_ptr(), region.len) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn mmap_provider_returns_page_aligned_zeroed_memory() {
        let provider = MmapRegionProvider;
        let page = provider.page_size();
        assert!(page > 0);
        let region = provider.acquire(page).unwrap();
        assert_eq!(region.base.as_ptr() as usize % page, 0);
        let bytes = unsafe { core::slice::from_raw_parts(region.base.as_ptr(), region.len) };
        assert!(bytes.iter().all(|&b| b == 0));
    }
}
