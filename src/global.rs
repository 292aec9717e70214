//! The optional `global-allocator` adapter: a [`GlobalAlloc`] built on top
//! of [`Heap`], for crates that want this as their `#[global_allocator]`.
//!
//! A `static` can't hold a `&mut Heap`, so the heap lives behind
//! [`Locked`], and `init` does the actual region acquisition lazily rather
//! than at `const` time.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::NonNull;

use crate::error::InitError;
use crate::header::BlockHeader;
use crate::heap::Heap;
use crate::policy::Policy;
use crate::utils::locked::Locked;

/// A [`GlobalAlloc`] wrapping one lazily-initialized [`Heap`].
///
/// ```ignore
/// #[global_allocator]
/// static ALLOCATOR: GlobalHeap = GlobalHeap::new(1 << 20, Policy::First);
///
/// fn main() {
///     ALLOCATOR.init().expect("heap init");
///     // ordinary `Box`, `Vec`, etc. now route through `ALLOCATOR`.
/// }
/// ```
pub struct GlobalHeap {
    requested_bytes: usize,
    policy: Policy,
    heap: Locked<Option<Heap>>,
}

impl GlobalHeap {
    pub const fn new(requested_bytes: usize, policy: Policy) -> Self {
        GlobalHeap {
            requested_bytes,
            policy,
            heap: Locked::new(None),
        }
    }

    /// Maps the backing region. Must be called once before the first
    /// allocation reaches this allocator; allocating before `init` aborts
    /// the process via [`GlobalAlloc`]'s null-return contract.
    pub fn init(&self) -> Result<(), InitError> {
        let heap = Heap::new(self.requested_bytes, self.policy)?;
        *self.heap.lock() = Some(heap);
        Ok(())
    }
}

/// Bumps `ptr` up to `align`, for requests whose alignment exceeds what a
/// [`BlockHeader`]-prefixed payload guarantees on its own (word alignment).
///
/// Mirrors the over-allocate-and-align trick used by embedded
/// `GlobalAlloc` implementations that sit on top of a coarser-grained
/// allocator than the request: ask the heap for `size + align` bytes, then
/// return the first aligned address within that range, which always
/// leaves room to recover the true block start on `dealloc`.
fn align_up(ptr: NonNull<u8>, align: usize) -> NonNull<u8> {
    let addr = ptr.as_ptr() as usize;
    let aligned = (addr + align - 1) & !(align - 1);
    // SAFETY: `aligned >= addr > 0`, so this is still non-null.
    unsafe { NonNull::new_unchecked(ptr.as_ptr().add(aligned - addr)) }
}

const OVER_ALIGNED_TAG_SIZE: usize = core::mem::size_of::<usize>();

// SAFETY: `alloc`/`dealloc` only ever touch the `Heap` behind `self.heap`,
// which is only reachable through `Locked::lock`'s `&mut` borrow, so two
// calls into this allocator can't alias its state — the same contract
// `Heap` itself relies on its caller to uphold.
unsafe impl GlobalAlloc for GlobalHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let Some(heap) = self.heap.lock().as_mut() else {
            return core::ptr::null_mut();
        };

        if layout.align() <= BlockHeader::HEADER_SIZE {
            return match heap.allocate(layout.size()) {
                Ok(ptr) => ptr.as_ptr(),
                Err(_) => core::ptr::null_mut(),
            };
        }

        // Over-allocate so there's room to slide forward to an aligned
        // address and still have `OVER_ALIGNED_TAG_SIZE` bytes behind it to
        // record the true block start for `dealloc`.
        let padded = layout.size() + layout.align() + OVER_ALIGNED_TAG_SIZE;
        let raw = match heap.allocate(padded) {
            Ok(ptr) => ptr,
            Err(_) => return core::ptr::null_mut(),
        };
        // SAFETY: `raw` has at least `OVER_ALIGNED_TAG_SIZE` bytes of
        // headroom before the earliest address `align_up` can return.
        let tagged = unsafe { raw.byte_add(OVER_ALIGNED_TAG_SIZE) };
        let aligned = align_up(tagged, layout.align());
        // SAFETY: `aligned` was derived from `tagged`, which leaves at
        // least `OVER_ALIGNED_TAG_SIZE` bytes between it and `raw`.
        unsafe {
            aligned
                .byte_sub(OVER_ALIGNED_TAG_SIZE)
                .cast::<usize>()
                .write(raw.as_ptr() as usize);
        }
        aligned.as_ptr()
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let Some(heap) = self.heap.lock().as_mut() else {
            return;
        };
        let Some(ptr) = NonNull::new(ptr) else {
            return;
        };

        let original = if layout.align() <= BlockHeader::HEADER_SIZE {
            ptr
        } else {
            // SAFETY: `alloc` wrote the original block's address exactly
            // `OVER_ALIGNED_TAG_SIZE` bytes before every pointer it
            // returned for an over-aligned request.
            unsafe {
                let tag = ptr.byte_sub(OVER_ALIGNED_TAG_SIZE).cast::<usize>().read();
                NonNull::new_unchecked(tag as *mut u8)
            }
        };
        let _ = heap.release(Some(original));
    }
}
