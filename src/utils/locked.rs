//! A minimal interior-mutability wrapper for sharing one value behind a
//! `static`, used by the optional `global-allocator` adapter.

use core::cell::UnsafeCell;

pub struct Locked<A> {
    inner: UnsafeCell<A>,
}

// SAFETY: callers only ever reach the wrapped value through `lock`, and
// `GlobalHeap` (the sole user of this type) only calls it from within
// `GlobalAlloc::alloc`/`dealloc`, which the allocator contract guarantees
// are not reentered concurrently on the same allocator instance without
// the caller's own synchronization already in place.
unsafe impl<A> Sync for Locked<A> {}

impl<A> Locked<A> {
    pub const fn new(inner: A) -> Self {
        Locked {
            inner: UnsafeCell::new(inner),
        }
    }

    pub fn lock(&self) -> &mut A {
        // SAFETY: see the `Sync` impl above.
        unsafe { &mut *self.inner.get() }
    }
}
