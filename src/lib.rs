//! A single-region, header-tagged, free-list memory allocator.
//!
//! [`Heap`] owns one contiguous region obtained from a [`RegionProvider`]
//! and hands out payload pointers from it under a chosen [`Policy`]
//! (best-fit, first-fit or worst-fit). Every block — busy or free — is
//! prefixed with a small header and threaded into a single, address-ordered
//! linked list; allocation walks that list for a candidate and splits it,
//! release walks it to merge a freed block back into its neighbors.
//!
//! # Concurrency
//!
//! A [`Heap`] is [`Send`] but not [`Sync`]: it assumes exclusive access per
//! call and does no internal locking. Share one across threads behind a
//! `Mutex` (or see the `global-allocator` feature for a ready-made
//! [`GlobalAlloc`](core::alloc::GlobalAlloc) adapter that does this for
//! you).
//!
//! # External collaborator
//!
//! This crate never talks to the operating system directly. A
//! [`RegionProvider`] is responsible for acquiring the backing memory;
//! [`MmapRegionProvider`] (the default) does this with an anonymous `mmap`,
//! and [`HeapBackedRegionProvider`] does it through the host's global
//! allocator, for tests or `libc`-free hosts.
//!
//! # Non-goals
//!
//! A [`Heap`] never returns its region to the provider that produced it,
//! never shrinks or grows the region after construction, and never
//! defragments beyond the coalescing release already does. A heap handle is
//! meant to live for the life of whatever owns it.

mod coalesce;
mod dump;
mod error;
mod header;
mod heap;
mod policy;
mod provider;
mod split;

#[cfg(feature = "global-allocator")]
mod global;
#[cfg(feature = "global-allocator")]
mod utils;

pub use dump::{BlockReport, HeapDump};
pub use error::{AllocError, InitError, ReleaseError};
pub use heap::Heap;
pub use policy::{Policy, UnknownPolicy};
pub use provider::{HeapBackedRegionProvider, MmapRegionProvider, ProviderError, Region, RegionProvider};

#[cfg(feature = "global-allocator")]
pub use global::GlobalHeap;
