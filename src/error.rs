//! The error taxonomy from the design's error-handling section: one
//! `thiserror`-derived enum per public operation, instead of a shared
//! failure sentinel.

use thiserror::Error;

use crate::policy::UnknownPolicy;
use crate::provider::ProviderError;

/// Why [`crate::Heap::new`] or [`crate::Heap::with_provider`] refused to
/// construct a heap.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitError {
    #[error("requested heap size must be greater than zero")]
    NonPositiveSize,
    #[error("unknown placement policy code {0}")]
    UnknownPolicy(i32),
    #[error("region provider could not satisfy the request")]
    RegionUnavailable(#[from] ProviderError),
}

impl From<UnknownPolicy> for InitError {
    fn from(err: UnknownPolicy) -> Self {
        InitError::UnknownPolicy(err.0)
    }
}

/// Why [`crate::Heap::allocate`] returned no payload address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
    #[error("requested allocation size must be greater than zero")]
    NonPositiveSize,
    #[error("no free block of at least {requested} bytes under the active policy")]
    OutOfMemory { requested: usize },
}

/// Why [`crate::Heap::release`] refused to free a pointer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReleaseError {
    #[error("release called with an absent pointer")]
    AbsentPointer,
    #[error("pointer does not lie inside the heap's region")]
    OutOfRegion,
    #[error("pointer does not reference the start of any block's payload")]
    NotABlock,
    #[error("pointer does not reference a busy block's payload")]
    NotBusy,
}
