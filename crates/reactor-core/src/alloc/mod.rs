//! Slab/bin allocator (component A): fixed-size pools keyed by a size
//! class, with oversize requests falling back to the host allocator.
//!
//! [`SlabAllocator`] is single-threaded. [`ConcurrentSlabAllocator`] wraps
//! it behind a `Mutex` for the cases in this workspace that do share a pool
//! across threads (the thread message poller's node pool, when
//! [`crate::config::ReactorConfig::thread_msg_poller_uses_pool`] is set).
//! [`PooledGlobalAlloc`] additionally bridges a pool to `#[global_allocator]`
//! for callers who want every heap allocation in the process routed through
//! it, mirroring the original's `StdFixedPoolAllocator`.

mod header;
mod slab;

pub use slab::{class_capacity, size_class, AllocError, SlabAllocator, MAX_CLASS};

use std::alloc::{GlobalAlloc, Layout};
use std::sync::Mutex;

use crate::config::SlabAllocatorConfig;

/// Thread-safe wrapper around [`SlabAllocator`].
pub struct ConcurrentSlabAllocator {
    inner: Mutex<SlabAllocator>,
}

impl ConcurrentSlabAllocator {
    #[must_use]
    pub fn new(config: SlabAllocatorConfig) -> Self {
        Self { inner: Mutex::new(SlabAllocator::new(config)) }
    }

    pub fn allocate(&self, nbytes: usize) -> *mut u8 {
        self.inner.lock().expect("slab allocator mutex poisoned").allocate(nbytes)
    }

    pub fn deallocate(&self, ptr: *mut u8) {
        self.inner.lock().expect("slab allocator mutex poisoned").deallocate(ptr);
    }

    #[must_use]
    pub fn class_of(&self, ptr: *const u8) -> u16 {
        self.inner.lock().expect("slab allocator mutex poisoned").class_of(ptr)
    }
}

impl Default for ConcurrentSlabAllocator {
    fn default() -> Self {
        Self::new(SlabAllocatorConfig::default())
    }
}

/// A `#[global_allocator]`-compatible bridge over a [`ConcurrentSlabAllocator`].
///
/// The pool's headers only guarantee 8-byte alignment, so any request with
/// a stricter alignment than that is routed straight to [`std::alloc`]
/// instead of through the pool; `dealloc` makes the same routing decision
/// from the layout it is handed, so no extra bookkeeping is needed.
pub struct PooledGlobalAlloc {
    pool: ConcurrentSlabAllocator,
}

impl PooledGlobalAlloc {
    #[must_use]
    pub const fn new(pool: ConcurrentSlabAllocator) -> Self {
        Self { pool }
    }
}

const POOL_MAX_ALIGN: usize = header_size();

const fn header_size() -> usize {
    std::mem::size_of::<u64>()
}

// SAFETY: `allocate`/`deallocate` on `ConcurrentSlabAllocator` always
// either serve a correctly-aligned, correctly-sized block (the pool path)
// or delegate to `std::alloc` with the caller's exact layout (the fallback
// path); both satisfy `GlobalAlloc`'s contract.
unsafe impl GlobalAlloc for PooledGlobalAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > POOL_MAX_ALIGN {
            return std::alloc::alloc(layout);
        }
        self.pool.allocate(layout.size())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if layout.align() > POOL_MAX_ALIGN {
            std::alloc::dealloc(ptr, layout);
            return;
        }
        self.pool.deallocate(ptr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_allocator_round_trips() {
        let pool = ConcurrentSlabAllocator::default();
        let p = pool.allocate(40);
        assert_eq!(pool.class_of(p), size_class(40));
        pool.deallocate(p);
    }

    #[test]
    fn global_alloc_bridge_serves_and_frees() {
        let alloc = PooledGlobalAlloc::new(ConcurrentSlabAllocator::default());
        let layout = Layout::from_size_align(64, 8).unwrap();
        unsafe {
            let ptr = alloc.alloc(layout);
            assert!(!ptr.is_null());
            *ptr = 42;
            alloc.dealloc(ptr, layout);
        }
    }

    #[test]
    fn global_alloc_bridge_falls_back_for_high_alignment() {
        let alloc = PooledGlobalAlloc::new(ConcurrentSlabAllocator::default());
        let layout = Layout::from_size_align(64, 64).unwrap();
        unsafe {
            let ptr = alloc.alloc(layout);
            assert!(!ptr.is_null());
            assert_eq!(ptr.align_offset(64), 0);
            alloc.dealloc(ptr, layout);
        }
    }
}
