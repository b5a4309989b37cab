//! Fixed-size slab/bin allocator (component A).
//!
//! Ported from the original `FixedMemPoolBin`/`FixedMemPool`: each size
//! class owns an independent pool of fixed-size slots, grown lazily one
//! slab at a time, with a single LIFO free-list per class. `deallocate`
//! recovers the class from the slot's header, so callers never need to
//! remember the original request size.

use super::header::{SlotHeader, HEADER_SIZE, MAGIC};
use crate::config::SlabAllocatorConfig;
use std::alloc::{self, Layout};

/// Largest size class served by the slab pools (class 10 covers up to
/// `8*2^10 = 8192` bytes), matching the original's `MAX_VALUE_SIZE = 8192`.
pub const MAX_CLASS: u16 = 10;

/// Sentinel class index marking a header that belongs to an oversize
/// allocation served directly by the host allocator.
const OVERSIZE_CLASS: u16 = u16::MAX;

/// Computes the size class for a request of `nbytes`: `c = nbytes <= 8 ? 0
/// : floor(log2(nbytes-1)) - 2`. A class covers allocations up to
/// `8*2^c` bytes.
#[must_use]
pub fn size_class(nbytes: usize) -> u16 {
    if nbytes <= 8 {
        return 0;
    }
    let v = (nbytes - 1) as u64;
    let log2_floor = 63 - v.leading_zeros() as u16;
    log2_floor.saturating_sub(2)
}

/// The largest request size (in bytes) that fits in `class`.
#[must_use]
pub const fn class_capacity(class: u16) -> usize {
    8usize << class
}

#[must_use]
const fn slot_size_for_class(class: u16) -> usize {
    HEADER_SIZE + class_capacity(class)
}

#[derive(thiserror::Error, Debug)]
pub enum AllocError {
    #[error("host allocator failed to satisfy oversize request of {size} bytes")]
    OversizeOutOfMemory { size: usize },
}

struct ClassPool {
    slot_size: usize,
    free_head: *mut u8,
    slabs: Vec<Box<[u8]>>,
    next_fresh_offset: usize,
}

impl ClassPool {
    fn new(class: u16) -> Self {
        Self {
            slot_size: slot_size_for_class(class),
            free_head: std::ptr::null_mut(),
            slabs: Vec::new(),
            next_fresh_offset: 0,
        }
    }

    /// Returns a pointer to the slot's header (not the usable payload).
    fn allocate(&mut self, class: u16, slab_slots: usize) -> *mut u8 {
        if !self.free_head.is_null() {
            let slot = self.free_head;
            // SAFETY: `slot` was pushed onto the free-list by a prior
            // `deallocate`, which always writes a valid `free_next` link.
            self.free_head = unsafe { SlotHeader::read_free_next(slot) };
            SlotHeader::write_allocated(slot, class);
            return slot;
        }

        let need_new_slab = self
            .slabs
            .last()
            .is_none_or(|slab| self.next_fresh_offset + self.slot_size > slab.len());
        if need_new_slab {
            let slab_bytes = self.slot_size * slab_slots;
            self.slabs.push(vec![0u8; slab_bytes].into_boxed_slice());
            self.next_fresh_offset = 0;
        }

        let slab = self.slabs.last_mut().expect("slab just pushed");
        // SAFETY: offset is within bounds by the growth check above.
        let slot = unsafe { slab.as_mut_ptr().add(self.next_fresh_offset) };
        self.next_fresh_offset += self.slot_size;
        SlotHeader::write_allocated(slot, class);
        slot
    }

    fn deallocate(&mut self, header_ptr: *mut u8) {
        SlotHeader::write_free_next(header_ptr, self.free_head);
        self.free_head = header_ptr;
    }
}

/// Single-threaded slab/bin allocator. Use [`super::ConcurrentSlabAllocator`]
/// if the pool is shared across threads — mixing single-threaded and
/// concurrent access to the same logical pool is the caller's contract to
/// uphold, matching the original's single-threaded-vs-mutex-guarded split.
pub struct SlabAllocator {
    config: SlabAllocatorConfig,
    classes: Vec<ClassPool>,
}

impl SlabAllocator {
    #[must_use]
    pub fn new(config: SlabAllocatorConfig) -> Self {
        let classes = (0..=MAX_CLASS).map(ClassPool::new).collect();
        Self { config, classes }
    }

    /// Allocates at least `nbytes`. Oversize requests fall back to the host
    /// allocator transparently; `deallocate`/`class_of` handle both paths.
    ///
    /// # Panics
    /// Panics if the host allocator fails to satisfy an oversize request
    /// (matches the original's "out-of-memory at slab creation is fatal").
    pub fn allocate(&mut self, nbytes: usize) -> *mut u8 {
        let class = size_class(nbytes);
        if class > MAX_CLASS {
            return self.allocate_oversize(nbytes).expect("oversize allocation failed");
        }
        let header_ptr = self.classes[class as usize].allocate(class, self.config.slab_slots);
        // SAFETY: header_ptr + HEADER_SIZE is within the slot, which is at
        // least HEADER_SIZE + class_capacity(class) bytes long.
        unsafe { header_ptr.add(HEADER_SIZE) }
    }

    fn allocate_oversize(&mut self, nbytes: usize) -> Result<*mut u8, AllocError> {
        let total = HEADER_SIZE + nbytes;
        let layout = Layout::from_size_align(total, HEADER_SIZE).expect("valid layout");
        // SAFETY: layout has non-zero size.
        let header_ptr = unsafe { alloc::alloc(layout) };
        if header_ptr.is_null() {
            return Err(AllocError::OversizeOutOfMemory { size: nbytes });
        }
        let reserved = u32::try_from(nbytes).unwrap_or(u32::MAX);
        unsafe {
            (header_ptr.cast::<SlotHeader>()).write(SlotHeader {
                allocated: super::header::AllocatedHeader { magic: MAGIC, class: OVERSIZE_CLASS, _reserved: reserved },
            });
            Ok(header_ptr.add(HEADER_SIZE))
        }
    }

    /// Frees a pointer previously returned by `allocate`.
    ///
    /// # Panics
    /// Panics if the header's magic does not match — a corrupted or
    /// foreign pointer, a fatal contract violation rather than a
    /// recoverable error.
    pub fn deallocate(&mut self, ptr: *mut u8) {
        // SAFETY: every pointer returned by `allocate` has an 8-byte header
        // immediately before it.
        let header_ptr = unsafe { ptr.sub(HEADER_SIZE) };
        // SAFETY: header_ptr was just derived from a previously allocated
        // pointer's header offset.
        let hdr = unsafe { SlotHeader::read_allocated(header_ptr) };
        assert!(hdr.is_valid(), "deallocate: corrupted or foreign pointer (bad header magic)");
        if hdr.class == OVERSIZE_CLASS {
            let size = hdr._reserved as usize;
            let layout = Layout::from_size_align(HEADER_SIZE + size, HEADER_SIZE).expect("valid layout");
            // SAFETY: header_ptr was allocated with this exact layout in
            // `allocate_oversize`.
            unsafe { alloc::dealloc(header_ptr, layout) };
            return;
        }
        self.classes[hdr.class as usize].deallocate(header_ptr);
    }

    /// Recovers the size class that served `ptr`, without needing the
    /// original request size.
    ///
    /// # Panics
    /// Panics on a corrupted or foreign pointer, same as `deallocate`.
    #[must_use]
    pub fn class_of(&self, ptr: *const u8) -> u16 {
        // SAFETY: see `deallocate`.
        let header_ptr = unsafe { ptr.sub(HEADER_SIZE) };
        let hdr = unsafe { SlotHeader::read_allocated(header_ptr) };
        assert!(hdr.is_valid(), "class_of: corrupted or foreign pointer (bad header magic)");
        hdr.class
    }
}

impl Default for SlabAllocator {
    fn default() -> Self {
        Self::new(SlabAllocatorConfig::default())
    }
}

// SAFETY: `SlabAllocator` owns all its slabs and the free-list pointers
// only ever point into slabs it owns; nothing here is inherently
// thread-unsafe to *move* between threads, only to *share* (hence no Sync).
unsafe impl Send for SlabAllocator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_class_matches_boundaries() {
        assert_eq!(size_class(1), 0);
        assert_eq!(size_class(8), 0);
        assert_eq!(size_class(9), 1);
        assert_eq!(size_class(16), 1);
        assert_eq!(size_class(17), 2);
        assert_eq!(size_class(32), 2);
    }

    #[test]
    fn allocator_round_trip_reuses_freed_slot() {
        let mut alloc = SlabAllocator::default();
        let p = alloc.allocate(17);
        assert_eq!(alloc.class_of(p), 2);
        unsafe {
            *p.add(16) = 0xAB;
        }
        alloc.deallocate(p);
        let p2 = alloc.allocate(17);
        assert_eq!(p2, p, "freed slot should be reused LIFO");
        alloc.deallocate(p2);
    }

    #[test]
    fn oversize_allocation_round_trips() {
        let mut alloc = SlabAllocator::default();
        let big = alloc.allocate(1 << 16);
        assert_eq!(alloc.class_of(big), OVERSIZE_CLASS);
        unsafe {
            *big = 7;
            assert_eq!(*big, 7);
        }
        alloc.deallocate(big);
    }

    #[test]
    #[should_panic(expected = "bad header magic")]
    fn deallocate_detects_corrupted_pointer() {
        let mut alloc = SlabAllocator::default();
        let p = alloc.allocate(8);
        unsafe {
            // Corrupt the header's magic.
            *(p.sub(HEADER_SIZE).cast::<u16>()) = 0;
        }
        alloc.deallocate(p);
    }

    #[test]
    fn many_allocations_grow_multiple_slabs() {
        let mut alloc = SlabAllocator::new(SlabAllocatorConfig::new(4));
        let ptrs: Vec<_> = (0..20).map(|_| alloc.allocate(8)).collect();
        for p in ptrs {
            alloc.deallocate(p);
        }
    }
}
