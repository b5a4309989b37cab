//! Indexed circular queue (component D): a fixed-capacity array of slots
//! addressed by sequence number modulo the (power-of-two) capacity,
//! supporting many concurrent writers and many concurrent readers. Readers
//! observe a published value without consuming it exclusively — this is
//! a broadcast/fan-out structure, not a work queue.
//!
//! Grounded in the original `CircularQueue`/`WriteSequencer`/
//! `ReadSequencer`: a writer reserves sequence numbers with an
//! atomic fetch-add, stamps its slot, then "commits" — which walks
//! forward from the last committed sequence looking for a contiguous run
//! of now-valid slots and advances the committed cursor past them. A
//! reader only advances past a slot it has confirmed is valid, and treats
//! a slot whose stored sequence has since moved past it (the writer lapped
//! it) as an overrun.

use crate::config::CircularQueueConfig;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Lock-free fetch-add reservation plus "highest contiguous committed"
/// tracking for the writer side. Kept standalone so its CAS-retry logic is
/// unit-testable without a backing slot array.
pub struct WriteSequencer {
    allocated: AtomicU64,
    committed: AtomicU64,
}

impl WriteSequencer {
    #[must_use]
    pub const fn new() -> Self {
        Self { allocated: AtomicU64::new(0), committed: AtomicU64::new(0) }
    }

    #[must_use]
    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::Acquire)
    }

    /// Reserves `n` contiguous sequence numbers, returning the first.
    pub fn acquire(&self, n: u64) -> u64 {
        self.allocated.fetch_add(n, Ordering::AcqRel)
    }

    /// Advances `committed` to the highest sequence number `<= seq` for
    /// which every slot from `committed+1` onward reports valid via
    /// `is_valid`, scanning forward from the last known committed point.
    pub fn commit(&self, seq: u64, is_valid: impl Fn(u64) -> bool) {
        let mut committed = self.committed.load(Ordering::Acquire);
        if seq <= committed {
            return;
        }
        let mut first_undone = committed + 1;
        while first_undone <= seq && is_valid(first_undone) {
            first_undone += 1;
        }
        let last_done = first_undone - 1;
        if last_done <= committed {
            return;
        }
        loop {
            match self.committed.compare_exchange_weak(committed, last_done, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return,
                Err(actual) => {
                    if actual >= last_done {
                        return;
                    }
                    committed = actual;
                }
            }
        }
    }
}

impl Default for WriteSequencer {
    fn default() -> Self {
        Self::new()
    }
}

/// CAS-advanced read cursor, shared by every reader of the queue.
pub struct ReadSequencer {
    read_seq: AtomicU64,
}

impl ReadSequencer {
    #[must_use]
    pub const fn new() -> Self {
        Self { read_seq: AtomicU64::new(0) }
    }

    /// Claims the next read sequence if the slot it points at is already
    /// valid; returns `None` (without advancing) if there is nothing to
    /// read yet.
    pub fn acquire(&self, is_valid: impl Fn(u64) -> bool) -> Option<u64> {
        loop {
            let read_seq = self.read_seq.load(Ordering::Acquire);
            if !is_valid(read_seq) {
                return None;
            }
            match self.read_seq.compare_exchange_weak(read_seq, read_seq + 1, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return Some(read_seq),
                Err(_) => continue,
            }
        }
    }
}

impl Default for ReadSequencer {
    fn default() -> Self {
        Self::new()
    }
}

/// The queue's control block, laid out as a shared-memory-compatible
/// header.
#[repr(C)]
pub struct CircularQueueHeader {
    pub capacity: usize,
    pub mask: u64,
    pub entry_size: usize,
    pub overrun: AtomicU64,
}

#[repr(align(64))]
struct Slot<T> {
    seq: AtomicU64,
    valid: AtomicBool,
    payload: UnsafeCell<MaybeUninit<T>>,
}

/// A fixed-capacity, many-writer/many-reader circular queue.
pub struct CircularQueue<T> {
    header: CircularQueueHeader,
    write_sn: WriteSequencer,
    read_sn: ReadSequencer,
    slots: Box<[Slot<T>]>,
}

// SAFETY: slot access is mediated entirely by the sequencers' atomics;
// `T: Send` is required so a value written on one thread can be read on
// another.
unsafe impl<T: Send> Send for CircularQueue<T> {}
unsafe impl<T: Send> Sync for CircularQueue<T> {}

impl<T: Copy> CircularQueue<T> {
    #[must_use]
    pub fn new(config: CircularQueueConfig) -> Self {
        let capacity = config.capacity();
        let slots = (0..capacity)
            .map(|_| Slot { seq: AtomicU64::new(0), valid: AtomicBool::new(false), payload: UnsafeCell::new(MaybeUninit::uninit()) })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            header: CircularQueueHeader {
                capacity,
                mask: config.mask(),
                entry_size: std::mem::size_of::<T>(),
                overrun: AtomicU64::new(0),
            },
            write_sn: WriteSequencer::new(),
            read_sn: ReadSequencer::new(),
            slots,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.header.capacity
    }

    #[must_use]
    pub fn overrun_count(&self) -> u64 {
        self.header.overrun.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn committed(&self) -> u64 {
        self.write_sn.committed()
    }

    fn idx(&self, seq: u64) -> usize {
        (seq & self.header.mask) as usize
    }

    fn is_valid_at(&self, seq: u64) -> bool {
        self.slots[self.idx(seq)].valid.load(Ordering::Acquire)
    }

    /// Reserves `n` contiguous sequence numbers for writing, returning the
    /// first. Each reserved slot is marked invalid and stamped with its
    /// own sequence number; the caller must [`CircularQueue::stamp`] a
    /// value into each, then [`CircularQueue::commit_write`] it.
    pub fn acquire_write(&self, n: u64) -> u64 {
        let seq = self.write_sn.acquire(n);
        for s in seq..seq + n {
            let slot = &self.slots[self.idx(s)];
            slot.valid.store(false, Ordering::Relaxed);
            slot.seq.store(s, Ordering::Relaxed);
        }
        seq
    }

    /// Writes `value` into the slot reserved for `seq` (does not publish
    /// it; call [`CircularQueue::commit_write`] afterward).
    pub fn stamp(&self, seq: u64, value: T) {
        let slot = &self.slots[self.idx(seq)];
        // SAFETY: `seq` was reserved by this writer via `acquire_write`
        // and not yet committed, so no reader can observe it yet.
        unsafe {
            (*slot.payload.get()) = MaybeUninit::new(value);
        }
    }

    /// Publishes the slot at `seq` and advances the committed cursor past
    /// any now-contiguous run of valid slots.
    pub fn commit_write(&self, seq: u64) {
        let slot = &self.slots[self.idx(seq)];
        slot.valid.store(true, Ordering::Release);
        self.write_sn.commit(seq, |s| self.is_valid_at(s));
    }

    /// Reserves one sequence number, writes `value`, and commits it.
    pub fn write(&self, value: T) -> u64 {
        let seq = self.acquire_write(1);
        self.stamp(seq, value);
        self.commit_write(seq);
        seq
    }

    /// Reads the next not-yet-observed value for this reader cursor, or
    /// `None` either because nothing new has been published yet or
    /// because a writer lapped this slot before the read completed (an
    /// overrun, counted in [`CircularQueue::overrun_count`]).
    pub fn read(&self) -> Option<T> {
        let seq = self.read_sn.acquire(|s| self.is_valid_at(s))?;
        let slot = &self.slots[self.idx(seq)];
        let stored_seq = slot.seq.load(Ordering::Acquire);
        if stored_seq > seq {
            self.header.overrun.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        // SAFETY: `is_valid_at(seq)` was true and `stored_seq == seq`, so
        // this slot holds the value written by the matching `write`/
        // `commit_write` call and has not been overwritten since.
        Some(unsafe { (*slot.payload.get()).assume_init() })
    }
}
