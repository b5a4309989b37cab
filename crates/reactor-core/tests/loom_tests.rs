//! Loom-based concurrency tests.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! Loom exhaustively explores thread interleavings against small,
//! loom-instrumented models of the two cursor protocols this crate
//! relies on: the byte ring's cached-cursor SPSC protocol (component B)
//! and the linked queue's CAS-raced multi-consumer claim (component C).
//! Modeled in isolation (loom's atomics replace `std`'s, and the buffer
//! shrinks to keep the state space tractable) rather than run against
//! the production types directly.

#![cfg(feature = "loom")]

use loom::sync::atomic::{AtomicU64, Ordering};
use loom::sync::Arc;
use loom::thread;
use std::cell::UnsafeCell;

/// Mirrors `ByteRing`'s cursor protocol: relaxed same-thread reads of the
/// cursor you own, an acquire refresh of the cached other-side cursor
/// only when the fast-path check fails, and a release publish.
struct LoomByteRing {
    tail: AtomicU64,
    cached_head: UnsafeCell<u64>,
    head: AtomicU64,
    cached_tail: UnsafeCell<u64>,
    buffer: UnsafeCell<[u8; 4]>,
    capacity: u64,
}

unsafe impl Send for LoomByteRing {}
unsafe impl Sync for LoomByteRing {}

impl LoomByteRing {
    fn new() -> Self {
        Self {
            tail: AtomicU64::new(0),
            cached_head: UnsafeCell::new(0),
            head: AtomicU64::new(0),
            cached_tail: UnsafeCell::new(0),
            buffer: UnsafeCell::new([0; 4]),
            capacity: 4,
        }
    }

    fn write(&self, byte: u8) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let mut cached_head = unsafe { *self.cached_head.get() };
        if self.capacity - (tail - cached_head) < 1 {
            cached_head = self.head.load(Ordering::Acquire);
            unsafe {
                *self.cached_head.get() = cached_head;
            }
        }
        if self.capacity - (tail - cached_head) < 1 {
            return false;
        }
        let idx = (tail % self.capacity) as usize;
        // SAFETY: single-producer region, verified free space above.
        unsafe {
            (*self.buffer.get())[idx] = byte;
        }
        self.tail.store(tail + 1, Ordering::Release);
        true
    }

    fn read(&self) -> Option<u8> {
        let head = self.head.load(Ordering::Relaxed);
        let mut cached_tail = unsafe { *self.cached_tail.get() };
        if cached_tail == head {
            cached_tail = self.tail.load(Ordering::Acquire);
            unsafe {
                *self.cached_tail.get() = cached_tail;
            }
        }
        if cached_tail == head {
            return None;
        }
        let idx = (head % self.capacity) as usize;
        // SAFETY: single-consumer region, verified data available above.
        let byte = unsafe { (*self.buffer.get())[idx] };
        self.head.store(head + 1, Ordering::Release);
        Some(byte)
    }
}

#[test]
fn byte_ring_single_writer_single_reader_never_loses_or_duplicates() {
    loom::model(|| {
        let ring = Arc::new(LoomByteRing::new());
        let writer = Arc::clone(&ring);

        let producer = thread::spawn(move || {
            writer.write(1);
            writer.write(2);
        });

        let mut received = Vec::new();
        for _ in 0..20 {
            if let Some(b) = ring.read() {
                received.push(b);
            }
            if received.len() == 2 {
                break;
            }
            loom::thread::yield_now();
        }
        producer.join().unwrap();

        if received.len() == 2 {
            assert_eq!(received, vec![1, 2], "reads must observe writes in FIFO order");
        }
    });
}

/// Mirrors `LinkedQueue::dequeue`'s CAS loop over `last_consumed`: two
/// consumers racing to claim the same chain of nodes must never both
/// succeed in claiming the same node.
struct LoomClaimChain {
    last_consumed: AtomicU64,
    len: u64,
}

impl LoomClaimChain {
    fn new(len: u64) -> Self {
        Self { last_consumed: AtomicU64::new(0), len }
    }

    /// Returns `Some(node_index)` if this call claimed a new node.
    fn try_claim(&self) -> Option<u64> {
        loop {
            let current = self.last_consumed.load(Ordering::Acquire);
            if current >= self.len {
                return None;
            }
            let next = current + 1;
            if self
                .last_consumed
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(next);
            }
        }
    }
}

#[test]
fn concurrent_consumers_never_claim_the_same_node_twice() {
    loom::model(|| {
        let chain = Arc::new(LoomClaimChain::new(2));
        let c1 = Arc::clone(&chain);
        let c2 = Arc::clone(&chain);

        let t1 = thread::spawn(move || c1.try_claim());
        let t2 = thread::spawn(move || c2.try_claim());

        let r1 = t1.join().unwrap();
        let r2 = t2.join().unwrap();

        match (r1, r2) {
            (Some(a), Some(b)) => assert_ne!(a, b, "two consumers claimed the same node"),
            _ => {}
        }
    });
}
