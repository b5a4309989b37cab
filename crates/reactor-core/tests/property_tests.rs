//! Property-based tests for the invariants enumerated as "testable
//! properties" for each component: the ring buffer's bounded-count and
//! happens-before invariants, the allocator's class-capacity invariant,
//! and the circular queue's no-overrun bit-exactness invariant.

use proptest::prelude::*;
use reactor_core::alloc::{class_capacity, size_class, SlabAllocator};
use reactor_core::queue::CircularQueue;
use reactor_core::{ByteRing, ByteRingConfig, CircularQueueConfig, WritePolicy};

proptest! {
    /// `size() + free() == capacity` and a write validated by
    /// `has_free_space` always succeeds, for any interleaving of writes
    /// bounded by the ring's own reported capacity.
    #[test]
    fn ring_bounded_count_holds_across_writes_and_reads(
        chunk_sizes in prop::collection::vec(1usize..20, 0..40),
    ) {
        let ring = ByteRing::new(ByteRingConfig::new(6)); // 64 bytes
        let mut model: Vec<u8> = Vec::new();
        let mut next_byte: u8 = 0;

        for (i, size) in chunk_sizes.iter().enumerate() {
            prop_assert_eq!(ring.len() + ring.free_space(), ring.capacity());

            let data: Vec<u8> = (0..*size).map(|_| { let b = next_byte; next_byte = next_byte.wrapping_add(1); b }).collect();
            if ring.has_free_space(data.len()) {
                ring.write(&data, WritePolicy::Split).unwrap();
                model.extend_from_slice(&data);
            }

            if i % 3 == 0 && !model.is_empty() {
                let mut out = vec![0u8; model.len().min(7)];
                let n = ring.read_into(&mut out);
                prop_assert_eq!(&out[..n], &model[..n]);
                model.drain(..n);
            }
        }
        prop_assert_eq!(ring.len() + ring.free_space(), ring.capacity());
    }

    /// Bytes read are always a prefix of bytes written, for any
    /// interleaving — the ring never reorders or corrupts data.
    #[test]
    fn ring_read_bytes_are_a_prefix_of_written_bytes(
        writes in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..10), 0..20),
    ) {
        let ring = ByteRing::new(ByteRingConfig::new(7)); // 128 bytes
        let mut written = Vec::new();
        let mut read = Vec::new();

        for chunk in &writes {
            if ring.has_free_space(chunk.len()) {
                ring.write(chunk, WritePolicy::Split).unwrap();
                written.extend_from_slice(chunk);
            }
            let mut out = [0u8; 5];
            let n = ring.read_into(&mut out);
            read.extend_from_slice(&out[..n]);
        }
        let mut out = [0u8; 128];
        let n = ring.read_into(&mut out);
        read.extend_from_slice(&out[..n]);

        prop_assert_eq!(&written[..read.len()], &read[..]);
    }
}

proptest! {
    /// Whatever class an allocation lands in, that class's capacity
    /// covers the originally requested size.
    #[test]
    fn allocator_class_capacity_covers_the_request(nbytes in 1usize..2000) {
        let mut alloc = SlabAllocator::default();
        let p = alloc.allocate(nbytes);
        let class = alloc.class_of(p);
        if class != u16::MAX {
            prop_assert!(class_capacity(class) >= nbytes);
            prop_assert_eq!(class, size_class(nbytes));
        }
        alloc.deallocate(p);
    }
}

proptest! {
    /// With no overrun, the consumer observes exactly what the producer
    /// wrote, bit-exact, for any sequence of writes that stays within
    /// the queue's capacity between each read.
    #[test]
    fn circular_queue_reads_back_bit_exact_without_overrun(
        values in prop::collection::vec(any::<u64>(), 1..16),
    ) {
        let queue: CircularQueue<u64> = CircularQueue::new(CircularQueueConfig::new(4)); // 16 slots
        for v in &values {
            queue.write(*v);
        }
        for v in &values {
            let got = queue.read();
            prop_assert_eq!(got, Some(*v));
        }
        prop_assert_eq!(queue.overrun_count(), 0);
    }
}
