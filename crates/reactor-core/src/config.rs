//! Sizing and tuning knobs. Every sized component takes a small `Copy`
//! config struct built through a validating `const fn new`, following the
//! same pattern across the whole crate: bounds-checked constructor, a
//! `Default`, and named presets for common tunings.

use crate::clock::TickType;

/// Configuration for [`crate::ring::ByteRing`].
#[derive(Debug, Clone, Copy)]
pub struct ByteRingConfig {
    /// Buffer size as a power of 2.
    pub size_bits: u8,
}

impl ByteRingConfig {
    /// # Panics
    /// Panics if `size_bits` is 0 or greater than 24 (16 MiB max).
    pub const fn new(size_bits: u8) -> Self {
        assert!(size_bits > 0 && size_bits <= 24, "size_bits must be between 1 and 24");
        Self { size_bits }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        1 << self.size_bits
    }

    #[inline]
    pub const fn mask(&self) -> u64 {
        (self.capacity() as u64) - 1
    }
}

impl Default for ByteRingConfig {
    fn default() -> Self {
        Self::new(16) // 64 KiB
    }
}

/// Small buffer, suited for per-connection send/receive pairs.
pub const SMALL_BYTE_RING_CONFIG: ByteRingConfig = ByteRingConfig::new(12); // 4 KiB

/// Large buffer, suited for bulk transfer.
pub const LARGE_BYTE_RING_CONFIG: ByteRingConfig = ByteRingConfig::new(20); // 1 MiB

/// Configuration for [`crate::queue::circular::CircularQueue`].
#[derive(Debug, Clone, Copy)]
pub struct CircularQueueConfig {
    /// Slot count as a power of 2.
    pub size_bits: u8,
}

impl CircularQueueConfig {
    /// # Panics
    /// Panics if `size_bits` is 0 or greater than 20 (1M slots max).
    pub const fn new(size_bits: u8) -> Self {
        assert!(size_bits > 0 && size_bits <= 20, "size_bits must be between 1 and 20");
        Self { size_bits }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        1 << self.size_bits
    }

    #[inline]
    pub const fn mask(&self) -> u64 {
        (self.capacity() as u64) - 1
    }
}

impl Default for CircularQueueConfig {
    fn default() -> Self {
        Self::new(10) // 1024 slots
    }
}

/// Configuration for [`crate::alloc::SlabAllocator`].
#[derive(Debug, Clone, Copy)]
pub struct SlabAllocatorConfig {
    /// Number of slots carved per freshly grown slab, per size class.
    pub slab_slots: usize,
}

impl SlabAllocatorConfig {
    /// # Panics
    /// Panics if `slab_slots` is 0.
    pub const fn new(slab_slots: usize) -> Self {
        assert!(slab_slots > 0, "slab_slots must be non-zero");
        Self { slab_slots }
    }
}

impl Default for SlabAllocatorConfig {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Reactor loop tuning, mirroring the reactor's `run()` parameters.
#[derive(Debug, Clone, Copy)]
pub struct ReactorConfig {
    /// Baseline resting budget per loop iteration, in ticks.
    pub poll_interval: TickType,
    /// Disables sleeps and timeout extension; the loop always uses
    /// `poll_interval` as the poll timeout.
    pub busy_poller: bool,
    /// Allows timeout extension to the next timer's deadline when idle.
    pub power_saving: bool,
    /// Hard ceiling on the extended poll timeout.
    pub max_poll_timeout: TickType,
    /// Whether the thread message poller uses the pooled allocator for its
    /// queue nodes (vs. the host allocator).
    pub thread_msg_poller_uses_pool: bool,
}

impl ReactorConfig {
    pub const fn new(
        poll_interval: TickType,
        busy_poller: bool,
        power_saving: bool,
        max_poll_timeout: TickType,
        thread_msg_poller_uses_pool: bool,
    ) -> Self {
        assert!(poll_interval > 0, "poll_interval must be non-zero");
        assert!(max_poll_timeout >= poll_interval, "max_poll_timeout must be >= poll_interval");
        Self {
            poll_interval,
            busy_poller,
            power_saving,
            max_poll_timeout,
            thread_msg_poller_uses_pool,
        }
    }
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self::new(crate::clock::ONE_MILLISEC, false, false, crate::clock::ONE_SEC, false)
    }
}

/// Tuned for minimum timer/message latency: short poll interval, no power
/// saving, busy-poller friendly ceiling.
pub const LOW_LATENCY_REACTOR_CONFIG: ReactorConfig =
    ReactorConfig::new(100_000 /* 100us */, false, false, crate::clock::ONE_MILLISEC, false);

/// Tuned to minimize wakeups when idle: long extension ceiling, power
/// saving enabled.
pub const POWER_SAVING_REACTOR_CONFIG: ReactorConfig =
    ReactorConfig::new(crate::clock::ONE_MILLISEC, false, true, 5 * crate::clock::ONE_SEC, false);
