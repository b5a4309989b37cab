//! reactor-core: a per-thread event/message reactor built atop a family
//! of lock-free data structures and a pooled slab allocator.
//!
//! Four concerns that must be correct together:
//!
//! - [`reactor`]: a loop per thread that interleaves timer expiry,
//!   inter-thread messaging, and file-descriptor event dispatch under a
//!   single polling budget.
//! - [`queue`]: a lock-free linked multi-producer/multi-consumer queue
//!   and an indexed circular queue with sequencers.
//! - [`ring`]: a single-producer/single-consumer ring byte-buffer.
//! - [`alloc`]: a slab/bin allocator whose per-allocation header lets any
//!   pointer be freed back to the correct fixed-size pool in O(1).
//!
//! Socket address parsing, DNS resolution, socket-option wrapping, thread
//! wrapping, and serialization formats are treated as external
//! collaborators and have no representation here; the reactor consumes
//! only the abstract [`traits::EventHandler`] and message-poller
//! interfaces, and `reactor-net` is the only consumer of [`ring`] that
//! touches a socket.

pub mod alloc;
mod cache_aligned;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub(crate) mod invariants;
pub mod message_poller;
pub mod poller;
pub mod queue;
pub mod reactor;
pub mod ring;
pub mod timer;
pub mod traits;

mod backoff;
pub use backoff::Backoff;

pub use alloc::{ConcurrentSlabAllocator, PooledGlobalAlloc, SlabAllocator};
pub use clock::{Clock, ClockTicks, SimulationClock, SystemClock, TickType};
pub use config::{
    ByteRingConfig, CircularQueueConfig, ReactorConfig, SlabAllocatorConfig,
    LARGE_BYTE_RING_CONFIG, LOW_LATENCY_REACTOR_CONFIG, POWER_SAVING_REACTOR_CONFIG,
    SMALL_BYTE_RING_CONFIG,
};
pub use message_poller::QueueMessagePoller;
pub use queue::{CircularQueue, LinkedQueue, LinkedQueueNode, WriterMode};
pub use reactor::Reactor;
pub use ring::{ByteRing, MessageRing, RingError, WritePolicy};
pub use timer::TimerQueue;
pub use traits::{Allocator, EventHandler, Interests, MessageHandler, ReactorOwner, TimerId, TimerListener};
