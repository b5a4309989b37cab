//! The behavioural interfaces the reactor core exposes to its callers:
//! event handlers, message handlers, timer listeners, the reactor's owner,
//! and the allocator contract. No interface here carries a default method
//! body beyond what the original's virtual-method defaults implied.

use crate::clock::TickType;
use bitflags::bitflags;

/// Unique identifier handed back by [`crate::timer::TimerQueue::add`].
pub type TimerId = u64;

bitflags! {
    /// Readiness/subscription flags exchanged with an [`EventHandler`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Interests: u8 {
        const READABLE = 0b0000_0001;
        const WRITABLE = 0b0000_0010;
    }
}

/// Polled by an event poller backend (component F) when its file
/// descriptor becomes ready for one of its booked interests.
pub trait EventHandler: Send {
    /// The OS file descriptor this handler polls on.
    fn fd(&self) -> i32;

    /// Invoked with the interests that became ready. Returns the subset of
    /// interests that should be *unsubscribed* going forward (an empty set
    /// leaves the booked interests unchanged).
    fn on_event(&self, now: TickType, ready: Interests) -> Interests;
}

/// Processes one message dequeued by a message poller (component G).
pub trait MessageHandler<M> {
    fn process(&self, now: TickType, msg: M);
}

/// Invoked by the timer queue (component E) when a timer expires.
pub trait TimerListener: Send + Sync {
    /// Whether this listener was registered by a non-owning thread during
    /// its "incipient" phase (see [`crate::timer::TimerQueue::add_pending`]).
    fn is_incipient(&self) -> bool {
        false
    }

    fn on_timeout(&self, id: TimerId, user_data: u64);
}

/// Notified when the reactor loop (component H) is about to exit.
pub trait ReactorOwner {
    fn on_stop(&self);
}

/// The allocator contract implemented by the slab allocator (component A).
pub trait Allocator {
    fn allocate(&mut self, nbytes: usize) -> *mut u8;
    fn deallocate(&mut self, ptr: *mut u8);
    fn class_of(&self, ptr: *const u8) -> u16;
}
