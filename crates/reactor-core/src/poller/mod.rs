//! Event poller abstraction (component F): a polymorphic interface over an
//! OS readiness primitive, implemented by an epoll backend (Linux) and a
//! generic `poll(2)` backend. Both honor sub-millisecond poll timeouts by
//! busy-looping or sleeping between zero-timeout polls, since the
//! underlying OS primitives here are millisecond-grained.

#[cfg(target_os = "linux")]
pub mod epoll;
#[cfg(unix)]
pub mod poll_backend;

use crate::clock::{millisecs, TickType, ONE_MILLISEC};
use crate::traits::{EventHandler, Interests};
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum PollError {
    #[error("system call failed: {0}")]
    System(#[from] std::io::Error),
}

/// Implemented by a concrete poller backend.
pub trait EventPoller {
    /// Subscribes `handler` for `interests`. Re-booking the same fd
    /// updates its interests in place.
    fn book(&mut self, handler: Arc<dyn EventHandler>, interests: Interests) -> Result<(), PollError>;

    /// Unsubscribes the handler registered for `fd`, if any.
    fn remove(&mut self, fd: i32) -> Result<(), PollError>;

    /// Waits up to `timeout` ticks for readiness, dispatching
    /// `on_event` to every ready handler.
    fn poll(&mut self, now: TickType, timeout: TickType) -> Result<(), PollError>;
}

/// Runs `poll_once` (a single millisecond-grained poll attempt returning
/// the number of ready handlers it dispatched) so that `timeout` ticks
/// are honored even when they fall below one millisecond: below that
/// threshold, repeatedly poll with a zero timeout, sleeping `timeout/8`
/// between attempts (or spinning, if `busy_poller`), until an event
/// arrives or the whole timeout elapses.
pub(crate) fn poll_with_submillisecond_timeout(
    mut poll_once: impl FnMut(i32) -> Result<usize, PollError>,
    timeout: TickType,
    busy_poller: bool,
) -> Result<(), PollError> {
    if timeout <= 0 {
        poll_once(0)?;
        return Ok(());
    }
    if timeout >= ONE_MILLISEC {
        poll_once(millisecs(timeout) as i32)?;
        return Ok(());
    }

    let deadline = std::time::Instant::now() + std::time::Duration::from_nanos(timeout as u64);
    let sleep_interval = std::time::Duration::from_nanos((timeout / 8).max(1) as u64);
    loop {
        if poll_once(0)? > 0 {
            return Ok(());
        }
        if std::time::Instant::now() >= deadline {
            return Ok(());
        }
        if !busy_poller {
            std::thread::sleep(sleep_interval);
        }
    }
}
