//! Generic `poll(2)` backend for the event poller abstraction: fd-indexed,
//! with swap-remove compaction on removal, mirroring the original's
//! pooled-index-plus-vector-swap approach (a plain `HashMap` here, since
//! book/remove are far rarer than poll and don't need the allocator's
//! O(1)-without-malloc property).

use std::collections::HashMap;
use std::sync::Arc;

use super::{poll_with_submillisecond_timeout, EventPoller, PollError};
use crate::clock::TickType;
use crate::traits::{EventHandler, Interests};

pub struct PollBackend {
    fds: Vec<libc::pollfd>,
    handlers: Vec<(Arc<dyn EventHandler>, Interests)>,
    fd_index: HashMap<i32, usize>,
    busy_poller: bool,
}

impl PollBackend {
    #[must_use]
    pub fn new(busy_poller: bool) -> Self {
        Self { fds: Vec::new(), handlers: Vec::new(), fd_index: HashMap::new(), busy_poller }
    }

    fn poll_events_for(interests: Interests) -> i16 {
        let mut events = 0i16;
        if interests.contains(Interests::READABLE) {
            events |= libc::POLLIN;
        }
        if interests.contains(Interests::WRITABLE) {
            events |= libc::POLLOUT;
        }
        events
    }

    fn interests_from_revents(revents: i16) -> Interests {
        let mut interests = Interests::empty();
        if revents & libc::POLLIN != 0 {
            interests |= Interests::READABLE;
        }
        if revents & libc::POLLOUT != 0 {
            interests |= Interests::WRITABLE;
        }
        interests
    }

    fn poll_once(&mut self, now: TickType, timeout_ms: i32) -> Result<usize, PollError> {
        if self.fds.is_empty() {
            return Ok(0);
        }
        // SAFETY: `fds` is a valid, appropriately-sized buffer.
        let n = unsafe { libc::poll(self.fds.as_mut_ptr(), self.fds.len() as libc::nfds_t, timeout_ms) };
        if n < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(0);
            }
            return Err(PollError::System(err));
        }
        if n == 0 {
            return Ok(0);
        }

        let mut to_remove = Vec::new();
        let mut ready_count = 0usize;
        for i in 0..self.fds.len() {
            let revents = self.fds[i].revents;
            if revents == 0 {
                continue;
            }
            ready_count += 1;
            let fd = self.fds[i].fd;
            let ready = Self::interests_from_revents(revents);
            let (handler, booked) = (Arc::clone(&self.handlers[i].0), self.handlers[i].1);

            let done = handler.on_event(now, ready);
            if done.is_empty() {
                continue;
            }
            let remaining = booked - done;
            if remaining.is_empty() {
                to_remove.push(fd);
            } else {
                self.handlers[i].1 = remaining;
                self.fds[i].events = Self::poll_events_for(remaining);
            }
        }
        for fd in to_remove {
            self.remove(fd)?;
        }
        Ok(ready_count)
    }
}

impl EventPoller for PollBackend {
    fn book(&mut self, handler: Arc<dyn EventHandler>, interests: Interests) -> Result<(), PollError> {
        let fd = handler.fd();
        let events = Self::poll_events_for(interests);
        if let Some(&idx) = self.fd_index.get(&fd) {
            self.fds[idx].events = events;
            self.handlers[idx] = (handler, interests);
        } else {
            let idx = self.fds.len();
            self.fds.push(libc::pollfd { fd, events, revents: 0 });
            self.handlers.push((handler, interests));
            self.fd_index.insert(fd, idx);
        }
        Ok(())
    }

    fn remove(&mut self, fd: i32) -> Result<(), PollError> {
        if let Some(idx) = self.fd_index.remove(&fd) {
            let last = self.fds.len() - 1;
            self.fds.swap_remove(idx);
            self.handlers.swap_remove(idx);
            if idx != last {
                let moved_fd = self.fds[idx].fd;
                self.fd_index.insert(moved_fd, idx);
            }
        }
        Ok(())
    }

    fn poll(&mut self, now: TickType, timeout: TickType) -> Result<(), PollError> {
        let busy_poller = self.busy_poller;
        poll_with_submillisecond_timeout(|timeout_ms| self.poll_once(now, timeout_ms), timeout, busy_poller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullHandler {
        fd: i32,
    }
    impl EventHandler for NullHandler {
        fn fd(&self) -> i32 {
            self.fd
        }
        fn on_event(&self, _now: TickType, _ready: Interests) -> Interests {
            Interests::empty()
        }
    }

    #[test]
    fn book_remove_compacts_via_swap_remove() {
        let mut backend = PollBackend::new(false);
        for fd in [10, 11, 12] {
            backend.book(Arc::new(NullHandler { fd }), Interests::READABLE).unwrap();
        }
        backend.remove(10).unwrap();
        assert_eq!(backend.fds.len(), 2);
        assert!(backend.fd_index.contains_key(&11));
        assert!(backend.fd_index.contains_key(&12));
        assert!(!backend.fd_index.contains_key(&10));
        for (fd, &idx) in &backend.fd_index {
            assert_eq!(backend.fds[idx].fd, *fd);
        }
    }

    #[test]
    fn poll_with_no_fds_booked_returns_immediately() {
        let mut backend = PollBackend::new(false);
        backend.poll(0, crate::clock::ONE_MILLISEC).unwrap();
    }
}
