//! Linux `epoll` backend for the event poller abstraction.

use std::collections::HashMap;
use std::sync::Arc;

use super::{poll_with_submillisecond_timeout, EventPoller, PollError};
use crate::clock::TickType;
use crate::traits::{EventHandler, Interests};

pub struct EpollPoller {
    epfd: i32,
    handlers: HashMap<i32, (Arc<dyn EventHandler>, Interests)>,
    busy_poller: bool,
}

impl EpollPoller {
    pub fn new(busy_poller: bool) -> Result<Self, PollError> {
        // SAFETY: no preconditions beyond the flags argument being valid,
        // which `0` always is.
        let epfd = unsafe { libc::epoll_create1(0) };
        if epfd < 0 {
            return Err(PollError::System(std::io::Error::last_os_error()));
        }
        Ok(Self { epfd, handlers: HashMap::new(), busy_poller })
    }

    fn epoll_events_for(interests: Interests) -> u32 {
        let mut events = 0u32;
        if interests.contains(Interests::READABLE) {
            events |= libc::EPOLLIN as u32;
        }
        if interests.contains(Interests::WRITABLE) {
            events |= libc::EPOLLOUT as u32;
        }
        events
    }

    fn interests_from_events(events: u32) -> Interests {
        let mut interests = Interests::empty();
        if events & (libc::EPOLLIN as u32) != 0 {
            interests |= Interests::READABLE;
        }
        if events & (libc::EPOLLOUT as u32) != 0 {
            interests |= Interests::WRITABLE;
        }
        interests
    }

    fn poll_once(&mut self, now: TickType, timeout_ms: i32) -> Result<usize, PollError> {
        let mut events: [libc::epoll_event; 64] = unsafe { std::mem::zeroed() };
        // SAFETY: `events` is a valid buffer of the given length.
        let n = unsafe { libc::epoll_wait(self.epfd, events.as_mut_ptr(), events.len() as i32, timeout_ms) };
        if n < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(0);
            }
            return Err(PollError::System(err));
        }

        for ev in &events[..n as usize] {
            let fd = ev.u64 as i32;
            let ready = Self::interests_from_events(ev.events);
            let entry = self.handlers.get(&fd).map(|(h, i)| (Arc::clone(h), *i));
            let Some((handler, booked)) = entry else { continue };

            let done = handler.on_event(now, ready);
            if done.is_empty() {
                continue;
            }
            let remaining = booked - done;
            if remaining.is_empty() {
                self.remove(fd)?;
            } else {
                let mut event = libc::epoll_event { events: Self::epoll_events_for(remaining), u64: fd as u64 };
                // SAFETY: `fd` is currently registered (found in `handlers`).
                let rc = unsafe { libc::epoll_ctl(self.epfd, libc::EPOLL_CTL_MOD, fd, &mut event) };
                if rc < 0 {
                    return Err(PollError::System(std::io::Error::last_os_error()));
                }
                self.handlers.insert(fd, (handler, remaining));
            }
        }
        Ok(n as usize)
    }
}

impl EventPoller for EpollPoller {
    fn book(&mut self, handler: Arc<dyn EventHandler>, interests: Interests) -> Result<(), PollError> {
        let fd = handler.fd();
        let mut event = libc::epoll_event { events: Self::epoll_events_for(interests), u64: fd as u64 };
        // SAFETY: `event` is a valid, stack-local epoll_event.
        let rc = unsafe { libc::epoll_ctl(self.epfd, libc::EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            // Corrected: the original checks `if (rs = EEXIST)` — an
            // assignment, not a comparison — so this fallback never ran
            // on an actual EEXIST. This checks the real errno.
            if err.raw_os_error() == Some(libc::EEXIST) {
                // SAFETY: same as above.
                let rc2 = unsafe { libc::epoll_ctl(self.epfd, libc::EPOLL_CTL_MOD, fd, &mut event) };
                if rc2 < 0 {
                    return Err(PollError::System(std::io::Error::last_os_error()));
                }
            } else {
                return Err(PollError::System(err));
            }
        }
        self.handlers.insert(fd, (handler, interests));
        Ok(())
    }

    fn remove(&mut self, fd: i32) -> Result<(), PollError> {
        if self.handlers.remove(&fd).is_some() {
            // SAFETY: the final argument is ignored by the kernel for
            // EPOLL_CTL_DEL on Linux >= 2.6.9 but must still be non-null
            // on older kernels; a stack-local dummy event is safe either way.
            let mut dummy: libc::epoll_event = unsafe { std::mem::zeroed() };
            let rc = unsafe { libc::epoll_ctl(self.epfd, libc::EPOLL_CTL_DEL, fd, &mut dummy) };
            if rc < 0 {
                return Err(PollError::System(std::io::Error::last_os_error()));
            }
        }
        Ok(())
    }

    fn poll(&mut self, now: TickType, timeout: TickType) -> Result<(), PollError> {
        let busy_poller = self.busy_poller;
        poll_with_submillisecond_timeout(|timeout_ms| self.poll_once(now, timeout_ms), timeout, busy_poller)
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        // SAFETY: `epfd` is owned by this struct and closed exactly once.
        unsafe {
            libc::close(self.epfd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct PipeHandler {
        fd: i32,
        seen: Mutex<Vec<Interests>>,
        done_after: AtomicU32,
    }

    impl EventHandler for PipeHandler {
        fn fd(&self) -> i32 {
            self.fd
        }
        fn on_event(&self, _now: TickType, ready: Interests) -> Interests {
            self.seen.lock().unwrap().push(ready);
            if self.done_after.fetch_sub(1, Ordering::Relaxed) == 1 {
                ready
            } else {
                Interests::empty()
            }
        }
    }

    fn make_pipe() -> (i32, i32) {
        let mut fds = [0i32; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        (fds[0], fds[1])
    }

    #[test]
    fn fires_on_readable_and_unsubscribes_when_handler_is_done() {
        let (read_fd, write_fd) = make_pipe();
        let mut poller = EpollPoller::new(false).unwrap();
        let handler =
            Arc::new(PipeHandler { fd: read_fd, seen: Mutex::new(Vec::new()), done_after: AtomicU32::new(1) });
        poller.book(Arc::clone(&handler) as Arc<dyn EventHandler>, Interests::READABLE).unwrap();

        unsafe {
            libc::write(write_fd, b"x".as_ptr().cast(), 1);
        }
        poller.poll(0, 50 * crate::clock::ONE_MILLISEC).unwrap();
        assert_eq!(handler.seen.lock().unwrap().len(), 1);
        assert!(handler.seen.lock().unwrap()[0].contains(Interests::READABLE));

        unsafe {
            libc::close(read_fd);
            libc::close(write_fd);
        }
    }

    #[test]
    fn rebooking_the_same_fd_goes_through_the_eexist_fallback() {
        let (read_fd, write_fd) = make_pipe();
        let mut poller = EpollPoller::new(false).unwrap();
        let handler =
            Arc::new(PipeHandler { fd: read_fd, seen: Mutex::new(Vec::new()), done_after: AtomicU32::new(99) });
        poller.book(Arc::clone(&handler) as Arc<dyn EventHandler>, Interests::READABLE).unwrap();
        // Re-booking the identical fd takes the EPOLL_CTL_ADD -> EEXIST ->
        // EPOLL_CTL_MOD path exercised by the fix.
        poller.book(Arc::clone(&handler) as Arc<dyn EventHandler>, Interests::WRITABLE).unwrap();

        unsafe {
            libc::close(read_fd);
            libc::close(write_fd);
        }
    }
}
