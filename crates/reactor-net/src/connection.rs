//! Stream connection adapter (component I, boundary): bridges a connected
//! TCP socket to a pair of [`ByteRing`]s and the event poller abstraction.
//!
//! Grounded in the original `StreamConnection`'s send/receive algorithm:
//! a direct-write attempt on an empty send buffer, buffering the unsent
//! remainder and subscribing to writable events only on the
//! empty-to-non-empty transition, flushing via a zero-copy `writev` over
//! the ring's readable halves, and draining all available bytes per
//! `receive()` call via a loop bounded by `read` returning 0 or an error.
//!
//! Specified to fix the ring-buffer contract at the socket boundary, not
//! to claim the whole socket stack: address parsing, connect-in-progress
//! handling, and socket option wrapping stay external collaborators.

use std::sync::atomic::{AtomicBool, Ordering};

use reactor_core::clock::TickType;
use reactor_core::traits::{EventHandler, Interests};
use reactor_core::{ByteRing, ByteRingConfig, WritePolicy};

#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    #[error("system call failed: {0}")]
    System(#[from] std::io::Error),
    #[error("send buffer is full")]
    SendBufferFull,
}

/// Notified with the receive ring every time new bytes arrive. The
/// listener reads (and commits) whatever it consumes via the ring's own
/// `fetch_all`/`commit_read` — the connection does not pre-drain it.
pub trait StreamListener: Send + Sync {
    fn on_stream_data(&self, data: &ByteRing);
}

/// Whether [`StreamConnection::send`] left a remainder buffered, in which
/// case the caller must book [`Interests::WRITABLE`] with its event
/// poller — the connection has no handle to the poller itself, since
/// poller backends are generic over their own concrete type while this
/// struct is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOutcome {
    pub needs_writable_interest: bool,
}

/// Owns a connected socket's send/receive ring buffers. Implements
/// [`EventHandler`] so it can be booked directly with an event poller;
/// `send`'s buffering transition is reported back via [`SendOutcome`]
/// rather than the connection re-booking itself (see `SendOutcome`'s doc).
pub struct StreamConnection<L: StreamListener> {
    fd: i32,
    listener: L,
    send_buffer: ByteRing,
    recv_buffer: ByteRing,
    send_policy: WritePolicy,
    connected: AtomicBool,
}

impl<L: StreamListener> StreamConnection<L> {
    #[must_use]
    pub fn new(fd: i32, listener: L, send_config: ByteRingConfig, recv_config: ByteRingConfig) -> Self {
        Self {
            fd,
            listener,
            send_buffer: ByteRing::new(send_config),
            recv_buffer: ByteRing::new(recv_config),
            send_policy: WritePolicy::Split,
            connected: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn disconnect(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            // SAFETY: `fd` is owned by this connection and closed exactly
            // once, guarded by the `connected` flag above.
            unsafe {
                libc::close(self.fd);
            }
        }
    }

    /// Sends `buffer`, buffering whatever the OS doesn't accept directly.
    ///
    /// # Errors
    /// Returns [`ConnectionError::SendBufferFull`] if the unsent
    /// remainder cannot fit in the send ring, or [`ConnectionError::System`]
    /// if the underlying `send`/`writev` call fails.
    pub fn send(&self, buffer: &[u8]) -> Result<SendOutcome, ConnectionError> {
        if self.send_buffer.is_empty() {
            self.send_direct(buffer)
        } else {
            self.flush_send_buffer()?;
            if self.send_buffer.is_empty() {
                self.send_direct(buffer)
            } else {
                self.buffer_send_data(buffer)
            }
        }
    }

    fn send_direct(&self, buffer: &[u8]) -> Result<SendOutcome, ConnectionError> {
        if buffer.is_empty() {
            return Ok(SendOutcome { needs_writable_interest: false });
        }
        // SAFETY: `fd` is a valid, connected socket; `buffer` is a valid
        // slice for its length.
        let sent = unsafe { libc::send(self.fd, buffer.as_ptr().cast(), buffer.len(), 0) };
        if sent < 0 {
            return Err(ConnectionError::System(std::io::Error::last_os_error()));
        }
        let sent = sent as usize;
        if sent < buffer.len() {
            return self.buffer_send_data(&buffer[sent..]);
        }
        Ok(SendOutcome { needs_writable_interest: false })
    }

    fn buffer_send_data(&self, buffer: &[u8]) -> Result<SendOutcome, ConnectionError> {
        let buffer_empty_before = self.send_buffer.is_empty();
        self.send_buffer
            .write(buffer, self.send_policy)
            .map_err(|_| ConnectionError::SendBufferFull)?;
        let needs_writable_interest = buffer_empty_before && !self.send_buffer.is_empty();
        if needs_writable_interest {
            tracing::debug!(fd = self.fd, "send buffer filled, requesting writable interest");
        }
        Ok(SendOutcome { needs_writable_interest })
    }

    /// Flushes as much of the send buffer as the OS currently accepts, via
    /// a zero-copy `writev` over the ring's two readable halves.
    fn flush_send_buffer(&self) -> Result<(), ConnectionError> {
        let (first, second) = self.send_buffer.fetch_all();
        let data_size = first.len() + second.len();
        if data_size == 0 {
            return Ok(());
        }
        let mut iov = [
            libc::iovec { iov_base: first.as_ptr() as *mut _, iov_len: first.len() },
            libc::iovec { iov_base: second.as_ptr() as *mut _, iov_len: second.len() },
        ];
        let iovcnt = if second.is_empty() { 1 } else { 2 };
        // SAFETY: `iov` describes the ring's own readable slices, valid
        // for the duration of this call.
        let sent = unsafe { libc::writev(self.fd, iov.as_mut_ptr(), iovcnt) };
        if sent < 0 {
            return Err(ConnectionError::System(std::io::Error::last_os_error()));
        }
        self.send_buffer.commit_read(sent as usize);
        Ok(())
    }

    /// Drains every available byte from the socket into the receive
    /// buffer, invoking the listener after each `read`, until the OS
    /// reports no more data (`read` returns `<= 0`).
    fn receive(&self) {
        loop {
            let (first, second) = self.recv_buffer.writable_mut();
            if first.is_empty() && second.is_empty() {
                break;
            }
            let mut iov = [
                libc::iovec { iov_base: first.as_mut_ptr().cast(), iov_len: first.len() },
                libc::iovec { iov_base: second.as_mut_ptr().cast(), iov_len: second.len() },
            ];
            let iovcnt = if second.is_empty() { 1 } else { 2 };
            // SAFETY: `iov` describes the ring's own free-space slices,
            // exclusively owned by the producer side (this call).
            let bytes_got = unsafe { libc::readv(self.fd, iov.as_mut_ptr(), iovcnt) };
            if bytes_got <= 0 {
                break;
            }
            self.recv_buffer.commit_write(bytes_got as usize);
            self.listener.on_stream_data(&self.recv_buffer);
        }
    }
}

impl<L: StreamListener> EventHandler for StreamConnection<L> {
    fn fd(&self) -> i32 {
        self.fd
    }

    fn on_event(&self, _now: TickType, ready: Interests) -> Interests {
        let mut done = Interests::empty();
        if ready.contains(Interests::WRITABLE) {
            if let Err(err) = self.flush_send_buffer() {
                tracing::warn!(fd = self.fd, %err, "flush on writable event failed");
            } else if self.send_buffer.is_empty() {
                done |= Interests::WRITABLE;
            }
        }
        if ready.contains(Interests::READABLE) {
            self.receive();
        }
        done
    }
}
