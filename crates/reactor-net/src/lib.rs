//! reactor-net: the stream connection adapter (component I), the one
//! consumer of `reactor-core`'s ring buffer that touches a raw socket.
//!
//! Kept as a separate crate because it is included only to pin the ring
//! buffer's contract at a socket boundary, not to claim the whole socket
//! stack — address parsing, connect-in-progress handling, and socket
//! option wrapping stay external collaborators, so this crate pulls in
//! `libc` without forcing that dependency onto `reactor-core`'s
//! single-threaded hot paths.

pub mod connection;

pub use connection::{ConnectionError, SendOutcome, StreamConnection, StreamListener};
