//! Debug-only assertion macros shared by the ring buffer and the lock-free
//! queues. Active only under `debug_assertions`, so there is zero overhead
//! in release builds.

/// Assert that a cursor difference never exceeds capacity.
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that a read cursor never advances past the write cursor.
macro_rules! debug_assert_not_past_write {
    ($new_read:expr, $write:expr) => {
        debug_assert!(
            $new_read <= $write,
            "read cursor {} advanced past write cursor {}",
            $new_read,
            $write
        )
    };
}

/// Assert that a sequence-like counter only increases.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!($new >= $old, "{} decreased from {} to {}", $name, $old, $new)
    };
}

/// Assert we are reading from a slot within the initialized range.
macro_rules! debug_assert_initialized_read {
    ($pos:expr, $head:expr, $tail:expr) => {
        debug_assert!(
            $pos >= $head && $pos < $tail,
            "reading slot at seq {} outside initialized range [{}, {})",
            $pos,
            $head,
            $tail
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_initialized_read;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_not_past_write;
