//! Time source used by the timer queue and the reactor loop (component K).
//!
//! Ticks are nanoseconds, matching the original clock's tick unit. The
//! reactor and timer queue are generic over nothing here — they take a
//! `&dyn Clock` (or the process-default clock) rather than a compile-time
//! clock type, since the timer precision scenarios in the testable
//! properties require swapping in a [`SimulationClock`] without touching
//! the reactor.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// A tick is a signed nanosecond count, matching the original's `tick_type`.
pub type TickType = i64;

pub const ONE_WEEK: TickType = 604_800_000_000_000;
pub const ONE_DAY: TickType = 86_400_000_000_000;
pub const ONE_HOUR: TickType = 3_600_000_000_000;
pub const ONE_MINUTE: TickType = 60_000_000_000;
pub const ONE_SEC: TickType = 1_000_000_000;
pub const ONE_MILLISEC: TickType = 1_000_000;
pub const ONE_MICROSEC: TickType = 1_000;
pub const ONE_NANOSEC: TickType = 1;

#[inline]
pub const fn millisecs(ticks: TickType) -> TickType {
    ticks / ONE_MILLISEC
}

/// Ticks observed at a single instant: wall-clock (since UNIX epoch) and a
/// monotonic "raw" value used internally by the timer queue and the
/// sub-millisecond poll simulation.
///
/// Both fields are monotonic for a single clock instance across readers;
/// **how far** the monotonic `raw` value is allowed to drift from the
/// wall-clock `since_epoch` value before being recalibrated is left
/// implementation-defined (see DESIGN.md) — this crate does not attempt
/// drift correction at all, it simply samples `Instant`/`SystemTime`
/// independently each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTicks {
    pub since_epoch: TickType,
    pub raw: TickType,
}

/// A time source. Implemented by [`SystemClock`] (wall/monotonic OS clocks)
/// and [`SimulationClock`] (explicitly advanced by the caller).
pub trait Clock: Send + Sync {
    /// Nanosecond ticks since the UNIX epoch.
    fn realtime_ticks(&self) -> TickType;
    /// Monotonic nanosecond ticks since an arbitrary, clock-specific origin.
    /// Not comparable across different `Clock` instances.
    fn steady_ticks_raw(&self) -> TickType;
    /// Both readings, sampled together.
    fn clock_ticks(&self) -> ClockTicks {
        ClockTicks { since_epoch: self.realtime_ticks(), raw: self.steady_ticks_raw() }
    }
}

/// The default clock: realtime via `SystemTime`, steady via `Instant`
/// anchored at process start.
pub struct SystemClock {
    start: std::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: std::time::Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn realtime_ticks(&self) -> TickType {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as TickType)
            .unwrap_or(0)
    }

    fn steady_ticks_raw(&self) -> TickType {
        self.start.elapsed().as_nanos() as TickType
    }
}

/// A clock explicitly advanced by the caller, for deterministic tests of
/// timer precision without real sleeps.
pub struct SimulationClock {
    ticks: AtomicI64,
}

impl SimulationClock {
    pub fn new(start_ticks: TickType) -> Self {
        Self { ticks: AtomicI64::new(start_ticks) }
    }

    /// Advance the clock by `delta` ticks, returning the new value.
    pub fn advance(&self, delta: TickType) -> TickType {
        self.ticks.fetch_add(delta, Ordering::SeqCst) + delta
    }
}

impl Clock for SimulationClock {
    fn realtime_ticks(&self) -> TickType {
        self.ticks.load(Ordering::SeqCst)
    }

    fn steady_ticks_raw(&self) -> TickType {
        self.ticks.load(Ordering::SeqCst)
    }
}

static PROCESS_CLOCK: OnceLock<SystemClock> = OnceLock::new();

/// The process-default clock, following the "explicitly initialised
/// conventional accessor" redesign for what was a global singleton in the
/// source: first call wins, subsequent calls return the same instance.
pub fn process_clock() -> &'static SystemClock {
    PROCESS_CLOCK.get_or_init(SystemClock::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulation_clock_advances_monotonically() {
        let clock = SimulationClock::new(0);
        assert_eq!(clock.realtime_ticks(), 0);
        assert_eq!(clock.advance(ONE_MILLISEC), ONE_MILLISEC);
        assert_eq!(clock.steady_ticks_raw(), ONE_MILLISEC);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.steady_ticks_raw();
        let b = clock.steady_ticks_raw();
        assert!(b >= a);
    }

    #[test]
    fn millisecs_conversion() {
        assert_eq!(millisecs(5 * ONE_MILLISEC), 5);
    }
}
