//! Millisecond clocks driving the debounce and gesture timers.

use std::cell::Cell;
use std::time::Instant;

/// A monotonic millisecond counter.
///
/// The value wraps around at `u32::MAX`; every consumer compares timestamps with
/// `wrapping_sub`, so a wrap is harmless as long as no interval exceeds ~49 days.
pub trait ClockSource {
    fn now_ms(&self) -> u32;
}

impl<C: ClockSource + ?Sized> ClockSource for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Wall clock counting milliseconds since its creation.
#[derive(Copy, Clone, Debug)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for MonotonicClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap-around.
        self.start.elapsed().as_millis() as u32
    }
}

/// A clock that only moves when told to. Used for simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u32>,
}

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}
