//! # Logical Clock
//!
//! A monotonically increasing tick counter. The kernel never advances it
//! on its own: the external driver (a timer interrupt in production, the
//! test harness here) calls `Kernel::advance_clock` once per logical time
//! unit, which is the only place ticks move.

/// Monotonic tick source. Leaf dependency of the whole kernel.
#[derive(Debug)]
pub struct Clock {
    tick: u64,
}

impl Clock {
    pub const fn new() -> Self {
        Self { tick: 0 }
    }

    /// Current tick count.
    #[inline]
    pub fn now(&self) -> u64 {
        self.tick
    }

    /// Advance one tick and return the new count.
    pub(crate) fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}
