//! RTMP timestamps are 32 bit unsigned integers holding the number of milliseconds since an
//! unknown epoch.
//!
//! Outgoing messages are stamped with the uptime of the local clock.  The value overflows a
//! `u32` after roughly 49.7 days; that wrap is accepted, so every difference between two
//! timestamps has to be computed with wrapping arithmetic.
//!
//! ```
//! use rtmp_client::time::{timestamp_delta, Clock, ManualClock};
//!
//! let clock = ManualClock::new(u32::max_value() - 5);
//! let before = clock.uptime_ms();
//! clock.advance(10);
//!
//! assert_eq!(clock.uptime_ms(), 4);
//! assert_eq!(timestamp_delta(clock.uptime_ms(), before), 10);
//! ```

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// A source of millisecond uptime values used to timestamp outgoing messages
pub trait Clock {
    /// Milliseconds elapsed since the clock's epoch, wrapped to 32 bits
    fn uptime_ms(&self) -> u32;
}

/// Clock backed by the monotonic system clock.  Its epoch is the moment it was created.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    started_at: Instant,
}

impl MonotonicClock {
    pub fn new() -> MonotonicClock {
        MonotonicClock {
            started_at: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        MonotonicClock::new()
    }
}

impl Clock for MonotonicClock {
    fn uptime_ms(&self) -> u32 {
        // Truncation is the wraparound
        self.started_at.elapsed().as_millis() as u32
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time value, so a test can keep one handle while a session owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u32>>,
}

impl ManualClock {
    pub fn new(initial_value: u32) -> ManualClock {
        ManualClock {
            now: Rc::new(Cell::new(initial_value)),
        }
    }

    pub fn set(&self, value: u32) {
        self.now.set(value);
    }

    pub fn advance(&self, milliseconds: u32) {
        self.now.set(self.now.get().wrapping_add(milliseconds));
    }
}

impl Clock for ManualClock {
    fn uptime_ms(&self) -> u32 {
        self.now.get()
    }
}

/// Number of milliseconds from `earlier` to `later`, following the 32 bit wrap
pub fn timestamp_delta(later: u32, earlier: u32) -> u32 {
    later.wrapping_sub(earlier)
}
