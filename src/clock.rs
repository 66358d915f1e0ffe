use std::time::Instant;

use mjolnir_motion::clock::{Tick, TickSource, UNSET};

/// Microsecond counter since startup, wrapping like the controller's hardware timer.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTicks {
    origin: Instant,
}

impl MonotonicTicks {
    pub fn new() -> Self {
        MonotonicTicks {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTicks {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for MonotonicTicks {
    fn now(&self) -> Tick {
        // Truncation is the wraparound.
        let micros = self.origin.elapsed().as_micros() as Tick;
        // Zero is reserved for "no reading yet".
        if micros == UNSET { 1 } else { micros }
    }
}
