//! Monotonic tick counter adapter.
//!
//! The controller has no wall clock. Time is read from a free-running unsigned
//! counter (microseconds on the reference platform) that wraps back to zero
//! roughly every 70 minutes. This module computes elapsed time between two
//! readings of that counter and abstracts the counter itself behind
//! [`TickSource`] so the history and motor can be tested with [`MockTicks`].

use alloc::rc::Rc;
use core::cell::Cell;

/// A reading of the free-running tick counter.
pub type Tick = u32;

/// Largest value the reference counter reaches before wrapping.
pub const TICK_MAX: Tick = u32::MAX;

/// Reading reserved to mean "no measurement yet".
pub const UNSET: Tick = 0;

/// Number of ticks in one millisecond for the microsecond counter.
pub const TICKS_PER_MS: Tick = 1_000;

/// Returns the ticks elapsed between `early` and `later` on a counter wrapping at [`TICK_MAX`].
///
/// `early` must be the chronologically first reading. When `later` is smaller
/// than `early` the counter is assumed to have wrapped exactly once.
///
/// # Arguments
///
/// * `early`: The first reading.
/// * `later`: The second reading.
///
/// # Returns
///
/// The elapsed ticks, or `0` when either reading is [`UNSET`].
pub const fn elapsed(early: Tick, later: Tick) -> Tick {
    elapsed_with_max(early, later, TICK_MAX)
}

/// Same as [`elapsed`] for a counter that wraps at `max` instead of [`TICK_MAX`].
pub const fn elapsed_with_max(early: Tick, later: Tick, max: Tick) -> Tick {
    if early == UNSET || later == UNSET {
        return 0;
    }
    if later >= early {
        later - early
    } else {
        (max - early) + later
    }
}

/// Platform-agnostic source of tick readings.
///
/// Implementations must be cheap to clone: the motor and its history each keep
/// a handle to the same counter.
pub trait TickSource: Clone {
    /// Returns the current counter value.
    fn now(&self) -> Tick;
}

/// Controllable tick source for tests and simulations.
///
/// Clones share the same counter, so advancing one handle is visible through
/// every other handle.
///
/// # Example
///
/// ```
/// use mjolnir_motion::clock::{MockTicks, TickSource};
///
/// let ticks = MockTicks::with_initial(1);
/// let shared = ticks.clone();
/// ticks.advance(1_000);
/// assert_eq!(shared.now(), 1_001);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTicks {
    current: Rc<Cell<Tick>>,
}

impl MockTicks {
    /// Creates a counter reading [`UNSET`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counter starting at `tick`.
    pub fn with_initial(tick: Tick) -> Self {
        Self {
            current: Rc::new(Cell::new(tick)),
        }
    }

    /// Sets the counter to an absolute value.
    pub fn set(&self, tick: Tick) {
        self.current.set(tick);
    }

    /// Advances the counter, wrapping at [`TICK_MAX`] like the hardware does.
    pub fn advance(&self, ticks: Tick) {
        self.current.set(self.current.get().wrapping_add(ticks));
    }
}

impl TickSource for MockTicks {
    fn now(&self) -> Tick {
        self.current.get()
    }
}
