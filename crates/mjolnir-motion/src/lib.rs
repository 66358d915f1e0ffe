#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` motion core for two-track robots."]
#![doc = ""]
#![doc = "This crate records every motor move in a bounded, coalescing history and"]
#![doc = "replays that history in reverse to retrace a route (backtracking)."]

extern crate alloc;

pub mod backtrack;
pub mod calibration;
pub mod clock;
pub mod error;
pub mod history;
pub mod motor;
pub mod state;

pub use backtrack::{Backtrack, BacktrackStatus};
pub use calibration::{Rotation, SpeedCalibration};
pub use clock::{MockTicks, Tick, TickSource, elapsed};
pub use error::MotionError;
pub use history::{BacktrackCursor, DEFAULT_CAPACITY, StateHistory};
pub use motor::{ActuatorSide, Motor, Side};
pub use state::State;
