//! Speed calibration for a pair of track actuators.
//!
//! Every actuator type defines a one-dimensional *speed space* with a neutral
//! point, a full-forward and a full-reverse value. Commands move the intent
//! speed around in that space; [`SpeedCalibration::to_native`] turns a speed
//! into the value the actuator understands.
//!
//! The reversal algorithm used for backtracking relies on the law of speed
//! delta:
//!
//! ```text
//! neutral - (forward - neutral) == reverse
//! neutral + (neutral - reverse) == forward
//! ```
//!
//! [`SpeedCalibration::validate`] rejects calibrations that break it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::MotionError;

/// Direction flag for current-driven actuators. Pulse-driven servos ignore it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    /// Drive the track forward.
    #[default]
    Forward,
    /// Drive the track backward.
    Backward,
}

/// Fixed speed constants of one actuator type.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedCalibration {
    /// Value that actively holds the track still. May lie outside the speed range.
    pub brake: i32,
    /// Stopped.
    pub neutral: i32,
    /// Full forward.
    pub forward: i32,
    /// Full reverse.
    pub reverse: i32,
    /// Lowest intent speed accepted; also the lowest native output.
    pub minimum: i32,
    /// Highest native output.
    pub maximum: i32,
    /// Width of the intent band mapped onto the native output range. Zero
    /// means intent speeds are already native values.
    pub relative: i32,
    /// Default acceleration step.
    pub delta: i32,
}

impl SpeedCalibration {
    /// VEX motors driven as servos by pulse width in microseconds.
    pub const VEX_SERVO: SpeedCalibration = SpeedCalibration {
        brake: 200,
        neutral: 1500,
        forward: 2000,
        reverse: 1000,
        minimum: 1000,
        maximum: 2000,
        relative: 0,
        delta: 10,
    };

    /// DC motors on an Adafruit motor shield: 8-bit magnitude plus a direction flag.
    pub const ADAFRUIT_DC: SpeedCalibration = SpeedCalibration {
        brake: 255,
        neutral: 255,
        forward: 510,
        reverse: 0,
        minimum: 0,
        maximum: 255,
        relative: 255,
        delta: 50,
    };

    /// Checks bound ordering and the law of speed delta.
    ///
    /// # Errors
    ///
    /// Returns `Err(MotionError::InvalidSpeedRange)` if the bounds are out of order.
    /// Returns `Err(MotionError::AsymmetricSpeedSpace)` if forward and reverse
    /// are not mirror images around neutral.
    pub const fn validate(&self) -> Result<(), MotionError> {
        if !(self.reverse < self.neutral && self.neutral < self.forward) {
            return Err(MotionError::InvalidSpeedRange(
                "reverse < neutral < forward must hold",
            ));
        }
        if self.minimum > self.reverse || self.minimum > self.maximum {
            return Err(MotionError::InvalidSpeedRange(
                "minimum must not exceed reverse or maximum",
            ));
        }
        if self.relative < 0 || self.delta < 0 {
            return Err(MotionError::InvalidSpeedRange(
                "relative and delta must be non-negative",
            ));
        }
        if self.neutral - (self.forward - self.neutral) != self.reverse
            || self.neutral + (self.neutral - self.reverse) != self.forward
        {
            return Err(MotionError::AsymmetricSpeedSpace(
                "forward and reverse must mirror around neutral",
            ));
        }
        Ok(())
    }

    /// Clamps an intent speed into `[minimum, forward]`.
    pub fn clamp(&self, speed: i32) -> i32 {
        speed.clamp(self.minimum, self.forward)
    }

    /// Lowest value a turn or full-reverse command drives a side to.
    pub const fn reverse_floor(&self) -> i32 {
        self.reverse - self.relative
    }

    /// Returns whether `speed` drives a track forward.
    pub const fn is_forward(&self, speed: i32) -> bool {
        speed > self.neutral
    }

    /// Mirrors `speed` around neutral, saturating at the `i32` bounds.
    pub const fn opposite(&self, speed: i32) -> i32 {
        if self.is_forward(speed) {
            self.neutral.saturating_sub(speed.saturating_sub(self.neutral))
        } else {
            self.neutral.saturating_add(self.neutral.saturating_sub(speed))
        }
    }

    /// Rotation flag for a speed: backward strictly below neutral.
    pub const fn rotation(&self, speed: i32) -> Rotation {
        if speed < self.neutral {
            Rotation::Backward
        } else {
            Rotation::Forward
        }
    }

    /// Converts a speed into the actuator's native output value.
    ///
    /// With `relative == 0` the speed is already native and is passed through.
    /// Otherwise the reverse band `[reverse, reverse + relative]` and the
    /// forward band `[forward - relative, forward]` are each interpolated onto
    /// `[minimum, maximum]`; speeds between the bands produce `minimum`.
    pub fn to_native(&self, speed: i32) -> u16 {
        let value = if self.relative == 0 {
            speed
        } else if speed < self.neutral {
            map_range(
                speed,
                self.reverse + self.relative,
                self.reverse,
                self.minimum,
                self.maximum,
            )
            .clamp(self.minimum, self.maximum)
        } else {
            map_range(
                speed,
                self.forward - self.relative,
                self.forward,
                self.minimum,
                self.maximum,
            )
            .clamp(self.minimum, self.maximum)
        };
        value.clamp(0, u16::MAX as i32) as u16
    }
}

impl Default for SpeedCalibration {
    fn default() -> Self {
        Self::VEX_SERVO
    }
}

/// Linear re-mapping of `x` from `[in_min, in_max]` onto `[out_min, out_max]`.
fn map_range(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    if in_max == in_min {
        return out_min;
    }
    let scaled = (x as i64 - in_min as i64) * (out_max as i64 - out_min as i64)
        / (in_max as i64 - in_min as i64);
    (scaled + out_min as i64).clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
