//! One sample of the robot's motion.
//!
//! A tracked robot has no steering: it turns by running the tracks at
//! different speeds or in opposite directions. A [`State`] therefore captures
//! both track speeds, an optional heading and how long the sample lasted.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::calibration::SpeedCalibration;
use crate::clock::Tick;

/// Direction, track speeds and duration of one motion sample.
///
/// Only the duration can change after construction. Two states are equal when
/// direction and both speeds match, whatever their durations; the history uses
/// this to extend a run instead of recording the same motion twice.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct State {
    direction: u16,
    left_speed: i32,
    right_speed: i32,
    duration: Tick,
}

impl State {
    /// Construct a new state.
    ///
    /// # Arguments
    ///
    /// * `direction`: Heading in degrees, reduced modulo 360.
    /// * `duration`: Duration in ticks.
    /// * `left_speed`: Left track speed in the calibration's speed space.
    /// * `right_speed`: Right track speed in the calibration's speed space.
    pub const fn new(direction: u16, duration: Tick, left_speed: i32, right_speed: i32) -> Self {
        State {
            direction: direction % 360,
            left_speed,
            right_speed,
            duration,
        }
    }

    /// A stopped state for the given calibration.
    pub const fn neutral(calibration: &SpeedCalibration) -> Self {
        State::new(0, 0, calibration.neutral, calibration.neutral)
    }

    /// Heading in degrees, `0..360`. Zero when no heading source is fitted.
    pub fn direction(&self) -> u16 {
        self.direction
    }

    /// Left track speed.
    pub fn left_speed(&self) -> i32 {
        self.left_speed
    }

    /// Right track speed.
    pub fn right_speed(&self) -> i32 {
        self.right_speed
    }

    /// Duration in ticks.
    pub fn duration(&self) -> Tick {
        self.duration
    }

    /// Replace the duration.
    pub fn set_duration(&mut self, duration: Tick) {
        self.duration = duration;
    }

    /// Whether the left track runs forward.
    pub fn is_left_forward(&self, calibration: &SpeedCalibration) -> bool {
        calibration.is_forward(self.left_speed)
    }

    /// Whether the right track runs forward.
    pub fn is_right_forward(&self, calibration: &SpeedCalibration) -> bool {
        calibration.is_forward(self.right_speed)
    }

    /// Turns this state into its opposite in place.
    ///
    /// Each track speed is mirrored around neutral and the heading is rotated
    /// by 180 degrees. The duration is kept, so replaying the result for the
    /// same time undoes the original motion. Only valid for calibrations that
    /// pass [`SpeedCalibration::validate`].
    pub fn reverse(&mut self, calibration: &SpeedCalibration) {
        self.left_speed = calibration.opposite(self.left_speed);
        self.right_speed = calibration.opposite(self.right_speed);
        self.direction = (self.direction + 180) % 360;
    }

    /// Returns the opposite of this state, leaving `self` untouched.
    pub fn reversed(&self, calibration: &SpeedCalibration) -> State {
        let mut opposite = *self;
        opposite.reverse(calibration);
        opposite
    }
}

impl Default for State {
    fn default() -> Self {
        State::neutral(&SpeedCalibration::VEX_SERVO)
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.direction == other.direction
            && self.left_speed == other.left_speed
            && self.right_speed == other.right_speed
    }
}

impl Eq for State {}

impl core::fmt::Display for State {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "(dir: {}°, L: {}, R: {}, {} ticks)",
            self.direction, self.left_speed, self.right_speed, self.duration
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VEX: SpeedCalibration = SpeedCalibration::VEX_SERVO;

    #[test]
    fn test_default_is_neutral() {
        let state = State::default();
        assert_eq!(state.left_speed(), 1500);
        assert_eq!(state.right_speed(), 1500);
        assert_eq!(state.direction(), 0);
        assert_eq!(state.duration(), 0);
    }

    #[test]
    fn test_equality_ignores_duration() {
        let a = State::new(0, 10, 1600, 1600);
        let b = State::new(0, 99_999, 1600, 1600);
        assert_eq!(a, b);
        assert_ne!(a, State::new(0, 10, 1600, 1610));
        assert_ne!(a, State::new(90, 10, 1600, 1600));
    }

    #[test]
    fn test_forward_flags() {
        let state = State::new(0, 0, 1501, 1500);
        assert!(state.is_left_forward(&VEX));
        assert!(!state.is_right_forward(&VEX));
    }

    #[test]
    fn test_reverse_full_speed() {
        let mut state = State::new(0, 0, VEX.forward, VEX.forward);
        state.reverse(&VEX);
        assert_eq!(state.left_speed(), VEX.reverse);
        assert_eq!(state.right_speed(), VEX.reverse);
    }

    #[test]
    fn test_reverse_turn_and_heading() {
        let mut state = State::new(270, 4_000, 1450, 1550);
        state.reverse(&VEX);
        assert_eq!(state.left_speed(), 1550);
        assert_eq!(state.right_speed(), 1450);
        assert_eq!(state.direction(), 90);
        assert_eq!(state.duration(), 4_000);
    }

    #[test]
    fn test_reverse_twice_round_trips() {
        for cal in [SpeedCalibration::VEX_SERVO, SpeedCalibration::ADAFRUIT_DC] {
            for left in [cal.reverse, cal.neutral - 7, cal.neutral, cal.neutral + 33, cal.forward] {
                let original = State::new(45, 12, left, cal.forward - (left - cal.reverse));
                let back = original.reversed(&cal).reversed(&cal);
                assert_eq!(back, original);
            }
        }
    }

    #[test]
    fn test_reverse_extreme_speeds_saturates() {
        let state = State::new(0, 0, i32::MIN, 1500).reversed(&VEX);
        assert_eq!(state.left_speed(), i32::MAX);
        assert_eq!(state.right_speed(), 1500);
    }

    #[test]
    fn test_direction_is_reduced() {
        assert_eq!(State::new(365, 0, 1500, 1500).direction(), 5);
    }
}
