//! Two-track motor state machine.
//!
//! [`Motor`] keeps an *intent* speed per side in the calibration's speed
//! space and an *actual* native value per side that is written to the
//! actuators. Every movement operation funnels into one primitive that writes
//! both actuators, updates the movement flag, appends a [`State`] to the
//! history and records the tick of the move.

use core::fmt;

use crate::calibration::{Rotation, SpeedCalibration};
use crate::clock::{Tick, TickSource, UNSET};
use crate::error::MotionError;
use crate::history::StateHistory;
use crate::state::State;

/// One side of the drive train.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Left track.
    Left,
    /// Right track.
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Output stage driving one track.
///
/// `value` is already in the actuator's native unit (pulse width for servos,
/// 8-bit magnitude for DC drivers). Servo implementations ignore `rotation`.
pub trait ActuatorSide {
    /// Error reported by the output stage.
    type Error;

    /// Writes a new output value.
    fn set_output(&mut self, value: u16, rotation: Rotation) -> Result<(), Self::Error>;
}

/// Motor controller for a tracked robot with two independently driven sides.
///
/// Speeds are never rejected: out-of-range intents are clamped before they
/// reach the actuators. Operations fail only when an actuator write fails.
#[derive(Debug)]
pub struct Motor<A: ActuatorSide, T: TickSource> {
    left: A,
    right: A,
    calibration: SpeedCalibration,
    history: StateHistory<T>,
    ticks: T,
    left_speed: i32,
    right_speed: i32,
    left_actual: u16,
    right_actual: u16,
    moving: bool,
    recording: bool,
    delta: i32,
    last_move_tick: Tick,
}

impl<A: ActuatorSide, T: TickSource> Motor<A, T> {
    /// Construct a stopped motor.
    ///
    /// Nothing is written to the actuators until the first movement operation.
    ///
    /// # Errors
    ///
    /// Returns the [`MotionError`] from [`SpeedCalibration::validate`] if the
    /// calibration cannot support reversal.
    pub fn new(
        left: A,
        right: A,
        calibration: SpeedCalibration,
        history: StateHistory<T>,
        ticks: T,
    ) -> Result<Self, MotionError> {
        calibration.validate()?;
        let neutral_output = calibration.to_native(calibration.neutral);
        Ok(Motor {
            left,
            right,
            calibration,
            history,
            ticks,
            left_speed: calibration.neutral,
            right_speed: calibration.neutral,
            left_actual: neutral_output,
            right_actual: neutral_output,
            moving: false,
            recording: true,
            delta: calibration.delta,
            last_move_tick: UNSET,
        })
    }

    /// Clamps both intents into `[minimum, forward]`.
    pub fn validate_speeds(&mut self) {
        self.left_speed = self.calibration.clamp(self.left_speed);
        self.right_speed = self.calibration.clamp(self.right_speed);
    }

    /// Validates the intents, maps them to native outputs and moves.
    pub fn move_relative(&mut self) -> Result<(), A::Error> {
        self.validate_speeds();
        self.left_actual = self.calibration.to_native(self.left_speed);
        self.right_actual = self.calibration.to_native(self.right_speed);
        self.move_tracks(self.left_speed, self.right_speed)
    }

    /// Sets both intents to absolute speeds and moves.
    ///
    /// The speeds are clamped into `[minimum, forward]` and converted with
    /// [`SpeedCalibration::to_native`] only, skipping the acceleration rules
    /// of the other operations. For servos this writes the values as given.
    pub fn turn(&mut self, left: i32, right: i32) -> Result<(), A::Error> {
        self.left_speed = self.calibration.clamp(left);
        self.right_speed = self.calibration.clamp(right);
        self.left_actual = self.calibration.to_native(self.left_speed);
        self.right_actual = self.calibration.to_native(self.right_speed);
        self.move_tracks(self.left_speed, self.right_speed)
    }

    /// Steers left: the right side speeds up by `delta`, the left side slows
    /// down by `delta` but not below [`SpeedCalibration::reverse_floor`].
    pub fn turn_left(&mut self, delta: i32) -> Result<(), A::Error> {
        self.right_speed = self.right_speed.saturating_add(delta);
        self.left_speed = self
            .left_speed
            .saturating_sub(delta)
            .max(self.calibration.reverse_floor());
        self.move_relative()
    }

    /// Mirror image of [`Motor::turn_left`].
    pub fn turn_right(&mut self, delta: i32) -> Result<(), A::Error> {
        self.left_speed = self.left_speed.saturating_add(delta);
        self.right_speed = self
            .right_speed
            .saturating_sub(delta)
            .max(self.calibration.reverse_floor());
        self.move_relative()
    }

    /// Sets the acceleration step to `delta` and moves one step forward.
    pub fn accelerate_forward(&mut self, delta: i32) -> Result<(), A::Error> {
        self.delta = delta;
        self.move_forward()
    }

    /// Sets the acceleration step to `delta` and moves one step in reverse.
    pub fn accelerate_reverse(&mut self, delta: i32) -> Result<(), A::Error> {
        self.delta = delta;
        self.move_reverse()
    }

    /// Raises both intents by the current step, capped at full forward.
    pub fn move_forward(&mut self) -> Result<(), A::Error> {
        let forward = self.calibration.forward;
        self.left_speed = self.left_speed.saturating_add(self.delta).min(forward);
        self.right_speed = self.right_speed.saturating_add(self.delta).min(forward);
        self.move_relative()
    }

    /// Lowers both intents by the current step, floored at the minimum.
    pub fn move_reverse(&mut self) -> Result<(), A::Error> {
        let minimum = self.calibration.minimum;
        self.left_speed = self.left_speed.saturating_sub(self.delta).max(minimum);
        self.right_speed = self.right_speed.saturating_sub(self.delta).max(minimum);
        self.move_relative()
    }

    /// Both sides full forward.
    pub fn move_forward_full_speed(&mut self) -> Result<(), A::Error> {
        self.left_speed = self.calibration.forward;
        self.right_speed = self.calibration.forward;
        self.move_relative()
    }

    /// Both sides full reverse.
    pub fn move_reverse_full_speed(&mut self) -> Result<(), A::Error> {
        self.left_speed = self.calibration.reverse_floor();
        self.right_speed = self.calibration.reverse_floor();
        self.move_relative()
    }

    /// Spins in place to the left.
    pub fn turn_left_full_speed(&mut self) -> Result<(), A::Error> {
        self.left_speed = self.calibration.reverse_floor();
        self.right_speed = self.calibration.forward;
        self.move_relative()
    }

    /// Spins in place to the right.
    pub fn turn_right_full_speed(&mut self) -> Result<(), A::Error> {
        self.left_speed = self.calibration.forward;
        self.right_speed = self.calibration.reverse_floor();
        self.move_relative()
    }

    /// Sets both intents to neutral and moves.
    pub fn stop_movement(&mut self) -> Result<(), A::Error> {
        self.left_speed = self.calibration.neutral;
        self.right_speed = self.calibration.neutral;
        self.move_relative()
    }

    /// Actively holds both tracks.
    ///
    /// Intents return to neutral and the brake value is written to both
    /// actuators. The history records a neutral state: replaying a brake in
    /// reverse must stop the robot, not mirror the brake value.
    pub fn brake(&mut self) -> Result<(), A::Error> {
        let neutral = self.calibration.neutral;
        self.left_speed = neutral;
        self.right_speed = neutral;
        self.left_actual = self.calibration.to_native(self.calibration.brake);
        self.right_actual = self.left_actual;
        self.move_tracks(neutral, neutral)
    }

    /// Drives straight at the faster of the two current intents.
    pub fn steer_center(&mut self) -> Result<(), A::Error> {
        let speed = self.left_speed.max(self.right_speed);
        self.left_speed = speed;
        self.right_speed = speed;
        self.move_relative()
    }

    /// Writes speed-space values to the actuators, bypassing the intents and
    /// their validation. Used to replay recorded states.
    pub fn set_speeds(&mut self, left: i32, right: i32) -> Result<(), A::Error> {
        self.left_actual = self.calibration.to_native(left);
        self.right_actual = self.calibration.to_native(right);
        self.move_tracks(left, right)
    }

    /// Counts as a move for the movement timeout without touching the
    /// actuators or the history.
    pub fn keep_alive(&mut self) {
        self.last_move_tick = self.ticks.now();
    }

    /// Returns `true` if the last move commanded a non-neutral speed on either side.
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Left intent speed.
    pub fn left_speed(&self) -> i32 {
        self.left_speed
    }

    /// Right intent speed.
    pub fn right_speed(&self) -> i32 {
        self.right_speed
    }

    /// Last native value written to the left actuator.
    pub fn left_actual(&self) -> u16 {
        self.left_actual
    }

    /// Last native value written to the right actuator.
    pub fn right_actual(&self) -> u16 {
        self.right_actual
    }

    /// Current acceleration step.
    pub fn delta(&self) -> i32 {
        self.delta
    }

    /// Tick of the last move, [`UNSET`] before the first one.
    pub fn last_move_tick(&self) -> Tick {
        self.last_move_tick
    }

    /// Speed constants in use.
    pub fn calibration(&self) -> &SpeedCalibration {
        &self.calibration
    }

    /// Recorded course.
    pub fn history(&self) -> &StateHistory<T> {
        &self.history
    }

    /// Mutable access for the backtrack driver.
    pub fn history_mut(&mut self) -> &mut StateHistory<T> {
        &mut self.history
    }

    /// Enables or disables appending moves to the history.
    ///
    /// Recording is switched off while a recorded course is replayed so the
    /// replay does not evict the entries it still has to visit. Switching it
    /// back on restarts the history clock, so the paused time is not credited
    /// to the newest entry.
    pub fn set_recording(&mut self, recording: bool) {
        if recording && !self.recording {
            self.history.restart_clock();
        }
        self.recording = recording;
    }

    /// Whether moves are currently appended to the history.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Left and right actuators.
    pub fn actuators(&self) -> (&A, &A) {
        (&self.left, &self.right)
    }

    /// The tick source shared with the history.
    pub fn ticks(&self) -> &T {
        &self.ticks
    }

    fn move_tracks(&mut self, left_cmd: i32, right_cmd: i32) -> Result<(), A::Error> {
        self.left
            .set_output(self.left_actual, self.calibration.rotation(left_cmd))?;
        self.right
            .set_output(self.right_actual, self.calibration.rotation(right_cmd))?;

        let neutral = self.calibration.neutral;
        self.moving = left_cmd != neutral || right_cmd != neutral;
        let size = if self.recording {
            self.history.add_state(State::new(0, 0, left_cmd, right_cmd))
        } else {
            self.history.len()
        };
        self.last_move_tick = self.ticks.now();

        tracing::debug!(
            left = left_cmd,
            right = right_cmd,
            left_out = self.left_actual,
            right_out = self.right_actual,
            history = size,
            "tracks moved"
        );
        Ok(())
    }
}
