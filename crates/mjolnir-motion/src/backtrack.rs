//! Reverse replay of a recorded course.
//!
//! [`Backtrack`] walks a motor's history from newest to oldest. Each recorded
//! state is turned into its opposite and written through
//! [`Motor::set_speeds`] for as long as the state was originally in effect,
//! so the robot retraces its route. Stopped states and states that never ran
//! are skipped.
//!
//! The driver is polled rather than blocking: the control loop calls
//! [`Backtrack::poll`] once per iteration and stays responsive to commands.

use crate::clock::{elapsed, Tick, TickSource};
use crate::history::BacktrackCursor;
use crate::motor::{ActuatorSide, Motor};

/// Outcome of one [`Backtrack::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacktrackStatus {
    /// A recorded step is being replayed.
    Replaying,
    /// Every step has been replayed; the motor is stopped and the history cleared.
    Depleted,
}

/// In-progress reverse replay.
#[derive(Debug, Clone)]
pub struct Backtrack {
    cursor: BacktrackCursor,
    step_started: Tick,
    step_duration: Tick,
    steps: usize,
}

impl Backtrack {
    /// Stops the motor and prepares to replay everything recorded before the stop.
    ///
    /// The stop itself is recorded, which closes the duration of the newest
    /// move. Recording is then paused until the replay is depleted or
    /// interrupted.
    ///
    /// # Errors
    ///
    /// Propagates the actuator error if stopping fails. Recording is left on.
    pub fn start<A, T>(motor: &mut Motor<A, T>) -> Result<Self, A::Error>
    where
        A: ActuatorSide,
        T: TickSource,
    {
        let cursor = motor.history().backtrack_cursor();
        let recorded = motor.history().len();
        motor.stop_movement()?;
        motor.set_recording(false);
        tracing::info!(states = recorded, "backtrack started");
        Ok(Backtrack {
            cursor,
            step_started: motor.ticks().now(),
            step_duration: 0,
            steps: 0,
        })
    }

    /// Advances the replay.
    ///
    /// While the current step's duration has not elapsed this does nothing.
    /// Otherwise the next older non-neutral state is reversed and written to
    /// the motor. Once the history is exhausted the motor is stopped, the
    /// history is cleared and recording resumes.
    pub fn poll<A, T>(&mut self, motor: &mut Motor<A, T>) -> Result<BacktrackStatus, A::Error>
    where
        A: ActuatorSide,
        T: TickSource,
    {
        let now = motor.ticks().now();
        if elapsed(self.step_started, now) < self.step_duration {
            return Ok(BacktrackStatus::Replaying);
        }

        let neutral = motor.calibration().neutral;
        while let Some(state) = motor.history().next_back(&mut self.cursor) {
            let stopped = state.left_speed() == neutral && state.right_speed() == neutral;
            if stopped || state.duration() == 0 {
                continue;
            }
            let opposite = state.reversed(motor.calibration());
            motor.set_speeds(opposite.left_speed(), opposite.right_speed())?;
            self.step_started = now;
            self.step_duration = state.duration();
            self.steps += 1;
            tracing::debug!(step = self.steps, %opposite, "replaying reversed state");
            return Ok(BacktrackStatus::Replaying);
        }

        motor.stop_movement()?;
        motor.history_mut().clear();
        motor.set_recording(true);
        tracing::info!(steps = self.steps, "backtrack depleted");
        Ok(BacktrackStatus::Depleted)
    }

    /// Abandons the replay so a live command can take over.
    ///
    /// States newer than the one being replayed are discarded and the one
    /// being replayed keeps only the part not yet replayed, so a later
    /// backtrack resumes from here. Recording resumes.
    ///
    /// # Returns
    ///
    /// The number of states left in the history.
    pub fn interrupt<A, T>(self, motor: &mut Motor<A, T>) -> usize
    where
        A: ActuatorSide,
        T: TickSource,
    {
        let remaining = motor.history_mut().truncate_to_cursor(&self.cursor);
        if self.steps > 0 && remaining > 0 {
            let done = elapsed(self.step_started, motor.ticks().now());
            let left = self.step_duration.saturating_sub(done);
            if let Some(state) = motor.history_mut().last_mut() {
                state.set_duration(left);
            }
        }
        motor.set_recording(true);
        tracing::info!(remaining, steps = self.steps, "backtrack interrupted");
        remaining
    }

    /// Number of states replayed so far.
    pub fn steps(&self) -> usize {
        self.steps
    }
}
