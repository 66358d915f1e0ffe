use std::time::Duration;

use mjolnir_motion::clock::{Tick, TICKS_PER_MS, elapsed};
use mjolnir_motion::{Backtrack, BacktrackStatus, Motor, Side, StateHistory, TickSource};
use spin_sleep::SpinSleeper;
use tracing::{debug, error, info, warn};

use crate::actuator::{ActuatorError, Track};
use crate::blackboard::{Blackboard, Mode, raise_fault, touch_cmd};
use crate::command::{Command, HELP, Input};
use crate::display::StatusDisplay;
use crate::settings::{Settings, SettingsError};
use crate::transport::Transport;

/// Control-loop context. Sole owner of the motor and, through it, the history.
pub struct Robot<T: Transport, D: StatusDisplay, S: TickSource> {
    motor: Motor<Track, S>,
    transport: T,
    display: D,
    bb: Blackboard,
    ticks: S,
    backtrack: Option<Backtrack>,
    step: i32,
    movement_timeout: Tick,
    backtrack_idle: Option<Tick>,
    backtrack_on_disconnect: bool,
    connected: bool,
    last_command_tick: Tick,
}

fn ms_to_ticks(ms: u64) -> Tick {
    Tick::try_from(ms.saturating_mul(u64::from(TICKS_PER_MS))).unwrap_or(Tick::MAX)
}

impl<T: Transport, D: StatusDisplay, S: TickSource> Robot<T, D, S> {
    pub fn new(
        settings: &Settings,
        transport: T,
        display: D,
        bb: Blackboard,
        ticks: S,
    ) -> Result<Self, SettingsError> {
        let calibration = settings.motor.calibration()?;
        let kind = settings.motor.actuator;
        let history = StateHistory::new(settings.motor.history_capacity, ticks.clone());
        let motor = Motor::new(
            Track::new(kind, Side::Left),
            Track::new(kind, Side::Right),
            calibration,
            history,
            ticks.clone(),
        )?;
        let idle_ms = settings.control.backtrack_idle_ms;

        info!(
            actuator = ?kind,
            history = settings.motor.history_capacity,
            step = settings.motor.step(),
            "Motor initialized"
        );

        Ok(Robot {
            motor,
            transport,
            display,
            bb,
            last_command_tick: ticks.now(),
            ticks,
            backtrack: None,
            step: settings.motor.step(),
            movement_timeout: ms_to_ticks(settings.control.movement_timeout_ms),
            backtrack_idle: (idle_ms > 0).then(|| ms_to_ticks(idle_ms)),
            backtrack_on_disconnect: settings.control.backtrack_on_disconnect,
            connected: false,
        })
    }

    /// Runs forever on the calling thread.
    pub fn run(mut self, period: Duration) {
        info!("Control thread started.");
        let sleeper = SpinSleeper::new(100_000);
        loop {
            self.step();
            sleeper.sleep(period);
        }
    }

    /// One loop iteration: at most one command, otherwise timeouts and replay.
    pub fn step(&mut self) {
        self.track_connection();

        let input = if self.transport.has_data() {
            self.transport.read_char()
        } else {
            None
        };
        match input {
            Some(c) => self.handle_char(c),
            None => self.idle(),
        }

        self.publish_status();
    }

    pub fn is_backtracking(&self) -> bool {
        self.backtrack.is_some()
    }

    fn track_connection(&mut self) {
        let connected = self.transport.is_connected();
        if connected == self.connected {
            return;
        }
        self.connected = connected;

        if connected {
            info!("Client connected");
            self.display.clear();
            self.display.print_line("Client connected");
            self.send_help();
            self.last_command_tick = self.ticks.now();
        } else {
            info!("Connection terminated");
            self.display.print_line("Disconnected");
            if self.backtrack_on_disconnect {
                self.start_backtrack();
            } else {
                let result = self.motor.stop_movement();
                self.check(result);
            }
        }
    }

    fn handle_char(&mut self, c: char) {
        match Command::parse(c) {
            Input::Ignored => {}
            Input::Unrecognized(c) => {
                debug!(%c, "Unrecognized command");
                self.transport.write_line(&format!("Unrecognized command: {c}"));
            }
            Input::Command(command) => {
                debug!(?command, "Received command");
                if let Some(backtrack) = self.backtrack.take() {
                    backtrack.interrupt(&mut self.motor);
                    self.display.print_line("Backtrack stopped");
                }
                if let Some(ack) = command.ack() {
                    self.transport.write_line(ack);
                    self.display.print_line(ack);
                }
                let result = self.execute(command);
                self.check(result);
                self.last_command_tick = self.ticks.now();
                touch_cmd(&self.bb);
            }
        }
    }

    fn execute(&mut self, command: Command) -> Result<(), ActuatorError> {
        let step = self.step;
        match command {
            Command::AccelerateForward => self.motor.accelerate_forward(step),
            Command::FullForward => self.motor.move_forward_full_speed(),
            Command::AccelerateReverse => self.motor.accelerate_reverse(step),
            Command::FullReverse => self.motor.move_reverse_full_speed(),
            Command::TurnLeft => self.motor.turn_left(step),
            Command::FullLeft => self.motor.turn_left_full_speed(),
            Command::TurnRight => self.motor.turn_right(step),
            Command::FullRight => self.motor.turn_right_full_speed(),
            Command::Stop => self.motor.stop_movement(),
            Command::Brake => self.motor.brake(),
            Command::SteerCenter => self.motor.steer_center(),
            Command::Maintain => {
                self.motor.keep_alive();
                Ok(())
            }
            Command::Help => {
                self.send_help();
                Ok(())
            }
        }
    }

    fn idle(&mut self) {
        let now = self.ticks.now();

        if let Some(backtrack) = self.backtrack.as_mut() {
            match backtrack.poll(&mut self.motor) {
                Ok(BacktrackStatus::Replaying) => {}
                Ok(BacktrackStatus::Depleted) => {
                    self.backtrack = None;
                    self.display.print_line("Backtrack complete");
                }
                Err(e) => {
                    if let Some(backtrack) = self.backtrack.take() {
                        backtrack.interrupt(&mut self.motor);
                    }
                    self.check(Err(e));
                }
            }
            return;
        }

        if self.motor.is_moving() && elapsed(self.motor.last_move_tick(), now) >= self.movement_timeout {
            warn!("Movement timeout.");
            self.display.print_line("Movement timeout");
            let result = self.motor.stop_movement();
            self.check(result);
            return;
        }

        if let Some(window) = self.backtrack_idle {
            if self.connected
                && !self.motor.history().is_empty()
                && elapsed(self.last_command_tick, now) >= window
            {
                info!("No commands received, backtracking");
                self.start_backtrack();
            }
        }
    }

    fn start_backtrack(&mut self) {
        match Backtrack::start(&mut self.motor) {
            Ok(backtrack) => {
                self.display.print_line("Backtracking");
                self.backtrack = Some(backtrack);
            }
            Err(e) => self.check(Err(e)),
        }
    }

    fn send_help(&mut self) {
        for line in HELP {
            self.transport.write_line(line);
        }
    }

    /// Actuator failures are reported and the loop carries on.
    fn check(&self, result: Result<(), ActuatorError>) {
        if let Err(e) = result {
            error!(%e, "Actuator write failed");
            raise_fault(&self.bb, &e.to_string());
        }
    }

    fn publish_status(&self) {
        let mut status = self.bb.write();
        status.mode = if self.is_backtracking() {
            Mode::Backtracking
        } else {
            Mode::Manual
        };
        status.connected = self.connected;
        status.left_speed = self.motor.left_speed();
        status.right_speed = self.motor.right_speed();
        let (left, right) = self.motor.actuators();
        (status.left_output, status.left_rotation) = left.output();
        (status.right_output, status.right_rotation) = right.output();
        status.moving = self.motor.is_moving();
        status.history_len = self.motor.history().len();
    }
}
