use mjolnir_motion::{ActuatorSide, Rotation, Side};
use tracing::trace;

use crate::settings::ActuatorKind;

/// Highest magnitude an 8-bit motor shield channel accepts.
pub const DC_MAX: u16 = 255;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActuatorError {
    #[error("{side} track output {value} exceeds {max}")]
    OutOfRange { side: Side, value: u16, max: u16 },
}

/// Simulated servo channel: keeps the last pulse width.
#[derive(Debug, Clone)]
pub struct ServoTrack {
    side: Side,
    pulse_us: u16,
}

impl ServoTrack {
    pub fn new(side: Side) -> Self {
        ServoTrack { side, pulse_us: 0 }
    }

    pub fn pulse_us(&self) -> u16 {
        self.pulse_us
    }
}

impl ActuatorSide for ServoTrack {
    type Error = ActuatorError;

    fn set_output(&mut self, value: u16, _rotation: Rotation) -> Result<(), Self::Error> {
        self.pulse_us = value;
        trace!(side = %self.side, pulse_us = value, "servo pulse");
        Ok(())
    }
}

/// Simulated DC motor shield channel: magnitude plus run direction.
#[derive(Debug, Clone)]
pub struct DcTrack {
    side: Side,
    magnitude: u8,
    rotation: Rotation,
}

impl DcTrack {
    pub fn new(side: Side) -> Self {
        DcTrack {
            side,
            magnitude: 0,
            rotation: Rotation::Forward,
        }
    }

    pub fn magnitude(&self) -> u8 {
        self.magnitude
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }
}

impl ActuatorSide for DcTrack {
    type Error = ActuatorError;

    fn set_output(&mut self, value: u16, rotation: Rotation) -> Result<(), Self::Error> {
        let magnitude = u8::try_from(value).map_err(|_| ActuatorError::OutOfRange {
            side: self.side,
            value,
            max: DC_MAX,
        })?;
        self.magnitude = magnitude;
        self.rotation = rotation;
        trace!(side = %self.side, magnitude, ?rotation, "dc output");
        Ok(())
    }
}

/// Track output selected at startup.
#[derive(Debug, Clone)]
pub enum Track {
    Servo(ServoTrack),
    Dc(DcTrack),
}

impl Track {
    pub fn new(kind: ActuatorKind, side: Side) -> Self {
        match kind {
            ActuatorKind::Servo => Track::Servo(ServoTrack::new(side)),
            ActuatorKind::Dc => Track::Dc(DcTrack::new(side)),
        }
    }

    /// Value and direction the driver currently holds.
    pub fn output(&self) -> (u16, Rotation) {
        match self {
            Track::Servo(servo) => (servo.pulse_us(), Rotation::Forward),
            Track::Dc(dc) => (u16::from(dc.magnitude()), dc.rotation()),
        }
    }
}

impl ActuatorSide for Track {
    type Error = ActuatorError;

    fn set_output(&mut self, value: u16, rotation: Rotation) -> Result<(), Self::Error> {
        match self {
            Track::Servo(servo) => servo.set_output(value, rotation),
            Track::Dc(dc) => dc.set_output(value, rotation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_servo_ignores_rotation() {
        let mut track = Track::new(ActuatorKind::Servo, Side::Left);
        track.set_output(1450, Rotation::Backward).unwrap();
        assert_eq!(track.output(), (1450, Rotation::Forward));
    }

    #[test]
    fn test_servo_accepts_brake_pulse() {
        let mut servo = ServoTrack::new(Side::Right);
        servo.set_output(200, Rotation::Forward).unwrap();
        assert_eq!(servo.pulse_us(), 200);
    }

    #[test]
    fn test_dc_keeps_direction() {
        let mut track = Track::new(ActuatorKind::Dc, Side::Right);
        track.set_output(128, Rotation::Backward).unwrap();
        let Track::Dc(dc) = track else {
            panic!("expected a dc track");
        };
        assert_eq!(dc.magnitude(), 128);
        assert_eq!(dc.rotation(), Rotation::Backward);
    }

    #[test]
    fn test_dc_keeps_last_output_after_failure() {
        let mut track = Track::new(ActuatorKind::Dc, Side::Left);
        track.set_output(90, Rotation::Forward).unwrap();
        assert!(track.set_output(256, Rotation::Backward).is_err());
        assert_eq!(track.output(), (90, Rotation::Forward));
    }

    #[test]
    fn test_dc_rejects_out_of_range() {
        let mut dc = DcTrack::new(Side::Left);
        dc.set_output(40, Rotation::Forward).unwrap();
        let err = dc.set_output(300, Rotation::Forward).unwrap_err();
        assert_eq!(
            err,
            ActuatorError::OutOfRange {
                side: Side::Left,
                value: 300,
                max: DC_MAX
            }
        );
        assert_eq!(err.to_string(), "left track output 300 exceeds 255");
        assert_eq!(dc.magnitude(), 40);
    }
}
