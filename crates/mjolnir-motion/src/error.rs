//! Error types for the motion library.

/// Errors raised while configuring the motion core.
///
/// Runtime motion commands never fail on speed values (they are clamped), so
/// these only surface when a calibration is rejected at construction time.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionError {
    /// The speed space is not symmetric around neutral, so a recorded course
    /// cannot be reversed.
    AsymmetricSpeedSpace(&'static str),
    /// The calibration bounds are out of order.
    InvalidSpeedRange(&'static str),
}

impl core::fmt::Display for MotionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MotionError::AsymmetricSpeedSpace(msg) => {
                write!(f, "Asymmetric speed space: {}", msg)
            }
            MotionError::InvalidSpeedRange(msg) => write!(f, "Invalid speed range: {}", msg),
        }
    }
}

impl core::error::Error for MotionError {}
