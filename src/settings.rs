use std::net::SocketAddr;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use mjolnir_motion::{MotionError, SpeedCalibration};
use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "MJOLNIR";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("Invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Unusable calibration: {0}")]
    Calibration(#[from] MotionError),
}

/// Which output stage drives the tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorKind {
    Servo,
    Dc,
}

impl ActuatorKind {
    pub fn calibration(self) -> SpeedCalibration {
        match self {
            ActuatorKind::Servo => SpeedCalibration::VEX_SERVO,
            ActuatorKind::Dc => SpeedCalibration::ADAFRUIT_DC,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Tcp,
    Stdio,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotorSettings {
    pub actuator: ActuatorKind,
    pub history_capacity: usize,
    pub step: Option<i32>,
}

impl Default for MotorSettings {
    fn default() -> Self {
        MotorSettings {
            actuator: ActuatorKind::Servo,
            history_capacity: 500,
            step: None,
        }
    }
}

impl MotorSettings {
    pub fn calibration(&self) -> Result<SpeedCalibration, SettingsError> {
        let calibration = self.actuator.calibration();
        calibration.validate()?;
        Ok(calibration)
    }

    /// Step used by the accelerate and turn commands.
    pub fn step(&self) -> i32 {
        self.step.unwrap_or(self.actuator.calibration().delta)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    pub loop_period_us: u64,
    pub movement_timeout_ms: u64,
    pub backtrack_on_disconnect: bool,
    pub backtrack_idle_ms: u64,
    pub monitor_period_ms: u64,
}

impl Default for ControlSettings {
    fn default() -> Self {
        ControlSettings {
            loop_period_us: 1_000,
            movement_timeout_ms: 1_000,
            backtrack_on_disconnect: true,
            backtrack_idle_ms: 0,
            monitor_period_ms: 1_000,
        }
    }
}

impl ControlSettings {
    pub fn loop_period(&self) -> Duration {
        Duration::from_micros(self.loop_period_us)
    }

    pub fn monitor_period(&self) -> Duration {
        Duration::from_millis(self.monitor_period_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub kind: TransportKind,
    pub bind: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        TransportSettings {
            kind: TransportKind::Tcp,
            bind: "0.0.0.0:23".to_string(),
        }
    }
}

impl TransportSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.bind.parse().map_err(|e| SettingsError::Invalid {
            key: "transport.bind",
            reason: format!("{e}"),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub enabled: bool,
    pub rows: usize,
    pub columns: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            enabled: true,
            rows: 4,
            columns: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub motor: MotorSettings,
    pub control: ControlSettings,
    pub transport: TransportSettings,
    pub display: DisplaySettings,
}

impl Settings {
    /// Loads `config/default.toml` with `MJOLNIR__SECTION__KEY` environment overrides.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: &str) -> Result<Self, SettingsError> {
        info!("Attempting to load configuration from {}", path);

        let builder = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        match Self::build(builder) {
            Ok(settings) => {
                info!(?settings, "Successfully loaded configuration");
                Ok(settings)
            }
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                Err(e)
            }
        }
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.motor.calibration()?;
        if self.motor.step() <= 0 {
            return Err(SettingsError::Invalid {
                key: "motor.step",
                reason: "must be positive".to_string(),
            });
        }
        if self.control.loop_period_us == 0 {
            return Err(SettingsError::Invalid {
                key: "control.loop_period_us",
                reason: "must be positive".to_string(),
            });
        }
        if self.control.movement_timeout_ms == 0 {
            return Err(SettingsError::Invalid {
                key: "control.movement_timeout_ms",
                reason: "must be positive".to_string(),
            });
        }
        if self.control.monitor_period_ms == 0 {
            return Err(SettingsError::Invalid {
                key: "control.monitor_period_ms",
                reason: "must be positive".to_string(),
            });
        }
        if self.display.enabled && (self.display.rows == 0 || self.display.columns == 0) {
            return Err(SettingsError::Invalid {
                key: "display",
                reason: "rows and columns must be positive".to_string(),
            });
        }
        if self.transport.kind == TransportKind::Tcp {
            self.transport.bind_addr()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Result<Settings, SettingsError> {
        Settings::build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn test_default_file_loads() {
        let settings = Settings::load_from(DEFAULT_CONFIG_PATH).unwrap();
        assert_eq!(settings.display.rows, 4);
        assert_eq!(settings.display.columns, 20);
        assert_eq!(settings.control.movement_timeout_ms, 1_000);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let settings = from_toml("[motor]\nactuator = \"dc\"\n").unwrap();
        assert_eq!(settings.motor.actuator, ActuatorKind::Dc);
        assert_eq!(settings.motor.step(), 50);
        assert_eq!(settings.motor.history_capacity, 500);
        assert_eq!(settings.transport.kind, TransportKind::Tcp);
        assert!(settings.control.backtrack_on_disconnect);
    }

    #[test]
    fn test_step_override() {
        let settings = from_toml("[motor]\nstep = 25\n").unwrap();
        assert_eq!(settings.motor.step(), 25);
    }

    #[test]
    fn test_rejects_unknown_actuator() {
        let result = from_toml("[motor]\nactuator = \"stepper\"\n");
        assert!(matches!(result, Err(SettingsError::Load(_))));
    }

    #[test]
    fn test_rejects_bad_bind_address() {
        let result = from_toml("[transport]\nbind = \"not an address\"\n");
        assert!(matches!(
            result,
            Err(SettingsError::Invalid { key: "transport.bind", .. })
        ));
    }

    #[test]
    fn test_stdio_skips_bind_check() {
        let settings = from_toml("[transport]\nkind = \"stdio\"\nbind = \"\"\n").unwrap();
        assert_eq!(settings.transport.kind, TransportKind::Stdio);
    }

    #[test]
    fn test_rejects_zero_display_size() {
        let result = from_toml("[display]\nrows = 0\n");
        assert!(matches!(result, Err(SettingsError::Invalid { key: "display", .. })));
        assert!(from_toml("[display]\nenabled = false\nrows = 0\n").is_ok());
    }

    #[test]
    fn test_rejects_non_positive_step() {
        let result = from_toml("[motor]\nstep = 0\n");
        assert!(matches!(result, Err(SettingsError::Invalid { key: "motor.step", .. })));
    }
}
