use crate::kinematics::MoveCommand;
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found at {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read configuration file: {source}")]
    ReadError { source: std::io::Error },

    #[error("Failed to parse configuration: {source}")]
    ParseError { source: toml::de::Error },

    #[error("Failed to serialize configuration: {source}")]
    SerializeError { source: toml::ser::Error },

    #[error("Failed to write configuration file: {source}")]
    WriteError { source: std::io::Error },

    #[error("Configuration validation failed: {message}")]
    ValidationError { message: String },
}

/// Fixed physical parameters of one elevator axis.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PositionerConfig {
    /// Serial device of the motor controller.
    pub port: String,
    /// Controller board axis, set when the firmware is flashed.
    pub axis_id: u8,
    /// Diameter of the gear moving the belt, in meters.
    pub diameter: f64,
    /// Platform position in meters that corresponds to zero rotation at power-on.
    pub tar_start_pos: f64,
}

impl Default for PositionerConfig {
    fn default() -> Self {
        Self {
            port: String::from("/dev/ttyUSB0"),
            axis_id: 1,
            diameter: 0.0324,
            tar_start_pos: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub identify_attempts: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            timeout_ms: 5000,
            max_retries: 1,
            identify_attempts: 10,
        }
    }
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Meters per second.
    pub default_speed: f64,
    pub position_tolerance_deg: f64,
    pub poll_margin_ms: u64,
    pub resend_after_polls: u32,
    pub give_up_after_polls: u32,

    pub home_on_start: bool,
    /// Meters per second.
    pub homing_speed: f64,
    pub homing_poll_interval_ms: u64,
    pub homing_timeout_s: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            default_speed: 0.01,
            position_tolerance_deg: 1.0,
            poll_margin_ms: 50,
            resend_after_polls: 20,
            give_up_after_polls: 100,

            home_on_start: false,
            homing_speed: 0.01,
            homing_poll_interval_ms: 100,
            homing_timeout_s: 120,
        }
    }
}

impl MotionConfig {
    pub fn poll_margin(&self) -> Duration {
        Duration::from_millis(self.poll_margin_ms)
    }

    pub fn homing_poll_interval(&self) -> Duration {
        Duration::from_millis(self.homing_poll_interval_ms)
    }

    pub fn homing_timeout(&self) -> Duration {
        Duration::from_secs(self.homing_timeout_s)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is not set.
    pub level: String,
    pub json: bool,
    /// Daily rotated log files are written here when set.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            json: false,
            directory: None,
            file_prefix: String::from("elevator.log"),
        }
    }
}

/// One step of the move program. Without a speed the move runs at
/// `motion.default_speed`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ProgramMove {
    /// Meters.
    pub target_position: f64,
    /// Meters per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub positioner: PositionerConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Moves run one after another once the positioner is up.
    #[serde(default)]
    pub moves: Vec<ProgramMove>,
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: format!("{} must be a positive number, got {}", name, value),
        })
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("positioner.diameter", self.positioner.diameter)?;
        if !self.positioner.tar_start_pos.is_finite() {
            return Err(ConfigError::ValidationError {
                message: "positioner.tar_start_pos must be finite".to_string(),
            });
        }
        if self.positioner.port.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "positioner.port must not be empty".to_string(),
            });
        }

        if self.serial.baud_rate == 0 || self.serial.identify_attempts == 0 {
            return Err(ConfigError::ValidationError {
                message: "serial.baud_rate and serial.identify_attempts must be non-zero"
                    .to_string(),
            });
        }

        positive("motion.default_speed", self.motion.default_speed)?;
        positive("motion.homing_speed", self.motion.homing_speed)?;
        positive(
            "motion.position_tolerance_deg",
            self.motion.position_tolerance_deg,
        )?;

        for (i, step) in self.moves.iter().enumerate() {
            if !step.target_position.is_finite() {
                return Err(ConfigError::ValidationError {
                    message: format!("moves[{}].target_position must be finite", i),
                });
            }
            if let Some(speed) = step.speed {
                positive(&format!("moves[{}].speed", i), speed)?;
            }
        }

        Ok(())
    }

    /// The move program with every missing speed filled in.
    pub fn move_program(&self) -> Vec<MoveCommand> {
        self.moves
            .iter()
            .map(|step| MoveCommand {
                target_position: step.target_position,
                speed: step.speed.unwrap_or(self.motion.default_speed),
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct ConfigOptions {
    pub config_path: PathBuf,
    pub create_if_missing: bool,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            create_if_missing: true,
        }
    }
}

impl ConfigOptions {
    pub fn default_config_path() -> PathBuf {
        std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("default_config.toml"))
    }

    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct ConfigManager {
    options: ConfigOptions,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            options: ConfigOptions::default(),
        }
    }

    pub fn with_options(options: ConfigOptions) -> Self {
        Self { options }
    }

    pub fn load(&self) -> anyhow::Result<Config> {
        let config_path = &self.options.config_path;

        if !config_path.exists() {
            if self.options.create_if_missing {
                let default_config = Config::default();
                self.save(&default_config)
                    .context("Failed to save default config")?;
                return Ok(default_config);
            } else {
                return Err(ConfigError::FileNotFound {
                    path: config_path.clone(),
                }
                .into());
            }
        }

        let content =
            fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError { source: e })?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError { source: e })?;

        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, config: &Config) -> anyhow::Result<()> {
        let config_path = &self.options.config_path;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError { source: e })?;
        }

        let content = toml::to_string_pretty(config)
            .map_err(|e| ConfigError::SerializeError { source: e })?;

        fs::write(config_path, content).map_err(|e| ConfigError::WriteError { source: e })?;

        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

pub fn init_config() -> anyhow::Result<(ConfigManager, Config)> {
    let manager = ConfigManager::new();
    let config = manager.load()?;
    Ok((manager, config))
}

pub fn create_default_config<P: AsRef<Path>>(path: Option<P>) -> anyhow::Result<()> {
    let config_path = path
        .map(|p| p.as_ref().to_path_buf())
        .unwrap_or_else(ConfigOptions::default_config_path);

    let manager = ConfigManager::with_options(ConfigOptions {
        config_path,
        create_if_missing: true,
    });
    manager.save(&Config::default())?;

    Ok(())
}
