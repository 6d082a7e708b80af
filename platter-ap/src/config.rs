//! Player configuration
//!
//! Values are layered, highest priority first: command-line arguments (which
//! also carry their environment variables through clap), the TOML config
//! file, then built-in defaults.

use crate::audio::SessionConfig;
use crate::control::{SpeedParams, DEFAULT_FACTOR, DEFAULT_REFLEX};
use crate::control::runner::DEFAULT_POLL_INTERVAL;
use crate::error::{Error, Result};
use crate::input::DEFAULT_INPUT_DEVICE;
use platter_common::config::{find_config_file, load_toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Directory name under the user and system config directories
pub const APP_NAME: &str = "platter";

/// On-disk configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub speed: SpeedConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[input]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Pulse device path (default: /dev/ttyS0)
    #[serde(default = "default_input_device")]
    pub device: PathBuf,

    /// Longest wait for a pulse per loop iteration (default: 1 ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// `[speed]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedConfig {
    /// Speed delta scale (default: 30.0)
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// Speed units recovered per idle millisecond (default: 0.001)
    #[serde(default = "default_reflex")]
    pub reflex: f64,

    /// Single-character pulse meaning "speed up" (default: "2")
    #[serde(default = "default_speed_up_byte")]
    pub speed_up_byte: String,
}

/// `[audio]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output device name; the default device when absent
    #[serde(default)]
    pub device: Option<String>,

    /// Source gain (default: 1.0)
    #[serde(default = "default_gain")]
    pub gain: f32,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_input_device() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT_DEVICE)
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_factor() -> f64 {
    DEFAULT_FACTOR
}

fn default_reflex() -> f64 {
    DEFAULT_REFLEX
}

fn default_speed_up_byte() -> String {
    "2".to_string()
}

fn default_gain() -> f32 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            device: default_input_device(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        SpeedConfig {
            factor: default_factor(),
            reflex: default_reflex(),
            speed_up_byte: default_speed_up_byte(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            device: None,
            gain: default_gain(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    /// Parse config file contents.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(load_toml(path)?)
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub input_device: Option<PathBuf>,
    pub factor: Option<f64>,
    pub reflex: Option<f64>,
    pub poll_interval_ms: Option<u64>,
    pub audio_device: Option<String>,
}

/// Validated, fully resolved player settings
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub input_device: PathBuf,
    pub poll_interval: Duration,
    pub speed: SpeedParams,
    pub audio_device: Option<String>,
    pub gain: f32,
    pub log_level: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            input_device: default_input_device(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            speed: SpeedParams::default(),
            audio_device: None,
            gain: default_gain(),
            log_level: default_log_level(),
        }
    }
}

impl PlayerConfig {
    /// Load the config file, if any, on top of the defaults.
    ///
    /// # Errors
    /// - `explicit` names a file that does not exist
    /// - The file cannot be read or parsed
    /// - A value is out of range
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match find_config_file(explicit, APP_NAME)? {
            Some(path) => Self::from_toml(TomlConfig::from_file(&path)?),
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Validate a parsed config file.
    pub fn from_toml(toml: TomlConfig) -> Result<Self> {
        let speed_up_byte = match toml.speed.speed_up_byte.as_bytes() {
            [byte] => *byte,
            _ => {
                return Err(Error::Config(format!(
                    "speed_up_byte must be a single byte, got {:?}",
                    toml.speed.speed_up_byte
                )))
            }
        };

        let config = PlayerConfig {
            input_device: toml.input.device,
            poll_interval: Duration::from_millis(toml.input.poll_interval_ms),
            speed: SpeedParams {
                factor: toml.speed.factor,
                reflex: toml.speed.reflex,
                speed_up_byte,
            },
            audio_device: toml.audio.device,
            gain: toml.audio.gain,
            log_level: toml.logging.level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line and environment values.
    pub fn apply(&mut self, overrides: &Overrides) -> Result<()> {
        if let Some(device) = &overrides.input_device {
            self.input_device = device.clone();
        }
        if let Some(factor) = overrides.factor {
            self.speed.factor = factor;
        }
        if let Some(reflex) = overrides.reflex {
            self.speed.reflex = reflex;
        }
        if let Some(ms) = overrides.poll_interval_ms {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(name) = &overrides.audio_device {
            self.audio_device = Some(name.clone());
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.speed.factor.is_finite() && self.speed.factor > 0.0) {
            return Err(Error::Config(format!(
                "factor must be positive, got {}",
                self.speed.factor
            )));
        }
        if !(self.speed.reflex.is_finite() && self.speed.reflex >= 0.0) {
            return Err(Error::Config(format!(
                "reflex must not be negative, got {}",
                self.speed.reflex
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.gain) {
            return Err(Error::Config(format!(
                "gain must be within 0.0 - 1.0, got {}",
                self.gain
            )));
        }
        Ok(())
    }

    /// Output session options
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            device_name: self.audio_device.clone(),
            gain: self.gain,
        }
    }
}
