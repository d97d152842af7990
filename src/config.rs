//! Configuration loading and defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::buffers::NUM_DIMENSIONS;

pub const DEFAULT_CONFIG_FILE: &str = "timbre-space.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} not found", .path.display())]
    Missing { path: PathBuf },
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub keyboard: KeyboardConfig,

    #[serde(default = "default_presets")]
    pub presets: Vec<Preset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub width: i32,

    #[serde(default = "default_height")]
    pub height: i32,

    #[serde(default = "default_title")]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Start the output stream. The panel still runs without it.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between engine-to-panel updates
    #[serde(default = "default_gui_period")]
    pub gui_period_s: f32,

    /// Smoothed touch size needed before a pad moves the sound (0.0 - 1.0)
    #[serde(default = "default_touch_threshold")]
    pub touch_threshold: f32,

    #[serde(default = "default_smoothing_cutoff")]
    pub smoothing_cutoff_hz: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyboardConfig {
    /// MIDI note played by the Z key
    #[serde(default = "default_base_note")]
    pub base_note: u8,

    #[serde(default = "default_velocity")]
    pub velocity: u8,
}

/// Named position in timbre space. Values are validated to 0-255.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub spectrum: u16,
    pub brightness: u16,
    pub articulation: u16,
    pub envelope: u16,
}

impl Preset {
    fn new(name: &str, spectrum: u16, brightness: u16, articulation: u16, envelope: u16) -> Self {
        Self {
            name: name.to_string(),
            spectrum,
            brightness,
            articulation,
            envelope,
        }
    }

    fn raw(&self) -> [u16; NUM_DIMENSIONS] {
        [self.spectrum, self.brightness, self.articulation, self.envelope]
    }

    /// Dimension values in `Dimension::ALL` order, saturated to 255.
    pub fn values(&self) -> [u8; NUM_DIMENSIONS] {
        self.raw().map(|v| v.min(u8::MAX as u16) as u8)
    }
}

fn default_width() -> i32 {
    1280
}
fn default_height() -> i32 {
    800
}
fn default_title() -> String {
    "Timbre Space".to_string()
}
fn default_true() -> bool {
    true
}
fn default_gui_period() -> f32 {
    0.015
}
fn default_touch_threshold() -> f32 {
    0.1
}
fn default_smoothing_cutoff() -> f32 {
    1.0
}
fn default_base_note() -> u8 {
    60
}
fn default_velocity() -> u8 {
    100
}
fn default_presets() -> Vec<Preset> {
    vec![
        Preset::new("Sine Bell", 0, 127, 127, 40),
        Preset::new("Xylophone", 12, 180, 100, 20),
        Preset::new("Marimba", 25, 110, 110, 30),
        Preset::new("Timpani", 35, 90, 80, 60),
        Preset::new("Clarinet", 75, 120, 150, 140),
        Preset::new("Brass", 150, 200, 60, 170),
        Preset::new("Strings", 230, 140, 200, 220),
    ]
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gui_period_s: default_gui_period(),
            touch_threshold: default_touch_threshold(),
            smoothing_cutoff_hz: default_smoothing_cutoff(),
        }
    }
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            base_note: default_base_note(),
            velocity: default_velocity(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            audio: AudioConfig::default(),
            keyboard: KeyboardConfig::default(),
            presets: default_presets(),
        }
    }
}

impl Config {
    /// Loads `path`, or `./timbre-space.toml` when no path is given.
    ///
    /// An explicit path must exist. Without one, a missing file gives the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::Missing {
                    path: path.to_path_buf(),
                });
            }
            Some(path) => Self::read(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::read(path)?
                } else {
                    Config::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.audio.gui_period_s > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "audio.gui_period_s must be positive, got {}",
                self.audio.gui_period_s
            )));
        }
        let threshold = self.audio.touch_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "audio.touch_threshold must be between 0 and 1, got {threshold}"
            )));
        }
        if !(self.audio.smoothing_cutoff_hz > 0.0) {
            return Err(ConfigError::Invalid(
                "audio.smoothing_cutoff_hz must be positive".to_string(),
            ));
        }
        if self.window.width <= 0 || self.window.height <= 0 {
            return Err(ConfigError::Invalid("window size must be positive".to_string()));
        }
        if self.keyboard.base_note > 127 || self.keyboard.velocity > 127 {
            return Err(ConfigError::Invalid(
                "keyboard.base_note and keyboard.velocity must be MIDI values (0-127)".to_string(),
            ));
        }
        for preset in &self.presets {
            if preset.name.trim().is_empty() {
                return Err(ConfigError::Invalid("preset names must not be empty".to_string()));
            }
            if let Some(value) = preset.raw().into_iter().find(|v| *v > u8::MAX as u16) {
                return Err(ConfigError::Invalid(format!(
                    "preset '{}' has value {value}, dimensions go up to 255",
                    preset.name
                )));
            }
        }
        Ok(())
    }
}
