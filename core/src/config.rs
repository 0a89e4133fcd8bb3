//! Engine settings (settings.toml)
//!
//! Handles loading, saving, validating and providing defaults for the
//! options the engine reads at startup. Settings are stored as TOML, by
//! default in the platform-specific config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::AudioDriver;
use crate::error::{EngineError, Result};
use crate::graphics::{DeviceOptions, ExecutionMode, GraphicsDriver, SamplerFilter};
use crate::types::Size2;

/// Settings file name inside the config directory.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Engine settings.
///
/// Every section and field is optional in the file; missing values fall
/// back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Render device settings
    #[serde(default)]
    pub graphics: GraphicsSettings,
    /// Audio device and mixer settings
    #[serde(default)]
    pub audio: AudioSettings,
}

/// Render device settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphicsSettings {
    /// Preferred graphics driver (default: automatic)
    #[serde(default)]
    pub driver: GraphicsDriver,
    /// Back buffer width (default: 1280)
    #[serde(default = "default_width")]
    pub width: u32,
    /// Back buffer height (default: 720)
    #[serde(default = "default_height")]
    pub height: u32,
    /// MSAA sample count, 1 disables multisampling (default: 1)
    #[serde(default = "default_sample_count")]
    pub sample_count: u32,
    /// Default texture filter (default: point)
    #[serde(default)]
    pub texture_filter: SamplerFilter,
    /// Default maximum anisotropy, 1 disables it (default: 1)
    #[serde(default = "default_max_anisotropy")]
    pub max_anisotropy: u32,
    /// Wait for vertical sync on present (default: true)
    #[serde(default = "default_true")]
    pub vsync: bool,
    /// Create a depth buffer for the back buffer (default: false)
    #[serde(default)]
    pub depth: bool,
    /// Ask the driver for a debug context/device (default: false)
    #[serde(default)]
    pub debug_renderer: bool,
    /// Who drives the command loop (default: threaded)
    #[serde(default)]
    pub execution_mode: ExecutionMode,
}

/// Audio settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Preferred audio driver (default: automatic)
    #[serde(default)]
    pub driver: AudioDriver,
    /// Output sample rate in Hz (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Output channel count (default: 2)
    #[serde(default = "default_channels")]
    pub channels: u16,
    /// Frames mixed per pull on the headless driver (default: 512)
    #[serde(default = "default_buffer_frames")]
    pub buffer_frames: u32,
    /// Master gain applied after mixing (default: 1.0, range: 0.0-4.0)
    #[serde(default = "default_master_gain")]
    pub master_gain: f32,
    /// Maximum simultaneously registered sounds (default: 64)
    #[serde(default = "default_max_voices")]
    pub max_voices: usize,
}

fn default_width() -> u32 {
    1280
}
fn default_height() -> u32 {
    720
}
fn default_sample_count() -> u32 {
    1
}
fn default_max_anisotropy() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_sample_rate() -> u32 {
    44_100
}
fn default_channels() -> u16 {
    2
}
fn default_buffer_frames() -> u32 {
    512
}
fn default_master_gain() -> f32 {
    1.0
}
fn default_max_voices() -> usize {
    64
}

impl Default for GraphicsSettings {
    fn default() -> Self {
        Self {
            driver: GraphicsDriver::default(),
            width: default_width(),
            height: default_height(),
            sample_count: default_sample_count(),
            texture_filter: SamplerFilter::default(),
            max_anisotropy: default_max_anisotropy(),
            vsync: default_true(),
            depth: false,
            debug_renderer: false,
            execution_mode: ExecutionMode::default(),
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            driver: AudioDriver::default(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            buffer_frames: default_buffer_frames(),
            master_gain: default_master_gain(),
            max_voices: default_max_voices(),
        }
    }
}

impl GraphicsSettings {
    /// Device options derived from these settings.
    pub fn device_options(&self) -> DeviceOptions {
        DeviceOptions {
            size: Size2::new(self.width, self.height),
            sample_count: self.sample_count,
            texture_filter: self.texture_filter,
            max_anisotropy: self.max_anisotropy,
            vsync: self.vsync,
            depth: self.depth,
            debug_renderer: self.debug_renderer,
            execution_mode: self.execution_mode,
        }
    }
}

impl Settings {
    /// Parses settings from TOML text and validates them.
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from `path`.
    ///
    /// A missing file yields the defaults. An unreadable file is a
    /// [`EngineError::File`], malformed TOML a [`EngineError::Parse`] and
    /// out-of-range values a [`EngineError::Config`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::file(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Writes settings to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let text = toml::to_string_pretty(self)
            .map_err(|e| EngineError::data(format!("failed to serialize settings: {}", e)))?;
        std::fs::write(path, text)
            .map_err(|e| EngineError::file(format!("failed to write {}: {}", path.display(), e)))
    }

    /// `settings.toml` in the platform config directory, if one exists.
    pub fn default_path() -> Option<PathBuf> {
        default_settings_path()
    }

    /// Checks value ranges that serde can't express.
    pub fn validate(&self) -> Result<()> {
        let g = &self.graphics;
        if g.width == 0 || g.height == 0 {
            return Err(EngineError::config(format!(
                "invalid resolution {}x{}",
                g.width, g.height
            )));
        }
        if !matches!(g.sample_count, 1 | 2 | 4 | 8 | 16) {
            return Err(EngineError::config(format!(
                "invalid sample count {} (must be 1, 2, 4, 8 or 16)",
                g.sample_count
            )));
        }
        if g.max_anisotropy == 0 || g.max_anisotropy > 16 {
            return Err(EngineError::config(format!(
                "invalid max anisotropy {} (must be 1-16)",
                g.max_anisotropy
            )));
        }

        let a = &self.audio;
        if !(8_000..=192_000).contains(&a.sample_rate) {
            return Err(EngineError::config(format!(
                "invalid sample rate {} (must be 8000-192000)",
                a.sample_rate
            )));
        }
        if a.channels == 0 || a.channels > 8 {
            return Err(EngineError::config(format!(
                "invalid channel count {} (must be 1-8)",
                a.channels
            )));
        }
        if a.buffer_frames == 0 {
            return Err(EngineError::config("audio buffer_frames must be non-zero"));
        }
        if !(0.0..=4.0).contains(&a.master_gain) {
            return Err(EngineError::config(format!(
                "invalid master gain {} (must be 0.0-4.0)",
                a.master_gain
            )));
        }
        if a.max_voices == 0 {
            return Err(EngineError::config("audio max_voices must be non-zero"));
        }
        Ok(())
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\Vesper\config`
/// On macOS: `~/Library/Application Support/org.vesper.Vesper`
/// On Linux: `~/.config/vesper`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "vesper", "Vesper")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default settings file location, if a home directory exists.
pub fn default_settings_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(SETTINGS_FILE))
}

#[cfg(test)]
mod tests;
