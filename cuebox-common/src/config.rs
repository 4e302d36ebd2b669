//! Configuration loading and audio settings
//!
//! Bootstrap configuration is a single TOML file. Every field has a built-in
//! default, so a missing file is not an error: the loader warns and carries
//! on with defaults. A file that exists but cannot be parsed is reported.
//!
//! # Config file resolution
//!
//! 1. Explicit path (command-line argument)
//! 2. `CUEBOX_CONFIG` environment variable
//! 3. `<platform config dir>/cuebox/config.toml`
//! 4. Built-in defaults

use crate::transition::TransitionSpec;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CUEBOX_CONFIG";

/// Global playback gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    /// Audio plays normally
    #[default]
    Play,
    /// Audio plays on muted channels
    Mute,
    /// Play requests are refused
    Disabled,
}

impl PlayState {
    pub fn can_play(&self) -> bool {
        !matches!(self, PlayState::Disabled)
    }

    pub fn is_muted(&self) -> bool {
        matches!(self, PlayState::Mute)
    }
}

/// Random volume/pitch spread applied to every one-shot clip
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalVarianceSettings {
    pub enabled: bool,
    /// Maximum +/- deviation from the clip volume
    pub volume: f32,
    /// Maximum +/- deviation from the clip pitch
    pub pitch: f32,
}

impl Default for GlobalVarianceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            volume: 0.05,
            pitch: 0.05,
        }
    }
}

/// Channel pool tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Instances created up-front at service init
    pub prewarm: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self { prewarm: 8 }
    }
}

/// Music player settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicSettings {
    /// Target music volume (0.0-1.0)
    pub volume: f32,
    /// Transition used between playlist tracks without a custom one
    pub default_transition: TransitionSpec,
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            default_transition: TransitionSpec::default(),
        }
    }
}

/// Runtime audio settings consulted by the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Gate for one-shot clips and groups
    pub audio_state: PlayState,
    /// Gate for music and playlists
    pub music_state: PlayState,
    pub global_variance: GlobalVarianceSettings,
    /// Return sequences to the pool when they complete, unless a pool edit
    /// says otherwise
    pub recycle_on_complete: bool,
    /// Output group used when a request carries no output edit
    pub default_output: Option<String>,
    pub pool: PoolSettings,
    pub music: MusicSettings,
    /// Fixed seed for reproducible random selection
    pub rng_seed: Option<u64>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            audio_state: PlayState::Play,
            music_state: PlayState::Play,
            global_variance: GlobalVarianceSettings::default(),
            recycle_on_complete: true,
            default_output: None,
            pool: PoolSettings::default(),
            music: MusicSettings::default(),
            rng_seed: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub audio: AudioSettings,
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load from a specific file
    ///
    /// A missing file yields defaults with a warning; a malformed one is an
    /// error.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml_str(&content)?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Resolve the config file location and load it
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path) {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Config path resolution by priority
///
/// The platform default is only returned when the file exists; explicit
/// paths are returned as given so a typo is reported by the loader.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|p| p.exists())
}

/// `<config dir>/cuebox/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cuebox").join("config.toml"))
}
