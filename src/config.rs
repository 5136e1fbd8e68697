//! Configuration file support for feedview.
//!
//! Settings are stored as versioned JSON: in the XDG config directory for the
//! native driver and in localStorage in the browser.

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::constants::{IMAGE_LOAD_TIMEOUT_MS, OVERLAY_HIDE_DELAY_MS, RETINA_PIXEL_RATIO};
use crate::keybindings::{Action, KeyBindings};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Application name (for identification)
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,

    /// Inline image viewer settings
    #[serde(default)]
    pub media: MediaConfig,

    /// Shortcut overrides
    #[serde(default)]
    pub keybindings: KeyBindingsConfig,
}

fn default_app_name() -> String {
    "feedview".to_string()
}

/// User preferences section of the config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Inline image viewer section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Column width used when the page cannot be measured
    #[serde(default)]
    pub column_width: Option<f32>,

    /// Device pixel ratio from which the retina-halved mode is offered
    #[serde(default = "default_retina_threshold")]
    pub retina_threshold: f32,

    /// Quiet period before the viewer controls hide, in milliseconds
    #[serde(default = "default_overlay_hide_ms")]
    pub overlay_hide_ms: u64,

    /// Time an image may stay unloaded before it is given up on, in milliseconds
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,
}

fn default_retina_threshold() -> f32 {
    RETINA_PIXEL_RATIO
}

fn default_overlay_hide_ms() -> u64 {
    OVERLAY_HIDE_DELAY_MS
}

fn default_load_timeout_ms() -> u64 {
    IMAGE_LOAD_TIMEOUT_MS
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            column_width: None,
            retina_threshold: default_retina_threshold(),
            overlay_hide_ms: default_overlay_hide_ms(),
            load_timeout_ms: default_load_timeout_ms(),
        }
    }
}

impl MediaConfig {
    pub fn overlay_hide_delay(&self) -> Duration {
        Duration::from_millis(self.overlay_hide_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

/// Shortcut overrides: key sequence to action.
///
/// Entries replace the default binding for the same sequence. Sequences that
/// fail to parse are skipped with a warning when the bindings are built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyBindingsConfig {
    #[serde(default)]
    pub overrides: Vec<ShortcutOverride>,
}

/// A single user shortcut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortcutOverride {
    /// Space separated key names, e.g. `"g s"`
    pub sequence: String,
    pub action: Action,
}

impl KeyBindingsConfig {
    /// Default bindings with the overrides applied.
    pub fn to_keybindings(&self) -> KeyBindings {
        let mut bindings = KeyBindings::default();
        for shortcut in &self.overrides {
            if let Err(e) = bindings.bind(&shortcut.sequence, shortcut.action.clone()) {
                log::warn!("Skipping shortcut override {:?}: {}", shortcut.sequence, e);
            }
        }
        bindings
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: default_app_name(),
            preferences: UserPreferences::default(),
            media: MediaConfig::default(),
            keybindings: KeyBindingsConfig::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "feedview-config.json"
    }

    /// Get the default config file path.
    /// Returns None on WASM (no filesystem access).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("feedview").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("feedview")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load_from_path(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// LocalStorage key for WASM config persistence.
    #[cfg(target_arch = "wasm32")]
    const LOCALSTORAGE_KEY: &'static str = "feedview-config";

    /// Try to load configuration from localStorage (WASM only).
    /// Returns None if not found or can't be parsed.
    #[cfg(target_arch = "wasm32")]
    pub fn load_from_local_storage() -> Option<Self> {
        let window = web_sys::window()?;
        let storage = window.local_storage().ok()??;

        match storage.get_item(Self::LOCALSTORAGE_KEY) {
            Ok(Some(json)) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from localStorage");
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config from localStorage: {}", e);
                    None
                }
            },
            Ok(None) => {
                log::debug!("No config found in localStorage");
                None
            }
            Err(e) => {
                log::warn!("Failed to read from localStorage: {:?}", e);
                None
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
