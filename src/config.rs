//! Configuration management for the lighting daemon.
//!
//! Loads configuration from TOML files and provides runtime defaults.

use crate::reducer::ReducerKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub regions: RegionConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub bridge: BridgeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            capture: CaptureConfig::default(),
            regions: RegionConfig::default(),
            dispatch: DispatchConfig::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Capture backend to bind ("synthetic" is the only built-in)
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Which monitor to sample
    #[serde(default)]
    pub monitor_index: usize,

    /// Capture tick period in milliseconds
    #[serde(default = "default_capture_interval")]
    pub interval_ms: u64,

    /// Region reduction strategy (average, dominant)
    #[serde(default = "default_strategy")]
    pub strategy: ReducerKind,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            monitor_index: 0,
            interval_ms: 50,
            strategy: ReducerKind::Average,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Region width as a fraction of frame width
    #[serde(default = "default_width_ratio")]
    pub width_ratio: f64,

    /// Region height as a fraction of frame height
    #[serde(default = "default_height_ratio")]
    pub height_ratio: f64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            width_ratio: 0.125,
            height_ratio: 0.66,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Dispatch tick period in milliseconds
    #[serde(default = "default_dispatch_interval")]
    pub interval_ms: u64,

    /// Lightness at or below which a color counts as near-black
    #[serde(default = "default_near_black")]
    pub near_black_lightness: u8,

    /// Saturation at or below which a color counts as near-black
    #[serde(default = "default_near_black")]
    pub near_black_saturation: u8,

    /// Saturation sent for colors worth rendering
    #[serde(default = "default_on_saturation")]
    pub on_saturation: u8,

    /// Brightness sent for colors worth rendering
    #[serde(default = "default_on_brightness")]
    pub on_brightness: u8,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            near_black_lightness: 20,
            near_black_saturation: 20,
            on_saturation: 254,
            on_brightness: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Bridge address; only needed by real transports, not the dry-run
    /// controller
    #[serde(default)]
    pub address: String,

    /// Registered application key on the bridge
    #[serde(default)]
    pub app_key: String,

    /// Fixtures mirroring the left screen edge
    #[serde(default = "default_left_fixtures")]
    pub left_fixture_ids: Vec<String>,

    /// Fixtures mirroring the right screen edge
    #[serde(default = "default_right_fixtures")]
    pub right_fixture_ids: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            app_key: String::new(),
            left_fixture_ids: default_left_fixtures(),
            right_fixture_ids: default_right_fixtures(),
        }
    }
}

// Default value functions for serde
fn default_log_level() -> String {
    "info".to_string()
}

fn default_backend() -> String {
    "synthetic".to_string()
}

fn default_capture_interval() -> u64 {
    50
}

fn default_dispatch_interval() -> u64 {
    100
}

fn default_strategy() -> ReducerKind {
    ReducerKind::Average
}

fn default_width_ratio() -> f64 {
    0.125
}

fn default_height_ratio() -> f64 {
    0.66
}

fn default_near_black() -> u8 {
    20
}

fn default_on_saturation() -> u8 {
    254
}

fn default_on_brightness() -> u8 {
    200
}

fn default_left_fixtures() -> Vec<String> {
    vec!["7".to_string()]
}

fn default_right_fixtures() -> Vec<String> {
    vec!["9".to_string()]
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("edgelight")
            .join("config.toml")
    }

    /// Save configuration to the default path
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to_path(Self::default_config_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        std::fs::write(&path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.capture.interval_ms == 0 {
            return Err("capture.interval_ms must be at least 1".to_string());
        }
        if self.dispatch.interval_ms == 0 {
            return Err("dispatch.interval_ms must be at least 1".to_string());
        }
        if !(self.regions.width_ratio > 0.0 && self.regions.width_ratio <= 1.0) {
            return Err(format!(
                "regions.width_ratio must be in (0, 1], got {}",
                self.regions.width_ratio
            ));
        }
        if !(self.regions.height_ratio > 0.0 && self.regions.height_ratio <= 1.0) {
            return Err(format!(
                "regions.height_ratio must be in (0, 1], got {}",
                self.regions.height_ratio
            ));
        }
        Ok(())
    }
}
