//! Configuration loaded from an optional TOML file
//!
//! ```toml
//! audio_dir = "audio"
//! audio_prefix = "audio"
//! player_dir = "wasm-player/pkg"
//!
//! [chart]
//! width = 7500
//! height = 1000
//! ticks = 100
//!
//! [player]
//! refresh_ms = 100
//! initial_volume = 1.0
//!
//! [server]
//! port = 3002
//! ```
//!
//! Every field has a default; the file itself is optional.

use crate::error::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "featurescope.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the audio files, on disk.
    pub audio_dir: PathBuf,
    /// URL prefix the page uses for audio sources.
    pub audio_prefix: String,
    /// Directory holding the built wasm player bundle.
    pub player_dir: PathBuf,
    pub chart: ChartConfig,
    pub player: PlayerConfig,
    pub server: ServerConfig,
}

/// Chart frame geometry, in pixels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    /// Number of intervals on the time axis.
    pub ticks: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Cadence of the elapsed / total refresh.
    pub refresh_ms: u64,
    pub initial_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("audio"),
            audio_prefix: "audio".to_string(),
            player_dir: PathBuf::from("wasm-player/pkg"),
            chart: ChartConfig::default(),
            player: PlayerConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 7500.0,
            height: 1000.0,
            margin_top: 20.0,
            margin_right: 30.0,
            margin_bottom: 50.0,
            margin_left: 0.0,
            ticks: 100,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            refresh_ms: 100,
            initial_volume: 1.0,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3002 }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from `path`, or from `./featurescope.toml` when no path is given.
    ///
    /// A missing file gives the defaults. A file that can't be read or parsed
    /// logs a warning and also gives the defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(CONFIG_FILE_NAME),
        };

        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(text) => match Self::from_toml_str(&text) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }
}
