//! Configuration file handling for veo-studio.
//!
//! Loads configuration from `<config dir>/veo-studio/config.toml` or a custom path.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::veo::{AspectRatio, AudioAmbience, ClientSettings, Resolution};

/// Commented default written by `config init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# veo-studio configuration

[api]
# API key from a billing-enabled Google Cloud project.
# VEO_API_KEY / GEMINI_API_KEY take precedence over this value.
# key = "..."
# base_url = "https://generativelanguage.googleapis.com"
# model = "veo-3.1-fast-generate-preview"

[generation]
# Aspect ratio: "16:9" or "9:16"
aspect_ratio = "16:9"
# Resolution: "720p" or "1080p"
resolution = "720p"
# Audio ambience: nature, city, ocean, silent
ambience = "nature"
# Seconds between status checks
poll_interval_secs = 10

[output]
# Directory for generated videos (default: your videos folder)
# dir = "~/Videos/veo-studio"
"#;

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiConfig {
    pub key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct GenerationConfig {
    pub aspect_ratio: Option<AspectRatio>,
    pub resolution: Option<Resolution>,
    pub ambience: Option<AudioAmbience>,
    pub poll_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct OutputConfig {
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            Self::read(&path)
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    /// Load configuration from a path the user asked for explicitly.
    /// Unlike [`load`](Self::load), a missing file is an error.
    pub fn load_from_explicit(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Self::read(path)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Client settings with config values layered over the defaults.
    pub fn client_settings(&self) -> ClientSettings {
        let defaults = ClientSettings::default();
        ClientSettings {
            base_url: self.api.base_url.clone().unwrap_or(defaults.base_url),
            model: self.api.model.clone().unwrap_or(defaults.model),
            poll_interval: self
                .generation
                .poll_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
        }
    }

    /// Output directory from config, or the default.
    pub fn output_dir(&self) -> PathBuf {
        self.output
            .dir
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(default_output_dir)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file '{}' not found", .path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read config file '{}': {source}", .path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("veo-studio").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/veo-studio/config.toml")
        })
}

/// Get the default directory for generated videos.
pub fn default_output_dir() -> PathBuf {
    dirs::video_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("veo-studio")
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
