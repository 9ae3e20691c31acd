//! Plugin configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use directories::ProjectDirs;
use sdvolume_core::FeedbackStyle;
use sdvolume_core::feedback::{DEFAULT_MUTED_ICON, DEFAULT_TITLE, DEFAULT_UNMUTED_ICON};
use sdvolume_device::alsa::DEFAULT_CONTROL;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Plugin configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Plugin settings
    #[serde(default)]
    pub plugin: PluginConfig,
    /// Output device settings
    #[serde(default)]
    pub device: DeviceConfig,
    /// Dial display settings
    #[serde(default)]
    pub dial: DialConfig,
}

/// Plugin-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which audio layer drives the output device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// ALSA simple mixer control via `amixer`
    #[default]
    Alsa,
    /// In-process device, for running without audio hardware
    Memory,
}

/// Output device settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Audio backend
    #[serde(default)]
    pub backend: BackendKind,
    /// Sound card index or id (optional, uses the default card if not set)
    pub card: Option<String>,
    /// Mixer control name
    #[serde(default = "default_control")]
    pub control: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { backend: BackendKind::default(), card: None, control: default_control() }
    }
}

fn default_control() -> String {
    DEFAULT_CONTROL.to_string()
}

/// Dial display settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DialConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_muted_icon")]
    pub muted_icon: String,
    #[serde(default = "default_unmuted_icon")]
    pub unmuted_icon: String,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            muted_icon: default_muted_icon(),
            unmuted_icon: default_unmuted_icon(),
        }
    }
}

impl DialConfig {
    /// Static parts of the rendered feedback.
    #[must_use]
    pub fn style(&self) -> FeedbackStyle {
        FeedbackStyle {
            title: self.title.clone(),
            muted_icon: self.muted_icon.clone(),
            unmuted_icon: self.unmuted_icon.clone(),
        }
    }
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_muted_icon() -> String {
    DEFAULT_MUTED_ICON.to_string()
}

fn default_unmuted_icon() -> String {
    DEFAULT_UNMUTED_ICON.to_string()
}

/// Load configuration.
///
/// An explicit `path` must exist. Without one, the platform config file is
/// used if present, otherwise defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return load_from(path);
    }

    let config_path = config_path()?;
    if config_path.exists() {
        load_from(&config_path)
    } else {
        info!(?config_path, "Config file not found, using defaults");
        Ok(Config::default())
    }
}

fn load_from(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {path:?}"))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {path:?}"))?;
    info!(?path, "Configuration loaded");
    Ok(config)
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "sdvolume", "SDVolume")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}
