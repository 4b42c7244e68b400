// thinkstream-cli/src/config.rs
//
// Layered config: defaults <- TOML file <- environment <- command-line flags.
// The file is `--config PATH` when given, else `<config dir>/thinkstream/config.toml`
// if it exists.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thinkstream_core::CaptureConfig;

use crate::render::RenderFormat;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Overrides `capture.default_title`.
pub const ENV_DEFAULT_TITLE: &str = "THINKSTREAM_DEFAULT_TITLE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub format: RenderFormat,
    /// Dim/italic phase titles in the status view.
    #[serde(default = "default_true")]
    pub ansi: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            format: RenderFormat::default(),
            ansi: true,
        }
    }
}

/// `<config dir>/thinkstream/config.toml` (XDG on Linux, Application Support on macOS).
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "thinkstream").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

impl CliConfig {
    /// Resolve the effective config. An explicit path must exist; the
    /// default path is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides, read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(title) = lookup(ENV_DEFAULT_TITLE) {
            tracing::debug!(%title, "default title from environment");
            self.apply_default_title(&title);
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to encode config")
    }

    /// Blank titles are ignored: a phase always has a visible name.
    pub fn apply_default_title(&mut self, title: &str) {
        let title = title.trim();
        if !title.is_empty() {
            self.capture.default_title = title.to_string();
        }
    }
}
