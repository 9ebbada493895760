//! Configuration load/save.
//!
//! The config lives at `~/.config/estuary/config.toml`: instance URL, API
//! credentials, the watermark timestamp, the image flag and the feed list.
//! It is read wholesale at startup and rewritten with the advanced watermark
//! on normal completion. Saves are staged to a sibling temp file and renamed
//! into place, so a crash mid-run never leaves a torn config.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Generator;
use crate::status::{Template, TemplateError};

/// Main configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Mastodon instance base URL.
    pub url: String,
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    /// Attach entry images to posts.
    #[serde(default)]
    pub include_images: bool,
    /// Watermark: entries with an update time at or before this have been
    /// posted already. Absent on a fresh config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

/// One watched feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub url: String,
    /// Post template, e.g. `"{title} {url}"`.
    pub template: String,
    /// Platform override; detected from the feed when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<Generator>,
}

impl Config {
    /// Load and validate the configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to `path` atomically.
    ///
    /// Serializes to a sibling `.tmp` file first and renames it over the
    /// target, so readers never observe a partially-written document.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        let staged = path.with_extension("toml.tmp");
        fs::write(&staged, content).map_err(|e| ConfigError::Io {
            path: staged.clone(),
            source: e,
        })?;
        fs::rename(&staged, path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Check everything that must hold before any feed is processed:
    /// parseable instance and feed URLs, and templates that only reference
    /// known entry fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.url).map_err(|source| ConfigError::InvalidUrl {
            url: self.url.clone(),
            source,
        })?;
        for feed in &self.feeds {
            url::Url::parse(&feed.url).map_err(|source| ConfigError::InvalidUrl {
                url: feed.url.clone(),
                source,
            })?;
            Template::parse(&feed.template).map_err(|source| ConfigError::Template {
                feed: feed.url.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Default config file path: `~/.config/estuary/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("estuary").join("config.toml"))
    }
}

/// Configuration errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("Bad template for feed {feed}: {source}")]
    Template { feed: String, source: TemplateError },
}
