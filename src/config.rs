//! Configuration loading and validation.
//!
//! Configuration comes from a single `thumbcache.toml`. All options have
//! defaults, so a config file is optional and sparse: override just the
//! values you want. Unknown keys are rejected to catch typos early.
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! base_url = "http://localhost"     # Public URL the web root is served at
//! web_root = "."                    # Directory the site is served from
//! thumbnails_dir = "thumbnails"     # Where derived thumbnails are written
//!
//! [thumbnails]
//! strategy = "fit"                  # stretch | fit | fill | area
//! width = 200                       # Default target width (0 = unset)
//! height = 0                        # Default target height (0 = unset)
//! scales = [1.0, 2.0]               # Variants per thumbnail (e.g. for high-DPI)
//!
//! [graphics]
//! engines = ["raster"]              # Engine priority list
//! quality = 90                      # JPEG quality (1-100)
//!
//! [processing]
//! max_workers = 4                   # Max parallel workers for batch (omit for auto)
//! ```
//!
//! The web root and base URL pair defines the path↔URL mapping used both to
//! resolve sources and to compute cache paths: a source under `web_root`
//! keys its thumbnails by its web-root-relative path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config validation error: {0}")]
    Validation(String),
}

/// Crate configuration loaded from `thumbcache.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Public base URL the web root is served at.
    pub base_url: String,
    /// Directory the site is served from; sources under it are cache-keyed
    /// by their relative path.
    pub web_root: PathBuf,
    /// Directory derived thumbnails are written to.
    pub thumbnails_dir: PathBuf,
    /// Default thumbnail request used when the caller doesn't override.
    pub thumbnails: ThumbnailDefaults,
    /// Graphics engine selection and encoding settings.
    pub graphics: GraphicsConfig,
    /// Parallel processing settings for the batch command.
    pub processing: ProcessingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            web_root: PathBuf::from("."),
            thumbnails_dir: PathBuf::from("thumbnails"),
            thumbnails: ThumbnailDefaults::default(),
            graphics: GraphicsConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailDefaults {
    /// Resize strategy name: stretch, fit, fill, or area.
    pub strategy: String,
    /// Target width; zero means unset (derived from the aspect ratio).
    pub width: u32,
    /// Target height; zero means unset.
    pub height: u32,
    /// Scale multipliers, one thumbnail per distinct value.
    pub scales: Vec<f64>,
}

impl Default for ThumbnailDefaults {
    fn default() -> Self {
        Self {
            strategy: "fit".to_string(),
            width: 200,
            height: 0,
            scales: vec![1.0, 2.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphicsConfig {
    /// Engine priority list; the first available engine wins.
    pub engines: Vec<String>,
    /// JPEG encoding quality (1-100).
    pub quality: u32,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            engines: vec!["raster".to_string()],
            quality: 90,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Max parallel workers for batch processing (omit for auto = CPU cores).
    pub max_workers: Option<usize>,
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Strip trailing slashes so path/URL concatenation stays predictable.
    fn normalize(&mut self) {
        while self.base_url.len() > 1 && self.base_url.ends_with('/') {
            self.base_url.pop();
        }
        for dir in [&mut self.web_root, &mut self.thumbnails_dir] {
            let s = dir.to_string_lossy().into_owned();
            if s.len() > 1 && s.ends_with('/') {
                *dir = PathBuf::from(s.trim_end_matches('/'));
            }
        }
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.contains("://") {
            return Err(ConfigError::Validation(
                "base_url must include a scheme, e.g. \"https://example.com\"".into(),
            ));
        }
        if self.graphics.engines.is_empty() {
            return Err(ConfigError::Validation(
                "graphics.engines must list at least one engine".into(),
            ));
        }
        if self.graphics.quality == 0 || self.graphics.quality > 100 {
            return Err(ConfigError::Validation(
                "graphics.quality must be 1-100".into(),
            ));
        }
        if self.thumbnails.scales.is_empty() {
            return Err(ConfigError::Validation(
                "thumbnails.scales must list at least one scale".into(),
            ));
        }
        if self.thumbnails.scales.iter().any(|&s| s <= 0.0) {
            return Err(ConfigError::Validation(
                "thumbnails.scales values must be positive".into(),
            ));
        }
        if self.thumbnails.width == 0 && self.thumbnails.height == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.width and thumbnails.height cannot both be unset".into(),
            ));
        }
        Ok(())
    }
}

/// Effective worker count for batch processing: the configured cap, bounded
/// by the number of available CPU cores; users can constrain down, not up.
pub fn effective_workers(processing: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    match processing.max_workers {
        Some(n) if n > 0 => n.min(cores),
        _ => cores,
    }
}

/// A documented stock config, printed by `thumbcache gen-config`.
pub fn stock_config_toml() -> &'static str {
    r#"# thumbcache configuration
# All options are optional - the values below are the defaults.

# Public URL the web root is served at. Together with web_root this defines
# the path<->URL mapping used to resolve sources and key the cache.
base_url = "http://localhost"

# Directory the site is served from.
web_root = "."

# Directory derived thumbnails are written to. Cache files are named
# <thumbnails_dir><relative-path>-<strategy>-<width>x<height>.<ext>
thumbnails_dir = "thumbnails"

[thumbnails]
# Resize strategy: "stretch", "fit", "fill", or "area".
strategy = "fit"
# Default target size. Zero means unset: the missing dimension is derived
# from the original aspect ratio (stretch requires both).
width = 200
height = 0
# Scale multipliers - one thumbnail per distinct value, e.g. 2.0 for
# high-DPI variants. Thumbnails that would match or exceed the original
# size are skipped.
scales = [1.0, 2.0]

[graphics]
# Engine priority list; the first available engine wins.
engines = ["raster"]
# JPEG encoding quality (1-100).
quality = 90

[processing]
# Max parallel workers for the batch command. Omit for auto (CPU cores).
# max_workers = 4
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let parsed: Config = toml::from_str(stock_config_toml()).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.base_url, defaults.base_url);
        assert_eq!(parsed.thumbnails.strategy, defaults.thumbnails.strategy);
        assert_eq!(parsed.thumbnails.scales, defaults.thumbnails.scales);
        assert_eq!(parsed.graphics.engines, defaults.graphics.engines);
    }

    #[test]
    fn sparse_config_keeps_defaults() {
        let config: Config = toml::from_str("base_url = \"https://example.com\"").unwrap();
        assert_eq!(config.base_url, "https://example.com");
        assert_eq!(config.thumbnails.strategy, "fit");
        assert_eq!(config.graphics.quality, 90);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<Config, _> = toml::from_str("not_an_option = true");
        assert!(result.is_err());
    }

    #[test]
    fn load_normalizes_trailing_slashes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("thumbcache.toml");
        std::fs::write(
            &path,
            "base_url = \"https://example.com/\"\nweb_root = \"/srv/www/\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_url, "https://example.com");
        assert_eq!(config.web_root, PathBuf::from("/srv/www"));
    }

    #[test]
    fn load_or_default_falls_back_when_missing() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_or_default(&tmp.path().join("missing.toml")).unwrap();
        assert_eq!(config.base_url, "http://localhost");
    }

    #[test]
    fn validation_rejects_bad_quality() {
        let mut config = Config::default();
        config.graphics.quality = 101;
        assert!(config.validate().is_err());
        config.graphics.quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_empty_engines() {
        let mut config = Config::default();
        config.graphics.engines.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_bad_scales() {
        let mut config = Config::default();
        config.thumbnails.scales = vec![];
        assert!(config.validate().is_err());
        config.thumbnails.scales = vec![1.0, -2.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_schemeless_base_url() {
        let config = Config {
            base_url: "example.com".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_fully_unset_default_size() {
        let mut config = Config::default();
        config.thumbnails.width = 0;
        config.thumbnails.height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn effective_workers_is_at_least_one() {
        let workers = effective_workers(&ProcessingConfig { max_workers: None });
        assert!(workers >= 1);
        let capped = effective_workers(&ProcessingConfig {
            max_workers: Some(1),
        });
        assert_eq!(capped, 1);
    }
}
