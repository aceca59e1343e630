//! Configuration management.
//!
//! All tunables are loaded from `./config/mapreviews.toml`. Defaults live
//! only in the bundled config template; when no file exists on disk the
//! template itself is parsed, so there is exactly one place to change a
//! default.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::discover::DiscoverSettings;
use crate::normalize::NormalizeMode;
use crate::pacing::PacingSettings;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/mapreviews.toml";

/// Default configuration file content - this is the ONLY place defaults exist
pub const DEFAULT_CONFIG: &str = include_str!("../config/mapreviews.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Invalid value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub browser: BrowserConfig,
    pub search: SearchConfig,
    pub discover: DiscoverSettings,
    pub pacing: PacingSettings,
    pub normalize: NormalizeConfig,
}

/// Browser launch and timing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Bounded timeout applied to navigation and element waits, in seconds.
    pub nav_timeout_secs: u64,
    pub user_agent: String,
}

/// Search query construction and candidate filtering
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Search URL template with a `{query}` placeholder.
    pub url_template: String,
    /// Extra term appended to every query (e.g. a country qualifier).
    #[serde(default)]
    pub query_suffix: String,
    /// Candidate names must contain the organization name or one of these,
    /// case-insensitively.
    pub relevance_keywords: Vec<String>,
    /// Cap on candidates processed per target.
    pub max_entities: usize,
}

/// Normalizer selection
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizeConfig {
    pub mode: NormalizeMode,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    64
}

impl AppConfig {
    /// Load configuration from the default path, falling back to the
    /// bundled template when no file exists on disk.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = Path::new(CONFIG_PATH);
        if path.exists() {
            Self::load_from_path(path)
        } else {
            let config: AppConfig = toml::from_str(DEFAULT_CONFIG)?;
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.browser.user_agent.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "browser.user_agent".to_string(),
            });
        }
        if self.browser.nav_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "browser.nav_timeout_secs".to_string(),
            });
        }
        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "browser.window_width/window_height".to_string(),
                detail: "window dimensions must be non-zero".to_string(),
            });
        }

        if !self.search.url_template.contains("{query}") {
            return Err(ConfigError::InvalidValue {
                field: "search.url_template".to_string(),
                detail: "template must contain a {query} placeholder".to_string(),
            });
        }
        if self.search.max_entities == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "search.max_entities".to_string(),
            });
        }

        if self.discover.max_scroll_iterations == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "discover.max_scroll_iterations".to_string(),
            });
        }
        if self.discover.max_trigger_clicks == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "discover.max_trigger_clicks".to_string(),
            });
        }

        for (field, range) in [
            ("pacing.entity_delay_ms", self.pacing.entity_delay_ms),
            ("pacing.target_delay_ms", self.pacing.target_delay_ms),
        ] {
            if range.0 > range.1 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    detail: format!("min {} exceeds max {}", range.0, range.1),
                });
            }
        }

        if self.normalize.chunk_size == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "normalize.chunk_size".to_string(),
            });
        }

        Ok(())
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = Path::new(CONFIG_PATH);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config: Result<AppConfig, _> = toml::from_str(DEFAULT_CONFIG);
        assert!(config.is_ok(), "Default config should parse: {:?}", config.err());
    }

    #[test]
    fn test_default_config_validates() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.validate().is_ok(), "Default config should validate");
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        config.search.url_template = "https://maps.example.com/search".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_pacing_range_rejected() {
        let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        config.pacing.entity_delay_ms = (5000, 1000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        config.browser.nav_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
