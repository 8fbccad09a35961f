//! Configuration Module - User preferences from the platform config dir
//!
//! Supports:
//! - Log level
//! - Output format and field rendering options
//! - Thumbnail size and image export directory
//! - Directory scan settings

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::romdata::RomDataAttrs;

/// Romscope Configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Output settings
    pub output: OutputConfig,
    /// Image settings
    pub images: ImagesConfig,
    /// Scan settings
    pub scan: ScanConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// How detection results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format
    pub format: OutputFormat,
    /// Print fields that live in unnamed tabs
    pub show_hidden_tabs: bool,
    /// One age rating per line instead of comma-separated
    pub age_ratings_newlines: bool,
    /// Indent JSON output
    pub pretty_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            show_hidden_tabs: false,
            age_ratings_newlines: false,
            pretty_json: true,
        }
    }
}

/// Image settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Longest edge of generated thumbnails, in pixels
    pub thumbnail_size: u32,
    /// Where `--extract` writes relative paths (optional)
    pub export_dir: Option<PathBuf>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: 256,
            export_dir: None,
        }
    }
}

/// Scan settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of parallel workers (0 = rayon default)
    pub workers: usize,
    /// Skip hidden files by default
    pub skip_hidden: bool,
    /// Max depth (0 = unlimited)
    pub max_depth: usize,
    /// Capabilities every detected format must offer
    pub require: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            skip_hidden: true,
            max_depth: 0,
            require: Vec::new(),
        }
    }
}

impl ScanConfig {
    /// `require` as capability flags. Unknown names are skipped.
    pub fn required_attrs(&self) -> RomDataAttrs {
        self.require
            .iter()
            .filter_map(|name| {
                let attrs = RomDataAttrs::from_name(name);
                if attrs.is_none() {
                    tracing::warn!("Unknown capability in config: {}", name);
                }
                attrs
            })
            .fold(RomDataAttrs::NONE, |acc, a| acc | a)
    }
}

impl Config {
    /// Load config from default path or return defaults
    pub fn load() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring config: {:#}", e);
            Self::default()
        })
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        Ok(config)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;

        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("org", "romscope", "romscope")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".romscope")
                    .join("config.toml")
            })
    }

    /// Write the commented sample config to the default path unless a
    /// config already exists there. Returns the path.
    pub fn init_default() -> Result<PathBuf> {
        let path = Self::default_path();
        if path.exists() {
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, generate_sample_config())
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        tracing::info!("Created default config at {}", path.display());
        Ok(path)
    }
}

/// Generate a sample config file with comments
pub fn generate_sample_config() -> String {
    r#"# Romscope Configuration
# Location: ~/.config/romscope/config.toml (or %APPDATA%\romscope\config\config.toml on Windows)

[general]
# Log level: trace, debug, info, warn, error
# RUST_LOG takes precedence when set.
log_level = "info"

[output]
# Default output format: "text" or "json"
format = "text"

# Print fields from unnamed tabs
show_hidden_tabs = false

# One age rating per line
age_ratings_newlines = false

# Indent JSON output
pretty_json = true

[images]
# Longest edge of thumbnails, in pixels
thumbnail_size = 256

# Directory for relative --extract paths (optional)
# export_dir = "/home/user/romscope-images"

[scan]
# Number of parallel workers (0 = one per CPU)
workers = 0

# Skip hidden files and directories
skip_hidden = true

# Maximum scan depth (0 = unlimited)
max_depth = 0

# Only report formats with these capabilities
# Available: "thumbnail", "metadata", "dpoverlay"
require = []
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.images.thumbnail_size, 256);
        assert!(config.scan.skip_hidden);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.output.format = OutputFormat::Json;
        config.scan.require = vec!["metadata".to_string()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.output.format, OutputFormat::Json);
        assert_eq!(loaded.scan.required_attrs(), RomDataAttrs::HAS_METADATA);
    }

    #[test]
    fn test_parse_sample_config() {
        let sample = generate_sample_config();
        let config: Config = toml::from_str(&sample).unwrap();
        assert!(config.output.pretty_json);
        assert!(config.images.export_dir.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[images]\nthumbnail_size = 64\n").unwrap();
        assert_eq!(config.images.thumbnail_size, 64);
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.scan.max_depth, 0);
    }

    #[test]
    fn test_unknown_capability_is_skipped() {
        let scan = ScanConfig {
            require: vec!["thumbnail".into(), "sparkles".into()],
            ..Default::default()
        };
        assert_eq!(scan.required_attrs(), RomDataAttrs::HAS_THUMBNAIL);
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config"));
    }
}
