//! Configuration management for typegraph
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (typegraph.toml)
//! - Environment variables (TYPEGRAPH__*)
//!
//! ## Example config file (typegraph.toml):
//! ```toml
//! [convert]
//! max_depth = 128
//! include_definitions = true
//! root_name = "Root"
//!
//! [output]
//! format = "summary"
//! pretty = true
//!
//! [logging]
//! level = "info"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::convert::ConvertOptions;

/// Main configuration for typegraph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypegraphConfig {
    /// Conversion settings
    #[serde(default)]
    pub convert: ConvertConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Conversion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Recursion budget; 0 disables the check
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Register every entry of `definitions` as a top-level type
    #[serde(default = "default_true")]
    pub include_definitions: bool,

    /// Top-level name given to the document root
    #[serde(default = "default_root_name")]
    pub root_name: String,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default = "default_true")]
    pub pretty: bool,
}

/// Rendering of the finished graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
    Dot,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_level")]
    pub level: String,
}

// Default value functions
fn default_max_depth() -> usize {
    128
}

fn default_true() -> bool {
    true
}

fn default_root_name() -> String {
    "Root".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            include_definitions: true,
            root_name: default_root_name(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Summary,
            pretty: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level() }
    }
}

impl TypegraphConfig {
    /// Load configuration from the default locations, then `config_path`
    /// when given, then the environment
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["typegraph.toml", ".typegraph.toml", "config/typegraph.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "typegraph") {
            let xdg_config = config_dir.config_dir().join("typegraph.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (TYPEGRAPH__SECTION__KEY)
        builder = builder.add_source(
            Environment::with_prefix("TYPEGRAPH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Engine-facing subset
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            max_depth: match self.convert.max_depth {
                0 => None,
                depth => Some(depth),
            },
        }
    }
}
