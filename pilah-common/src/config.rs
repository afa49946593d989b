//! Configuration loading and setting resolution
//!
//! Every setting follows the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`PILAH_*`)
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or malformed TOML file is never fatal: a warning is logged and
//! compiled defaults are used instead.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const ENV_CONFIG_PATH: &str = "PILAH_CONFIG";

/// Bootstrap configuration loaded from TOML
///
/// All fields are optional so that a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Path to the classification model artifact
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Base URL of the remote scoring backend (e.g. `http://localhost:3005/api`)
    #[serde(default)]
    pub api_url: Option<String>,

    /// Capture device (`/dev/video0` or a bare index)
    #[serde(default)]
    pub camera_device: Option<String>,

    /// Path to the local credential store
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Built-in defaults used when no other source provides a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub port: u16,
    pub model_path: PathBuf,
    pub api_url: String,
    pub camera_device: String,
    pub credentials_path: PathBuf,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was compiled for
    pub fn for_current_platform() -> Self {
        Self {
            port: 5780,
            model_path: PathBuf::from("model").join("model.onnx"),
            api_url: "http://localhost:3005/api".to_string(),
            camera_device: default_camera_device().to_string(),
            credentials_path: data_folder().join("credentials.json"),
        }
    }
}

fn default_camera_device() -> &'static str {
    if cfg!(target_os = "linux") {
        "/dev/video0"
    } else {
        "0"
    }
}

/// OS-dependent data folder (`~/.local/share/pilah` on Linux)
pub fn data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pilah"))
        .unwrap_or_else(|| PathBuf::from("./pilah_data"))
}

/// Where a resolved value came from, for startup logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    Toml,
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigSource::CommandLine => "command line",
            ConfigSource::Environment => "environment",
            ConfigSource::Toml => "TOML",
            ConfigSource::Default => "compiled default",
        };
        f.write_str(name)
    }
}

/// A setting value together with its source
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ConfigSource,
}

/// Resolve a single setting using CLI > ENV > TOML > default priority
///
/// An environment value that fails to parse is ignored with a warning, so a
/// typo in the environment cannot prevent startup.
pub fn resolve_setting<T>(
    name: &str,
    cli: Option<T>,
    env_var: &str,
    toml: Option<T>,
    default: T,
) -> Resolved<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Some(value) = cli {
        return Resolved {
            value,
            source: ConfigSource::CommandLine,
        };
    }

    if let Ok(raw) = std::env::var(env_var) {
        if !raw.trim().is_empty() {
            match raw.trim().parse::<T>() {
                Ok(value) => {
                    return Resolved {
                        value,
                        source: ConfigSource::Environment,
                    }
                }
                Err(e) => warn!("Ignoring {}={:?} for {}: {}", env_var, raw, name, e),
            }
        }
    }

    if let Some(value) = toml {
        return Resolved {
            value,
            source: ConfigSource::Toml,
        };
    }

    Resolved {
        value: default,
        source: ConfigSource::Default,
    }
}

/// Default config file location for a module (`~/.config/pilah/<module>.toml`)
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pilah").join(format!("{}.toml", module_name)))
}

/// Locate the config file: explicit path, then `PILAH_CONFIG`, then the default location
pub fn locate_config_file(explicit: Option<&Path>, module_name: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    default_config_path(module_name)
}

/// Load a TOML config file, failing on missing or malformed files
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// What happened when looking for the bootstrap file
///
/// Config is read before logging is set up, so the outcome is returned and
/// reported with [`ConfigFile::log`] once a subscriber exists.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigFile {
    /// No config location could be determined
    NoLocation,
    /// The file does not exist
    Missing(PathBuf),
    /// Read and parsed
    Loaded(PathBuf),
    /// Present but unreadable or malformed
    Invalid { path: PathBuf, error: String },
}

impl ConfigFile {
    pub fn log(&self) {
        match self {
            ConfigFile::NoLocation => debug!("No config file location available, using defaults"),
            ConfigFile::Missing(path) => {
                info!("Config file {} not found, using defaults", path.display())
            }
            ConfigFile::Loaded(path) => info!("Loaded configuration from {}", path.display()),
            ConfigFile::Invalid { error, .. } => warn!("{}; continuing with defaults", error),
        }
    }
}

/// Load a TOML config file, degrading to defaults on any problem
pub fn load_toml_config_or_default(path: Option<&Path>) -> (TomlConfig, ConfigFile) {
    let Some(path) = path else {
        return (TomlConfig::default(), ConfigFile::NoLocation);
    };

    if !path.exists() {
        return (TomlConfig::default(), ConfigFile::Missing(path.to_path_buf()));
    }

    match load_toml_config(path) {
        Ok(config) => (config, ConfigFile::Loaded(path.to_path_buf())),
        Err(e) => (
            TomlConfig::default(),
            ConfigFile::Invalid {
                path: path.to_path_buf(),
                error: e.to_string(),
            },
        ),
    }
}
