//! Configuration resolution for pilah-scan
//!
//! Each setting resolves independently with CLI > ENV > TOML > compiled
//! default priority; the winning source is logged at startup.

use pilah_common::config::{resolve_setting, CompiledDefaults, TomlConfig};
use std::path::PathBuf;
use tracing::info;

/// Module name used for the TOML file (`pilah-scan.toml`)
pub const MODULE_NAME: &str = "pilah-scan";

pub const ENV_PORT: &str = "PILAH_PORT";
pub const ENV_MODEL: &str = "PILAH_MODEL";
pub const ENV_API_URL: &str = "PILAH_API_URL";
pub const ENV_CAMERA: &str = "PILAH_CAMERA";
pub const ENV_CREDENTIALS: &str = "PILAH_CREDENTIALS";

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub model_path: Option<PathBuf>,
    pub api_url: Option<String>,
    pub camera_device: Option<String>,
    pub credentials_path: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub port: u16,
    pub model_path: PathBuf,
    pub api_url: String,
    pub camera_device: String,
    pub credentials_path: PathBuf,
}

impl ScanConfig {
    pub fn resolve(overrides: ConfigOverrides, toml: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let port = resolve_setting("port", overrides.port, ENV_PORT, toml.port, defaults.port);
        let model_path = resolve_setting(
            "model_path",
            overrides.model_path,
            ENV_MODEL,
            toml.model_path.clone(),
            defaults.model_path,
        );
        let api_url = resolve_setting(
            "api_url",
            overrides.api_url,
            ENV_API_URL,
            toml.api_url.clone(),
            defaults.api_url,
        );
        let camera_device = resolve_setting(
            "camera_device",
            overrides.camera_device,
            ENV_CAMERA,
            toml.camera_device.clone(),
            defaults.camera_device,
        );
        let credentials_path = resolve_setting(
            "credentials_path",
            overrides.credentials_path,
            ENV_CREDENTIALS,
            toml.credentials_path.clone(),
            defaults.credentials_path,
        );

        info!("port = {} (from {})", port.value, port.source);
        info!("model_path = {} (from {})", model_path.value.display(), model_path.source);
        info!("api_url = {} (from {})", api_url.value, api_url.source);
        info!("camera_device = {} (from {})", camera_device.value, camera_device.source);
        info!(
            "credentials_path = {} (from {})",
            credentials_path.value.display(),
            credentials_path.source
        );

        Self {
            port: port.value,
            model_path: model_path.value,
            api_url: api_url.value,
            camera_device: camera_device.value,
            credentials_path: credentials_path.value,
        }
    }
}
