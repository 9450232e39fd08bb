/// Plugin configuration
/// Optionally loaded from a TOML file; the SSL directory is usually set from the command line.
use crate::error::{FlavorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Process-wide plugin configuration, immutable once the plugin is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginConfig {
    /// Root directory for all generated certificate material
    pub ssl_dir: PathBuf,

    /// Parameters rendered into the embedded PKI scripts
    #[serde(default)]
    pub pki: PkiSettings,
}

impl PluginConfig {
    pub fn new(ssl_dir: impl Into<PathBuf>) -> Self {
        Self {
            ssl_dir: ssl_dir.into(),
            pki: PkiSettings::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlavorError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: PluginConfig = toml::from_str(&content).map_err(|e| {
            FlavorError::config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        tracing::info!("Loaded plugin config from {:?}", path);
        Ok(config)
    }

    /// Fails unless the SSL directory exists and is a directory.
    pub fn check_ssl_dir(&self) -> Result<()> {
        match std::fs::metadata(&self.ssl_dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(FlavorError::precondition(format!(
                "SSL directory {} is not a directory",
                self.ssl_dir.display()
            ))),
            Err(e) => Err(FlavorError::precondition(format!(
                "SSL directory {} does not exist: {}",
                self.ssl_dir.display(),
                e
            ))),
        }
    }
}

/// Key and validity settings for generated certificates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PkiSettings {
    #[serde(default = "default_key_bits")]
    pub key_bits: u32,

    /// Root CA validity in days
    #[serde(default = "default_ca_days")]
    pub ca_days: u32,

    /// Node and admin certificate validity in days
    #[serde(default = "default_cert_days")]
    pub cert_days: u32,
}

fn default_key_bits() -> u32 {
    2048
}

fn default_ca_days() -> u32 {
    10000
}

fn default_cert_days() -> u32 {
    365
}

impl Default for PkiSettings {
    fn default() -> Self {
        Self {
            key_bits: default_key_bits(),
            ca_days: default_ca_days(),
            cert_days: default_cert_days(),
        }
    }
}
