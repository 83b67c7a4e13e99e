//! Configuration module

use crate::dns::ExceptionTable;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Format of the opaque engine configuration payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineFormat {
    #[default]
    Json,
    Yaml,
}

impl fmt::Display for EngineFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineFormat::Json => write!(f, "json"),
            EngineFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Protocol the engine may sniff to override the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SniffProtocol {
    Tls,
    Http,
}

impl TryFrom<&str> for SniffProtocol {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tls" => Ok(SniffProtocol::Tls),
            "http" => Ok(SniffProtocol::Http),
            other => Err(Error::config(format!("Unknown sniffing protocol: {}", other))),
        }
    }
}

/// Traffic sniffing settings handed to the engine's flow handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SniffingConfig {
    /// Enable protocol detection on proxied connections
    pub enabled: bool,

    /// Protocols whose detected host replaces the destination
    pub destination_override: Vec<SniffProtocol>,
}

impl SniffingConfig {
    /// Build from a comma-separated override list such as `"tls,http"`
    pub fn from_overrides(list: &str) -> Result<Self> {
        let destination_override = list
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(SniffProtocol::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(SniffingConfig {
            enabled: true,
            destination_override,
        })
    }
}

impl Default for SniffingConfig {
    fn default() -> Self {
        SniffingConfig {
            enabled: true,
            destination_override: vec![SniffProtocol::Tls, SniffProtocol::Http],
        }
    }
}

/// Everything `TunnelController::start` needs besides the host callbacks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TunnelConfig {
    /// Opaque proxy engine configuration
    pub engine_config: String,

    /// Format of `engine_config`
    pub engine_format: EngineFormat,

    /// Directory holding the engine's geo assets
    pub asset_path: PathBuf,

    /// Comma-separated domains that bypass name resolution
    pub exception_domains: String,

    /// Comma-separated IPs, index-aligned with `exception_domains`
    pub exception_ips: String,

    /// Sniffing settings
    pub sniffing: SniffingConfig,
}

impl TunnelConfig {
    /// Create config from the host's start arguments
    pub fn new<E, A, D, I>(engine_config: E, asset_path: A, exception_domains: D, exception_ips: I) -> Self
    where
        E: Into<String>,
        A: Into<PathBuf>,
        D: Into<String>,
        I: Into<String>,
    {
        TunnelConfig {
            engine_config: engine_config.into(),
            asset_path: asset_path.into(),
            exception_domains: exception_domains.into(),
            exception_ips: exception_ips.into(),
            ..Default::default()
        }
    }

    /// Load configuration from YAML file (synchronous)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load configuration from YAML file (async)
    pub async fn load_async<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Self::from_yaml(&content)
    }

    /// Load from YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: TunnelConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: TunnelConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.check_asset_path()?;
        self.exception_table().map(|_| ())
    }

    /// The asset path is exported through the environment, which cannot
    /// carry NUL bytes
    pub fn check_asset_path(&self) -> Result<()> {
        if self.asset_path.to_string_lossy().contains('\0') {
            return Err(Error::config(format!(
                "Asset path contains a NUL byte: {:?}",
                self.asset_path
            )));
        }
        Ok(())
    }

    /// Build the exception table described by this config
    pub fn exception_table(&self) -> Result<ExceptionTable> {
        ExceptionTable::from_lists(&self.exception_domains, &self.exception_ips)
    }
}

impl Default for TunnelConfig {
    fn default() -> Self {
        TunnelConfig {
            engine_config: String::new(),
            engine_format: EngineFormat::Json,
            asset_path: PathBuf::new(),
            exception_domains: String::new(),
            exception_ips: String::new(),
            sniffing: SniffingConfig::default(),
        }
    }
}
