//! Proxy engine interface

use super::stack::FlowHandler;
use crate::config::{EngineFormat, SniffingConfig, TunnelConfig};
use crate::outbound::Dialer;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;

/// Environment variable the engine reads its asset directory from
pub const ASSET_LOCATION_ENV: &str = "v2ray.location.asset";

/// Opaque engine configuration plus the asset directory
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub format: EngineFormat,
    pub payload: Bytes,
    pub asset_path: PathBuf,
}

impl From<&TunnelConfig> for EngineConfig {
    fn from(config: &TunnelConfig) -> Self {
        EngineConfig {
            format: config.engine_format,
            payload: Bytes::copy_from_slice(config.engine_config.as_bytes()),
            asset_path: config.asset_path.clone(),
        }
    }
}

/// Proxy/routing engine that decides how flows are proxied
#[async_trait]
pub trait ProxyEngine: Send + Sync {
    /// Replace the engine's system dialer for every outbound connection
    fn use_dialer(&self, dialer: Arc<dyn Dialer>);

    /// Start an engine instance from `config`
    async fn start(&self, config: &EngineConfig) -> Result<Arc<dyn EngineInstance>>;
}

/// A running engine instance
#[async_trait]
pub trait EngineInstance: Send + Sync {
    /// Handler for flows arriving from the packet stack
    fn flow_handler(&self, sniffing: &SniffingConfig) -> Arc<dyn FlowHandler>;

    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_from_tunnel_config() {
        let config = TunnelConfig::new(r#"{"log":{}}"#, "/assets", "", "");
        let engine = EngineConfig::from(&config);

        assert_eq!(engine.format, EngineFormat::Json);
        assert_eq!(&engine.payload[..], br#"{"log":{}}"#);
        assert_eq!(engine.asset_path, PathBuf::from("/assets"));
    }
}
