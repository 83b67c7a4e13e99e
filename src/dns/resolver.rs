//! Destination resolver: exception table first, system resolver second

use super::ExceptionTable;
use crate::common::{Address, Destination, Network};
use crate::{Error, Result};
use async_trait::async_trait;
use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

/// Host name lookup backend
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Resolve `host` to candidate addresses for the given transport
    async fn lookup(&self, host: &str, port: u16, network: Network) -> io::Result<Vec<IpAddr>>;
}

/// Platform resolver (`getaddrinfo` on tokio's blocking pool)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl NameResolver for SystemResolver {
    async fn lookup(&self, host: &str, port: u16, _network: Network) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, port)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Turns a requested destination into one with a concrete IP
pub struct DestinationResolver {
    exceptions: Arc<ExceptionTable>,
    system: Arc<dyn NameResolver>,
}

impl DestinationResolver {
    pub fn new(exceptions: Arc<ExceptionTable>, system: Arc<dyn NameResolver>) -> Self {
        DestinationResolver { exceptions, system }
    }

    /// Resolver backed by the platform resolver
    pub fn with_system(exceptions: Arc<ExceptionTable>) -> Self {
        Self::new(exceptions, Arc::new(SystemResolver))
    }

    pub fn exceptions(&self) -> &ExceptionTable {
        &self.exceptions
    }

    /// Resolve `dest`, returning a new destination whose host is an IP
    pub async fn resolve(&self, dest: &Destination) -> Result<Destination> {
        let domain = match &dest.address {
            Address::Domain(domain) => domain,
            _ => return Ok(dest.clone()),
        };

        if let Some(ip) = self.exceptions.get(domain) {
            debug!("DNS {} -> {} (exception)", domain, ip);
            return Ok(dest.with_ip(ip));
        }

        let ips = self
            .system
            .lookup(domain, dest.port, dest.network)
            .await
            .map_err(|e| Error::resolution(dest.remote_address(), e))?;

        let ip = pick_address(&ips).ok_or_else(|| {
            Error::resolution(
                dest.remote_address(),
                io::Error::new(io::ErrorKind::NotFound, "no addresses returned"),
            )
        })?;

        debug!("DNS {} -> {}", domain, ip);
        Ok(dest.with_ip(ip))
    }
}

/// First IPv4 answer if any, otherwise the first answer
fn pick_address(ips: &[IpAddr]) -> Option<IpAddr> {
    ips.iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| ips.first())
        .copied()
}
