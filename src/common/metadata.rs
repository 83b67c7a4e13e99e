//! Dial destination metadata

use super::net::Address;
use crate::{Error, Result};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Network type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Tcp,
    Udp,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Tcp => write!(f, "TCP"),
            Network::Udp => write!(f, "UDP"),
        }
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tcp" | "tcp4" | "tcp6" => Ok(Network::Tcp),
            "udp" | "udp4" | "udp6" => Ok(Network::Udp),
            other => Err(Error::unsupported(format!(
                "unsupported network protocol: {}",
                other
            ))),
        }
    }
}

/// Outbound destination requested by the proxy engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    /// Transport (TCP/UDP)
    pub network: Network,

    /// Destination host (domain or literal IP)
    pub address: Address,

    /// Destination port
    pub port: u16,
}

impl Destination {
    /// Create new destination
    pub fn new(network: Network, address: Address, port: u16) -> Self {
        Destination {
            network,
            address,
            port,
        }
    }

    /// Create TCP destination
    pub fn tcp<A: Into<Address>>(address: A, port: u16) -> Self {
        Self::new(Network::Tcp, address.into(), port)
    }

    /// Create UDP destination
    pub fn udp<A: Into<Address>>(address: A, port: u16) -> Self {
        Self::new(Network::Udp, address.into(), port)
    }

    /// Copy of this destination with the host replaced by a concrete IP
    pub fn with_ip(&self, ip: IpAddr) -> Self {
        Destination {
            network: self.network,
            address: Address::from(ip),
            port: self.port,
        }
    }

    /// Check if destination is resolved
    pub fn resolved(&self) -> bool {
        !self.address.is_domain()
    }

    /// Get remote address string (`host:port`)
    pub fn remote_address(&self) -> String {
        self.address.to_string_with_port(self.port)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.network, self.remote_address())
    }
}
