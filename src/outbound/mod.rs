//! Outbound dialing
//!
//! - `protect`: host hook that exempts sockets from tunnel routing
//! - `socket`: protected socket factory (create, protect, connect)
//! - `dialer`: the `Dialer` handed to the proxy engine

mod dialer;
pub mod protect;
mod socket;

pub use dialer::ProtectedDialer;
pub use protect::{NoopProtector, RawHandle, SocketProtector};
pub use socket::ProtectedSocketFactory;

use crate::common::{Address, Destination, Network};
use crate::{Error, Result};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, UdpSocket};
use tokio_util::sync::CancellationToken;

/// Outbound connection factory installed into the proxy engine
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Open a connection to `dest` on behalf of a flow from `source`
    ///
    /// Cancelling `cancel` abandons the dial; no retries are attempted.
    async fn dial(
        &self,
        cancel: &CancellationToken,
        source: Option<&Address>,
        dest: &Destination,
    ) -> Result<Connection>;
}

/// Trait for stream connections handed between the stack and the engine
pub trait ProxyConnection: AsyncRead + AsyncWrite + Send + Sync + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Sync + Unpin> ProxyConnection for T {}

/// Connected outbound socket, owned by the caller
#[derive(Debug)]
pub enum Connection {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

impl Connection {
    pub fn network(&self) -> Network {
        match self {
            Connection::Tcp(_) => Network::Tcp,
            Connection::Udp(_) => Network::Udp,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Connection::Tcp(s) => s.local_addr(),
            Connection::Udp(s) => s.local_addr(),
        }
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Connection::Tcp(s) => s.peer_addr(),
            Connection::Udp(s) => s.peer_addr(),
        }
    }

    pub fn into_tcp(self) -> Result<TcpStream> {
        match self {
            Connection::Tcp(s) => Ok(s),
            Connection::Udp(_) => Err(Error::unsupported("expected a TCP connection, got UDP")),
        }
    }

    pub fn into_udp(self) -> Result<UdpSocket> {
        match self {
            Connection::Udp(s) => Ok(s),
            Connection::Tcp(_) => Err(Error::unsupported("expected a UDP connection, got TCP")),
        }
    }
}
