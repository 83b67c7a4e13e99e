//! Protected socket factory
//!
//! Every outbound socket is created on the IPv6 family with `IPV6_V6ONLY`
//! cleared, so IPv4 destinations travel the same path as IPv4-mapped
//! addresses. The protector runs before `connect`; dropping a `Socket` on any
//! error path closes the descriptor.

use super::protect::{protect_socket, SocketProtector};
use super::Connection;
use crate::common::net::to_dual_stack;
use crate::common::{Network, SocketStage};
use crate::{Error, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpSocket, TcpStream, UdpSocket};
use tracing::debug;

/// Creates, protects and connects outbound sockets
#[derive(Clone)]
pub struct ProtectedSocketFactory {
    protector: Arc<dyn SocketProtector>,
}

impl ProtectedSocketFactory {
    pub fn new(protector: Arc<dyn SocketProtector>) -> Self {
        ProtectedSocketFactory { protector }
    }

    /// Open a protected connection to `ip:port`
    pub async fn open_protected(&self, ip: IpAddr, port: u16, network: Network) -> Result<Connection> {
        let (socket, addr) = create_socket(ip, port, network)?;

        if !protect_socket(self.protector.as_ref(), &socket) {
            return Err(Error::socket(
                SocketStage::Protect,
                addr,
                io::Error::new(io::ErrorKind::PermissionDenied, "protector rejected socket"),
            ));
        }

        let conn = match network {
            Network::Tcp => Connection::Tcp(connect_tcp(socket, addr).await?),
            Network::Udp => Connection::Udp(connect_udp(socket, addr)?),
        };

        debug!("Protected {} socket connected to {}", network, addr);
        Ok(conn)
    }
}

fn socket_kind(network: Network) -> (Type, Protocol) {
    match network {
        Network::Tcp => (Type::STREAM, Protocol::TCP),
        Network::Udp => (Type::DGRAM, Protocol::UDP),
    }
}

/// Allocate a dual-stack socket, falling back to IPv4 where IPv6 is absent
fn create_socket(ip: IpAddr, port: u16, network: Network) -> Result<(Socket, SocketAddr)> {
    let (ty, protocol) = socket_kind(network);
    let addr = to_dual_stack(ip, port);

    match Socket::new(Domain::IPV6, ty, Some(protocol)) {
        Ok(socket) => {
            socket
                .set_only_v6(false)
                .map_err(|e| Error::socket(SocketStage::Create, addr, e))?;
            Ok((socket, addr))
        }
        Err(e) if ip.is_ipv4() && is_family_unsupported(&e) => {
            let addr = SocketAddr::new(ip, port);
            debug!("IPv6 sockets unavailable, dialing {} over IPv4", addr);
            let socket = Socket::new(Domain::IPV4, ty, Some(protocol))
                .map_err(|e| Error::socket(SocketStage::Create, addr, e))?;
            Ok((socket, addr))
        }
        Err(e) => Err(Error::socket(SocketStage::Create, addr, e)),
    }
}

#[cfg(unix)]
fn is_family_unsupported(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::EAFNOSUPPORT)
}

#[cfg(windows)]
fn is_family_unsupported(e: &io::Error) -> bool {
    // WSAEAFNOSUPPORT
    e.raw_os_error() == Some(10047)
}

async fn connect_tcp(socket: Socket, addr: SocketAddr) -> Result<TcpStream> {
    socket
        .set_nonblocking(true)
        .map_err(|e| Error::socket(SocketStage::Wrap, addr, e))?;

    let socket = TcpSocket::from_std_stream(socket.into());
    let stream = socket
        .connect(addr)
        .await
        .map_err(|e| Error::socket(SocketStage::Connect, addr, e))?;

    let _ = stream.set_nodelay(true);
    Ok(stream)
}

fn connect_udp(socket: Socket, addr: SocketAddr) -> Result<UdpSocket> {
    socket
        .set_nonblocking(true)
        .map_err(|e| Error::socket(SocketStage::Wrap, addr, e))?;
    socket
        .connect(&addr.into())
        .map_err(|e| Error::socket(SocketStage::Connect, addr, e))?;

    UdpSocket::from_std(socket.into()).map_err(|e| Error::socket(SocketStage::Wrap, addr, e))
}
