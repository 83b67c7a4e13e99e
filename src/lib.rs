//! tun-dialer - protected outbound dialer for VPN tunnel clients
//!
//! Sits between a userspace packet stack and a proxy engine:
//! - Exception table overriding name resolution for selected domains
//! - Protected sockets, exempted from tunnel routing before they connect
//! - A `Dialer` the proxy engine uses for every outbound TCP/UDP connection
//! - Tunnel session lifecycle (start, stop, packet injection)
//!
//! # Architecture
//!
//! ```text
//!   device packets          +-------------+        reply packets
//!  ---------------------->  |   tunnel/   |  ---------------------->
//!   TunnelController::write | (lifecycle) |   PacketFlow::write_packet
//!                           +------+------+
//!                                  |
//!            +---------------------+---------------------+
//!            |                                           |
//!     +------v------+                             +------v------+
//!     | PacketStack |  -- reassembled flows -->   | ProxyEngine |
//!     +-------------+                             +------+------+
//!                                                        | dial
//!                                                 +------v------+
//!                                                 |  outbound/  |
//!                                                 |  (dialer)   |
//!                                                 +------+------+
//!                                                        |
//!                                  +---------------------+-----+
//!                                  |                           |
//!                           +------v------+             +------v------+
//!                           |    dns/     |             |   socket    |
//!                           | (exceptions)|             |  (protect)  |
//!                           +-------------+             +-------------+
//! ```

pub mod common;
pub mod config;
pub mod dns;
pub mod logging;
pub mod outbound;
pub mod tunnel;

pub use common::error::{Error, Result};
pub use common::{Address, Destination, Network, SocketStage};
pub use config::{SniffingConfig, TunnelConfig};
pub use dns::{DestinationResolver, ExceptionTable, NameResolver, SystemResolver};
pub use outbound::{
    Connection, Dialer, NoopProtector, ProtectedDialer, ProtectedSocketFactory, RawHandle,
    SocketProtector,
};
pub use tunnel::{TunnelController, TunnelSession, TunnelState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
