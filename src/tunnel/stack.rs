//! Packet stack and host packet sink interfaces

use crate::outbound::ProxyConnection;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Callback the packet stack uses to emit packets toward the device
///
/// Returns the number of bytes consumed.
pub type OutputFn = Arc<dyn Fn(&[u8]) -> usize + Send + Sync>;

/// Host sink receiving packets bound for the virtual interface
pub trait PacketFlow: Send + Sync {
    fn write_packet(&self, packet: &[u8]);
}

/// Receiver of flows reassembled by the packet stack (the proxy engine)
#[async_trait]
pub trait FlowHandler: Send + Sync {
    /// Take over a reassembled TCP flow addressed to `target`
    async fn handle_tcp(&self, stream: Box<dyn ProxyConnection>, target: SocketAddr) -> Result<()>;

    /// Relay one datagram from `source` to `target`
    async fn handle_udp(&self, payload: Bytes, source: SocketAddr, target: SocketAddr) -> Result<()>;
}

/// Userspace TCP/IP stack fed with raw device packets
pub trait PacketStack: Send + Sync {
    /// Inject one inbound packet from the device
    fn write(&self, packet: &[u8]) -> Result<()>;

    /// Release the stack; later writes are ignored or fail
    fn close(&self) -> Result<()>;

    fn register_tcp_handler(&self, handler: Arc<dyn FlowHandler>);

    fn register_udp_handler(&self, handler: Arc<dyn FlowHandler>);

    fn register_output(&self, output: OutputFn);
}

/// Creates a fresh packet stack for every tunnel session
pub trait PacketStackFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn PacketStack>>;
}

/// Output callback forwarding to `flow` until `stopped` is set
///
/// The full packet length is always reported as consumed, including for
/// packets dropped after stop.
pub fn forward_output(flow: Arc<dyn PacketFlow>, stopped: Arc<AtomicBool>) -> OutputFn {
    Arc::new(move |packet: &[u8]| {
        if stopped.load(Ordering::Acquire) {
            trace!("Dropping {} byte outbound packet, tunnel stopped", packet.len());
        } else {
            flow.write_packet(packet);
        }
        packet.len()
    })
}
