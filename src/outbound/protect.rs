//! Socket protection hook
//!
//! A VPN host must exempt the dialer's own sockets from the tunnel, otherwise
//! the proxy traffic is routed straight back into the packet stack. On Android
//! this is `VpnService.protect(fd)`; desktop hosts typically bind the socket to
//! the physical interface or set a firewall mark.

use socket2::Socket;
use tracing::{debug, warn};

/// OS-level socket handle passed to the protector
#[cfg(unix)]
pub type RawHandle = std::os::fd::RawFd;

/// OS-level socket handle passed to the protector
#[cfg(windows)]
pub type RawHandle = std::os::windows::io::RawSocket;

/// Host hook marking a socket as exempt from tunnel routing
///
/// Called synchronously, exactly once per socket, before the socket connects.
/// Returning `false` aborts the dial.
pub trait SocketProtector: Send + Sync {
    fn protect(&self, handle: RawHandle) -> bool;
}

impl<F> SocketProtector for F
where
    F: Fn(RawHandle) -> bool + Send + Sync,
{
    fn protect(&self, handle: RawHandle) -> bool {
        self(handle)
    }
}

/// Protector for hosts whose routing already excludes this process
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProtector;

impl SocketProtector for NoopProtector {
    fn protect(&self, _handle: RawHandle) -> bool {
        true
    }
}

#[cfg(unix)]
pub(crate) fn raw_handle(socket: &Socket) -> RawHandle {
    use std::os::fd::AsRawFd;
    socket.as_raw_fd()
}

#[cfg(windows)]
pub(crate) fn raw_handle(socket: &Socket) -> RawHandle {
    use std::os::windows::io::AsRawSocket;
    socket.as_raw_socket()
}

/// Run the protector for `socket`
pub(crate) fn protect_socket(protector: &dyn SocketProtector, socket: &Socket) -> bool {
    let handle = raw_handle(socket);
    let protected = protector.protect(handle);
    if protected {
        debug!("Socket {} protected", handle);
    } else {
        warn!("Socket {} protection failed", handle);
    }
    protected
}
