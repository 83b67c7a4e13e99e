//! Tunnel lifecycle - wires the packet stack, the proxy engine and the
//! protected dialer together for one VPN session

mod engine;
mod stack;

pub use engine::*;
pub use stack::*;

use crate::config::TunnelConfig;
use crate::dns::{NameResolver, SystemResolver};
use crate::outbound::{ProtectedDialer, SocketProtector};
use crate::{Error, Result};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

/// Lifecycle state of a `TunnelController`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    /// Never started
    Idle,
    /// Session active
    Running,
    /// Session torn down; a fresh `start` is required
    Stopped,
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelState::Idle => write!(f, "idle"),
            TunnelState::Running => write!(f, "running"),
            TunnelState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Handles owned by one running tunnel
pub struct TunnelSession {
    stack: Arc<dyn PacketStack>,
    engine: Arc<dyn EngineInstance>,
    dialer: Arc<ProtectedDialer>,
    stopped: Arc<AtomicBool>,
}

impl TunnelSession {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Dialer installed into the engine for this session
    pub fn dialer(&self) -> &Arc<ProtectedDialer> {
        &self.dialer
    }
}

/// Starts, stops and feeds a tunnel session
///
/// Lifecycle transitions are serialized; `write` may be called from any
/// thread at any time and drops packets while no session is running.
pub struct TunnelController {
    stacks: Arc<dyn PacketStackFactory>,
    engine: Arc<dyn ProxyEngine>,
    resolver: Arc<dyn NameResolver>,
    lifecycle: Mutex<()>,
    state: RwLock<TunnelState>,
    session: RwLock<Option<Arc<TunnelSession>>>,
}

impl TunnelController {
    pub fn new(stacks: Arc<dyn PacketStackFactory>, engine: Arc<dyn ProxyEngine>) -> Self {
        TunnelController {
            stacks,
            engine,
            resolver: Arc::new(SystemResolver),
            lifecycle: Mutex::new(()),
            state: RwLock::new(TunnelState::Idle),
            session: RwLock::new(None),
        }
    }

    /// Use `resolver` for names missing from the exception table
    pub fn with_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn state(&self) -> TunnelState {
        *self.state.read()
    }

    pub fn is_running(&self) -> bool {
        self.state() == TunnelState::Running
    }

    /// Current session, if running
    pub fn session(&self) -> Option<Arc<TunnelSession>> {
        self.session.read().clone()
    }

    /// Start a tunnel session
    ///
    /// Without a packet flow there is nothing to attach to and the call is a
    /// no-op. Starting while a session runs is rejected.
    pub async fn start(
        &self,
        packet_flow: Option<Arc<dyn PacketFlow>>,
        protector: Arc<dyn SocketProtector>,
        config: TunnelConfig,
    ) -> Result<()> {
        let packet_flow = match packet_flow {
            Some(flow) => flow,
            None => {
                debug!("No packet flow supplied, start ignored");
                return Ok(());
            }
        };

        let _guard = self.lifecycle.lock().await;
        if self.is_running() {
            return Err(Error::state("tunnel already running"));
        }

        let exceptions = Arc::new(config.exception_table()?);
        info!("Loaded {} exception domains", exceptions.len());

        config.check_asset_path()?;
        std::env::set_var(ASSET_LOCATION_ENV, &config.asset_path);

        let stack = self
            .stacks
            .create()
            .map_err(|e| stack_error("create packet stack failed", e))?;

        let dialer = Arc::new(ProtectedDialer::with_resolver(
            exceptions,
            self.resolver.clone(),
            protector,
        ));
        self.engine.use_dialer(dialer.clone());

        let engine = match self.engine.start(&EngineConfig::from(&config)).await {
            Ok(engine) => engine,
            Err(e) => {
                error!("Failed to start proxy engine: {}", e);
                if let Err(close_err) = stack.close() {
                    warn!("Failed to close packet stack: {}", close_err);
                }
                return Err(match e {
                    Error::Engine(_) => e,
                    other => Error::engine(format!("start engine failed: {}", other)),
                });
            }
        };

        let handler = engine.flow_handler(&config.sniffing);
        stack.register_tcp_handler(handler.clone());
        stack.register_udp_handler(handler);

        let stopped = Arc::new(AtomicBool::new(true));
        stack.register_output(forward_output(packet_flow, stopped.clone()));

        *self.session.write() = Some(Arc::new(TunnelSession {
            stack,
            engine,
            dialer,
            stopped: stopped.clone(),
        }));
        *self.state.write() = TunnelState::Running;
        stopped.store(false, Ordering::Release);

        info!("Tunnel started");
        Ok(())
    }

    /// Stop the running session
    ///
    /// The stopped flag is raised before the stack and the engine close, so
    /// output racing with teardown is dropped. A no-op when nothing runs.
    pub async fn stop(&self) -> Result<()> {
        let _guard = self.lifecycle.lock().await;

        let session = match self.session() {
            Some(session) => session,
            None => {
                debug!("Tunnel not running, stop ignored");
                return Ok(());
            }
        };

        session.stopped.store(true, Ordering::Release);
        *self.session.write() = None;

        let stack_result = session
            .stack
            .close()
            .map_err(|e| stack_error("close packet stack failed", e));
        if let Err(ref e) = stack_result {
            warn!("Failed to close packet stack: {}", e);
        }

        let engine_result = session.engine.close().await;
        if let Err(ref e) = engine_result {
            warn!("Failed to close proxy engine: {}", e);
        }

        *self.state.write() = TunnelState::Stopped;
        info!("Tunnel stopped");

        stack_result.and(engine_result)
    }

    /// Feed one packet read from the device into the packet stack
    ///
    /// Packets arriving before `start` or after `stop` are dropped.
    pub fn write(&self, packet: &[u8]) -> Result<()> {
        match self.session() {
            Some(session) if !session.is_stopped() => session.stack.write(packet),
            _ => {
                trace!("Dropping {} byte inbound packet, tunnel not running", packet.len());
                Ok(())
            }
        }
    }
}

fn stack_error(context: &str, e: Error) -> Error {
    match e {
        Error::Stack(_) => e,
        other => Error::stack(format!("{}: {}", context, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tunnel_state_display() {
        assert_eq!(TunnelState::Idle.to_string(), "idle");
        assert_eq!(TunnelState::Running.to_string(), "running");
        assert_eq!(TunnelState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn test_stack_error_wraps_once() {
        let wrapped = stack_error("close packet stack failed", Error::config("bad mtu"));
        assert_eq!(
            wrapped.to_string(),
            "Packet stack error: close packet stack failed: Configuration error: bad mtu"
        );

        let kept = stack_error("create packet stack failed", Error::stack("no device"));
        assert_eq!(kept.to_string(), "Packet stack error: no device");
    }
}
